//! Per-tree feature subsampling.
//!
//! With `feature_fraction < 1` every tree only considers a random subset of
//! the splittable features. The generator is seeded once from
//! `feature_fraction_seed` and advances from tree to tree, so a run with a
//! fixed seed grows the same sequence of trees.

use crate::core::types::FeatureIndex;
use crate::dataset::BinMapper;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Configuration for feature sampling.
#[derive(Debug, Clone)]
pub struct FeatureSamplingConfig {
    /// Fraction of the splittable features used by each tree
    pub feature_fraction: f64,
    pub seed: u64,
}

impl Default for FeatureSamplingConfig {
    fn default() -> Self {
        FeatureSamplingConfig {
            feature_fraction: 1.0,
            seed: crate::core::constants::DEFAULT_FEATURE_FRACTION_SEED,
        }
    }
}

/// Feature sampler for tree construction.
#[derive(Debug, Clone)]
pub struct FeatureSampler {
    config: FeatureSamplingConfig,
    rng: StdRng,
}

impl FeatureSampler {
    pub fn new(config: FeatureSamplingConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        FeatureSampler { config, rng }
    }

    /// Number of features drawn out of `total` usable ones.
    pub fn sample_size(&self, total: usize) -> usize {
        if total == 0 {
            return 0;
        }
        let count = (total as f64 * self.config.feature_fraction + 0.5) as usize;
        count.clamp(1, total)
    }

    /// Mask of the features a new tree may split on. Trivial features are
    /// never selected.
    pub fn sample_features(&mut self, bin_mappers: &[BinMapper]) -> Vec<bool> {
        let usable: Vec<FeatureIndex> = bin_mappers
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.is_trivial())
            .map(|(i, _)| i)
            .collect();

        let mut mask = vec![false; bin_mappers.len()];
        if self.config.feature_fraction >= 1.0 {
            for &f in &usable {
                mask[f] = true;
            }
            return mask;
        }

        let count = self.sample_size(usable.len());
        for pick in rand::seq::index::sample(&mut self.rng, usable.len(), count) {
            mask[usable[pick]] = true;
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::BinningParams;

    fn mappers(n: usize) -> Vec<BinMapper> {
        let params = BinningParams {
            max_bin: 16,
            min_data_in_bin: 1,
            use_missing: true,
        };
        (0..n)
            .map(|_| BinMapper::new_numerical(&[1.0, 2.0, 3.0], &params).unwrap())
            .collect()
    }

    #[test]
    fn test_full_fraction_uses_all_features() {
        let mut sampler = FeatureSampler::new(FeatureSamplingConfig::default());
        assert_eq!(sampler.sample_features(&mappers(4)), vec![true; 4]);
    }

    #[test]
    fn test_fraction_sample_size() {
        let mut sampler = FeatureSampler::new(FeatureSamplingConfig {
            feature_fraction: 0.5,
            seed: 7,
        });
        let mask = sampler.sample_features(&mappers(10));
        assert_eq!(mask.iter().filter(|&&m| m).count(), 5);
        assert_eq!(sampler.sample_size(1), 1);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let config = FeatureSamplingConfig {
            feature_fraction: 0.3,
            seed: 11,
        };
        let mut a = FeatureSampler::new(config.clone());
        let mut b = FeatureSampler::new(config);
        let m = mappers(20);
        for _ in 0..5 {
            assert_eq!(a.sample_features(&m), b.sample_features(&m));
        }
    }

    #[test]
    fn test_trivial_features_excluded() {
        let params = BinningParams {
            max_bin: 16,
            min_data_in_bin: 1,
            use_missing: true,
        };
        let mut m = mappers(2);
        m.push(BinMapper::new_numerical(&[5.0, 5.0, 5.0], &params).unwrap());
        let mut sampler = FeatureSampler::new(FeatureSamplingConfig::default());
        assert_eq!(sampler.sample_features(&m), vec![true, true, false]);
    }
}
