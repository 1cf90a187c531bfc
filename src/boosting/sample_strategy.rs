//! Per-round row sampling: bagging and GOSS.
//!
//! Both strategies return the sorted set of rows a round's trees are grown
//! on, or `None` when every row is used. Out-of-bag rows still receive the
//! new trees' outputs in their scores.

use crate::config::Config;
use crate::core::error::{LightGBMError, Result};
use crate::core::types::{DataSampleStrategy, DataSize, Grad};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;

/// Row sampling strategy of a training run.
#[derive(Debug)]
pub enum SampleStrategy {
    /// Every row is used every round
    Full,
    /// A uniform subset redrawn every `freq` rounds
    Bagging {
        fraction: f64,
        freq: usize,
        rng: StdRng,
        bag: Option<Vec<DataSize>>,
    },
    /// Gradient-based one-side sampling
    Goss {
        top_rate: f64,
        other_rate: f64,
        /// Rounds trained on all rows before sampling starts
        warmup_rounds: usize,
        rng: StdRng,
    },
}

impl SampleStrategy {
    pub fn from_config(config: &Config) -> Result<Self> {
        let seed = config.random_seeds().bagging;
        match config.data_sample_strategy {
            DataSampleStrategy::Goss => {
                if config.top_rate <= 0.0 || config.other_rate <= 0.0 {
                    return Err(LightGBMError::config("GOSS needs positive top_rate and other_rate"));
                }
                info!("Using GOSS");
                Ok(SampleStrategy::Goss {
                    top_rate: config.top_rate,
                    other_rate: config.other_rate,
                    warmup_rounds: (1.0 / config.learning_rate) as usize,
                    rng: StdRng::seed_from_u64(seed),
                })
            }
            DataSampleStrategy::Bagging if config.is_bagging_enabled() => Ok(SampleStrategy::Bagging {
                fraction: config.bagging_fraction,
                freq: config.bagging_freq,
                rng: StdRng::seed_from_u64(seed),
                bag: None,
            }),
            DataSampleStrategy::Bagging => Ok(SampleStrategy::Full),
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, SampleStrategy::Full)
    }

    /// Rows used by round `iteration` (0-based, counted within this run).
    ///
    /// GOSS rescales the gradients and hessians of the sampled small-gradient
    /// rows in place; the buffers hold `num_data * num_tree_per_iteration`
    /// class-major values.
    pub fn sample(
        &mut self,
        iteration: usize,
        num_data: usize,
        gradients: &mut [Grad],
        hessians: &mut [Grad],
    ) -> Option<Vec<DataSize>> {
        match self {
            SampleStrategy::Full => None,
            SampleStrategy::Bagging {
                fraction,
                freq,
                rng,
                bag,
            } => {
                if bag.is_none() || iteration % *freq == 0 {
                    let count = ((num_data as f64 * *fraction) as usize).clamp(1, num_data.max(1));
                    let mut rows: Vec<DataSize> = sample(rng, num_data, count)
                        .into_iter()
                        .map(|i| i as DataSize)
                        .collect();
                    rows.sort_unstable();
                    debug!("Re-bagging, using {} data to train", rows.len());
                    *bag = Some(rows);
                }
                bag.clone()
            }
            SampleStrategy::Goss {
                top_rate,
                other_rate,
                warmup_rounds,
                rng,
            } => {
                if iteration < *warmup_rounds {
                    return None;
                }
                Some(goss_sample(num_data, *top_rate, *other_rate, rng, gradients, hessians))
            }
        }
    }
}

fn goss_sample(
    num_data: usize,
    top_rate: f64,
    other_rate: f64,
    rng: &mut StdRng,
    gradients: &mut [Grad],
    hessians: &mut [Grad],
) -> Vec<DataSize> {
    let num_class = if num_data == 0 { 1 } else { gradients.len() / num_data };
    let magnitude: Vec<f64> = (0..num_data)
        .map(|i| {
            (0..num_class)
                .map(|k| (gradients[k * num_data + i] as f64 * hessians[k * num_data + i] as f64).abs())
                .sum()
        })
        .collect();

    let top_k = ((num_data as f64 * top_rate) as usize).max(1).min(num_data);
    let other_k = ((num_data as f64 * other_rate) as usize).max(1);

    let mut order: Vec<usize> = (0..num_data).collect();
    order.sort_by(|&a, &b| magnitude[b].total_cmp(&magnitude[a]).then(a.cmp(&b)));
    let (top, rest) = order.split_at(top_k);

    let other_k = other_k.min(rest.len());
    let multiply = if other_k > 0 {
        (num_data - top_k) as f64 / other_k as f64
    } else {
        1.0
    };

    let mut rows: Vec<DataSize> = top.iter().map(|&i| i as DataSize).collect();
    for pick in sample(rng, rest.len(), other_k) {
        let row = rest[pick];
        for k in 0..num_class {
            gradients[k * num_data + row] *= multiply as Grad;
            hessians[k * num_data + row] *= multiply as Grad;
        }
        rows.push(row as DataSize);
    }
    rows.sort_unstable();
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::core::types::BoostingType;

    #[test]
    fn test_bagging_is_sorted_and_reused() {
        let config = ConfigBuilder::new()
            .bagging_fraction(0.5)
            .bagging_freq(2)
            .build()
            .unwrap();
        let mut strategy = SampleStrategy::from_config(&config).unwrap();
        let mut g = vec![0.0; 10];
        let mut h = vec![1.0; 10];
        let first = strategy.sample(0, 10, &mut g, &mut h).unwrap();
        assert_eq!(first.len(), 5);
        assert!(first.windows(2).all(|w| w[0] < w[1]));
        let second = strategy.sample(1, 10, &mut g, &mut h).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_bagging_by_default() {
        let config = Config::default();
        let mut strategy = SampleStrategy::from_config(&config).unwrap();
        assert!(!strategy.is_active());
        assert!(strategy.sample(0, 4, &mut [0.0; 4], &mut [1.0; 4]).is_none());
    }

    #[test]
    fn test_goss_keeps_top_and_rescales_rest() {
        let config = ConfigBuilder::new()
            .data_sample_strategy(DataSampleStrategy::Goss)
            .top_rate(0.2)
            .other_rate(0.2)
            .learning_rate(0.5)
            .build()
            .unwrap();
        let mut strategy = SampleStrategy::from_config(&config).unwrap();
        let mut g: Vec<Grad> = (0..10).map(|i| i as Grad).collect();
        let mut h = vec![1.0; 10];

        // warm-up rounds use every row
        assert!(strategy.sample(0, 10, &mut g.clone(), &mut h.clone()).is_none());
        assert!(strategy.sample(1, 10, &mut g.clone(), &mut h.clone()).is_none());

        let rows = strategy.sample(2, 10, &mut g, &mut h).unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows.contains(&9) && rows.contains(&8));
        let rescaled: Vec<_> = rows.iter().filter(|&&r| r < 8).collect();
        for &&r in &rescaled {
            assert_eq!(h[r as usize], 4.0);
        }
    }

    #[test]
    fn test_goss_rejected_for_rf() {
        let config = ConfigBuilder::new()
            .boosting_type(BoostingType::RandomForest)
            .data_sample_strategy(DataSampleStrategy::Goss)
            .feature_fraction(0.5)
            .build();
        assert!(config.is_err());
    }
}
