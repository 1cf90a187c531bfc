//! Histogram construction for split finding.
//!
//! Histograms are built per feature over the rows of one leaf. Each feature
//! owns its accumulation buffer, so the per-feature work is independent and
//! runs on the rayon pool; within a feature rows are visited in partition
//! order, which keeps the sums deterministic for a fixed thread count.

use crate::core::types::{DataSize, Grad, Hist};
use crate::dataset::Dataset;
use crate::tree::histogram::{FeatureHistogram, LeafHistogram};
use rayon::prelude::*;

/// Configuration for histogram construction.
#[derive(Debug, Clone)]
pub struct HistogramBuilderConfig {
    /// Below this many `rows * features` the build runs on the calling thread
    pub parallel_threshold: usize,
}

impl Default for HistogramBuilderConfig {
    fn default() -> Self {
        HistogramBuilderConfig {
            parallel_threshold: 16 * 1024,
        }
    }
}

/// Builds leaf histograms from binned features and gradients.
#[derive(Debug, Clone, Default)]
pub struct HistogramBuilder {
    config: HistogramBuilderConfig,
}

impl HistogramBuilder {
    pub fn new(config: HistogramBuilderConfig) -> Self {
        HistogramBuilder { config }
    }

    /// Builds the histogram of every feature marked in `features_used` over
    /// `rows`. Features not in use get an empty histogram.
    pub fn construct(
        &self,
        dataset: &Dataset,
        gradients: &[Grad],
        hessians: &[Grad],
        rows: &[DataSize],
        features_used: &[bool],
    ) -> LeafHistogram {
        // Gather gradients once in partition order.
        let ordered: Vec<(Hist, Hist)> = rows
            .iter()
            .map(|&r| (gradients[r as usize] as Hist, hessians[r as usize] as Hist))
            .collect();

        let build = |feature: usize| -> FeatureHistogram {
            if !features_used.get(feature).copied().unwrap_or(false) {
                return FeatureHistogram::default();
            }
            self.construct_feature(dataset, feature, rows, &ordered)
        };

        let num_features = dataset.num_features();
        let features = if rows.len() * num_features >= self.config.parallel_threshold {
            (0..num_features).into_par_iter().map(build).collect()
        } else {
            (0..num_features).map(build).collect()
        };
        LeafHistogram::from_features(features)
    }

    /// Histogram of a single feature; `ordered` holds the gradient pair of
    /// each row in `rows`, position by position.
    pub fn construct_feature(
        &self,
        dataset: &Dataset,
        feature: usize,
        rows: &[DataSize],
        ordered: &[(Hist, Hist)],
    ) -> FeatureHistogram {
        let mapper = dataset.bin_mapper(feature);
        let bins = dataset.feature_bins(feature);
        let mut histogram = FeatureHistogram::new(mapper.num_bins());
        let entries = histogram.bins_mut();
        for (&row, &(g, h)) in rows.iter().zip(ordered) {
            entries[bins[row as usize] as usize].add(g, h);
        }
        histogram
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetBuilder;
    use approx::assert_relative_eq;
    use ndarray::{Array1, Array2};
    use proptest::prelude::*;

    fn small_dataset() -> Dataset {
        let features = Array2::from_shape_vec(
            (6, 2),
            vec![1.0, 0.0, 2.0, 1.0, 3.0, 0.0, 1.0, 1.0, 2.0, 0.0, 3.0, 1.0],
        )
        .unwrap();
        DatasetBuilder::new()
            .features(features)
            .labels(Array1::zeros(6))
            .min_data_in_bin(1)
            .build()
            .unwrap()
    }

    #[test]
    fn test_construct_counts_rows() {
        let dataset = small_dataset();
        let gradients = vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let hessians = vec![1.0f32; 6];
        let rows: Vec<DataSize> = (0..6).collect();
        let hist = HistogramBuilder::default().construct(
            &dataset,
            &gradients,
            &hessians,
            &rows,
            &[true, false],
        );
        let total = hist.feature(0).total();
        assert_eq!(total.count, 6);
        assert_relative_eq!(total.sum_gradients, 21.0);
        assert!(hist.feature(1).is_empty());
        // rows 0 and 3 share the value 1.0
        let bin = dataset.bin_mapper(0).value_to_bin(1.0);
        assert_eq!(hist.feature(0).bin(bin).count, 2);
        assert_relative_eq!(hist.feature(0).bin(bin).sum_gradients, 5.0);
    }

    proptest! {
        #[test]
        fn prop_subtraction_matches_rescan(
            values in proptest::collection::vec(0.0f32..20.0, 30..80),
            split in 1usize..29,
        ) {
            let n = values.len();
            let features = Array2::from_shape_vec((n, 1), values).unwrap();
            let dataset = DatasetBuilder::new()
                .features(features)
                .labels(Array1::zeros(n))
                .min_data_in_bin(1)
                .max_bin(16)
                .build()
                .unwrap();
            let gradients: Vec<f32> = (0..n).map(|i| (i as f32 * 0.37).sin()).collect();
            let hessians: Vec<f32> = (0..n).map(|i| 0.5 + (i % 3) as f32).collect();
            let all: Vec<DataSize> = (0..n as DataSize).collect();
            let (left, right) = all.split_at(split);

            let builder = HistogramBuilder::default();
            let parent = builder.construct(&dataset, &gradients, &hessians, &all, &[true]);
            let small = builder.construct(&dataset, &gradients, &hessians, left, &[true]);
            let rescan = builder.construct(&dataset, &gradients, &hessians, right, &[true]);
            let derived = small.sibling_of(&parent);

            for (a, b) in derived.feature(0).bins().iter().zip(rescan.feature(0).bins()) {
                prop_assert_eq!(a.count, b.count);
                prop_assert!((a.sum_gradients - b.sum_gradients).abs() < 1e-9);
                prop_assert!((a.sum_hessians - b.sum_hessians).abs() < 1e-9);
            }
        }
    }
}
