//! Serial tree learner.
//!
//! Grows one tree from the gradients of a boosting round. Candidate splits
//! are kept in a max-heap; leaf-wise growth always splits the leaf with the
//! highest gain, depth-wise growth finishes every leaf of a depth before
//! moving to the next one. Histograms of the larger child are derived by
//! subtraction from the parent whenever possible.

use crate::config::Config;
use crate::core::error::{LightGBMError, Result};
use crate::core::types::{
    BinIndex, DataSize, FeatureType, Grad, GrowPolicy, LeafIndex, MissingType,
};
use crate::dataset::{BinMapper, Dataset};
use crate::tree::histogram::builder::HistogramBuilderConfig;
use crate::tree::histogram::{BinEntry, HistogramBuilder, LeafHistogram};
use crate::tree::learner::partition::DataPartition;
use crate::tree::node::{CategoryBitset, SplitCondition};
use crate::tree::sampling::{FeatureSampler, FeatureSamplingConfig};
use crate::tree::split::{SplitFinder, SplitFinderConfig, SplitInfo};
use crate::tree::tree::{LeafStats, Tree};
use log::debug;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Configuration for the serial tree learner.
#[derive(Debug, Clone)]
pub struct SerialTreeLearnerConfig {
    pub num_leaves: usize,
    /// `<= 0` means unlimited
    pub max_depth: i32,
    pub grow_policy: GrowPolicy,
    pub use_histogram_subtraction: bool,
    pub split: SplitFinderConfig,
    pub feature_sampling: FeatureSamplingConfig,
    pub histogram: HistogramBuilderConfig,
}

impl Default for SerialTreeLearnerConfig {
    fn default() -> Self {
        SerialTreeLearnerConfig::from_config(&Config::default())
    }
}

impl SerialTreeLearnerConfig {
    pub fn from_config(config: &Config) -> Self {
        SerialTreeLearnerConfig {
            num_leaves: config.num_leaves,
            max_depth: config.max_depth,
            grow_policy: config.grow_policy,
            use_histogram_subtraction: config.use_histogram_subtraction,
            split: SplitFinderConfig::from_config(config),
            feature_sampling: FeatureSamplingConfig {
                feature_fraction: config.feature_fraction,
                seed: config.random_seeds().feature_fraction,
            },
            histogram: HistogramBuilderConfig::default(),
        }
    }
}

/// Heap entry for a leaf with a valid split.
#[derive(Debug)]
struct Candidate {
    leaf: LeafIndex,
    depth: usize,
    gain: f64,
    policy: GrowPolicy,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    /// Greatest first: shallower leaves for depth-wise growth, then higher
    /// gain, then lower leaf id.
    fn cmp(&self, other: &Self) -> Ordering {
        let by_depth = match self.policy {
            GrowPolicy::DepthWise => other.depth.cmp(&self.depth),
            GrowPolicy::LeafWise => Ordering::Equal,
        };
        by_depth
            .then_with(|| self.gain.total_cmp(&other.gain))
            .then_with(|| other.leaf.cmp(&self.leaf))
    }
}

/// Serial tree learner implementing the core GBDT tree construction algorithm.
#[derive(Debug)]
pub struct SerialTreeLearner {
    config: SerialTreeLearnerConfig,
    histogram_builder: HistogramBuilder,
    split_finder: SplitFinder,
    feature_sampler: FeatureSampler,
    partition: DataPartition,
}

impl SerialTreeLearner {
    pub fn new(config: SerialTreeLearnerConfig) -> Self {
        SerialTreeLearner {
            histogram_builder: HistogramBuilder::new(config.histogram.clone()),
            split_finder: SplitFinder::new(config.split.clone()),
            feature_sampler: FeatureSampler::new(config.feature_sampling.clone()),
            partition: DataPartition::new(),
            config,
        }
    }

    pub fn config(&self) -> &SerialTreeLearnerConfig {
        &self.config
    }

    /// Row assignment of the last grown tree.
    pub fn partition(&self) -> &DataPartition {
        &self.partition
    }

    /// Grow one tree. `bag` restricts training to a sorted subset of rows.
    ///
    /// Leaf outputs are unshrunk. A tree with a single leaf means no split
    /// met the constraints.
    pub fn train(
        &mut self,
        dataset: &Dataset,
        gradients: &[Grad],
        hessians: &[Grad],
        bag: Option<&[DataSize]>,
    ) -> Result<Tree> {
        let num_data = dataset.num_data();
        if gradients.len() != num_data || hessians.len() != num_data {
            return Err(LightGBMError::dimension_mismatch(
                format!("{} gradients and hessians", num_data),
                format!("{} and {}", gradients.len(), hessians.len()),
            ));
        }
        if let Some(i) = gradients
            .iter()
            .zip(hessians)
            .position(|(g, h)| !g.is_finite() || !h.is_finite())
        {
            return Err(LightGBMError::numerical(format!(
                "Non-finite gradient or hessian at row {}",
                i
            )));
        }

        self.partition.init(num_data, bag);
        let features_used = self.feature_sampler.sample_features(dataset.bin_mappers());

        let root = sums_of(self.partition.leaf_rows(0), gradients, hessians);
        let mut tree = Tree::new();
        tree.set_root_stats(LeafStats {
            output: self.split_finder.leaf_output(&root),
            data_count: root.count,
            sum_hessians: root.sum_hessians,
        });

        let max_leaves = self.config.num_leaves.max(1);
        let mut histograms: Vec<Option<LeafHistogram>> = Vec::with_capacity(max_leaves);
        let mut best_splits: Vec<Option<SplitInfo>> = Vec::with_capacity(max_leaves);
        let mut heap = BinaryHeap::new();

        let root_hist = self.histogram_builder.construct(
            dataset,
            gradients,
            hessians,
            self.partition.leaf_rows(0),
            &features_used,
        );
        histograms.push(None);
        best_splits.push(None);
        self.evaluate_leaf(dataset, 0, 0, root_hist, &root, &mut histograms, &mut best_splits, &mut heap);

        while tree.num_leaves() < max_leaves {
            let Some(candidate) = heap.pop() else {
                break;
            };
            let leaf = candidate.leaf;
            let Some(split) = best_splits[leaf].take() else {
                continue;
            };
            let parent_hist = histograms[leaf].take();

            let mapper = dataset.bin_mapper(split.feature);
            let bins = dataset.feature_bins(split.feature);
            let right_leaf = self
                .partition
                .split(leaf, |row| bin_goes_left(&split, mapper, bins[row as usize]))?;

            let condition = split_condition(&split, mapper);
            let left_sums = split.left_sums();
            let right_sums = split.right_sums();
            let tree_right = tree.split(
                leaf,
                split.feature,
                condition,
                split.gain,
                LeafStats {
                    output: split.left_output,
                    data_count: split.left_count,
                    sum_hessians: split.left_sum_hessian,
                },
                LeafStats {
                    output: split.right_output,
                    data_count: split.right_count,
                    sum_hessians: split.right_sum_hessian,
                },
            )?;
            if tree_right != right_leaf {
                return Err(LightGBMError::internal(format!(
                    "Tree and partition disagree on new leaf id ({} vs {})",
                    tree_right, right_leaf
                )));
            }
            debug!(
                "Split leaf {} on feature {} (gain {:.6}): {} left, {} right",
                leaf, split.feature, split.gain, split.left_count, split.right_count
            );

            histograms.push(None);
            best_splits.push(None);
            if tree.num_leaves() >= max_leaves {
                break;
            }

            let child_depth = candidate.depth + 1;
            let (left_hist, right_hist) =
                self.child_histograms(dataset, gradients, hessians, leaf, right_leaf, parent_hist, &features_used);
            self.evaluate_leaf(dataset, leaf, child_depth, left_hist, &left_sums, &mut histograms, &mut best_splits, &mut heap);
            self.evaluate_leaf(dataset, right_leaf, child_depth, right_hist, &right_sums, &mut histograms, &mut best_splits, &mut heap);
        }

        Ok(tree)
    }

    /// Histograms of both children: the smaller one is built from its rows,
    /// the larger one derived from the parent when available.
    #[allow(clippy::too_many_arguments)]
    fn child_histograms(
        &self,
        dataset: &Dataset,
        gradients: &[Grad],
        hessians: &[Grad],
        left: LeafIndex,
        right: LeafIndex,
        parent: Option<LeafHistogram>,
        features_used: &[bool],
    ) -> (LeafHistogram, LeafHistogram) {
        let build = |leaf: LeafIndex| {
            self.histogram_builder.construct(
                dataset,
                gradients,
                hessians,
                self.partition.leaf_rows(leaf),
                features_used,
            )
        };
        let left_smaller = self.partition.leaf_count(left) <= self.partition.leaf_count(right);
        let (small, large) = if left_smaller { (left, right) } else { (right, left) };

        let small_hist = build(small);
        let large_hist = match parent {
            Some(parent) if self.config.use_histogram_subtraction => small_hist.sibling_of(&parent),
            _ => build(large),
        };
        if left_smaller {
            (small_hist, large_hist)
        } else {
            (large_hist, small_hist)
        }
    }

    /// Find the best split of a new leaf and register it as a candidate.
    #[allow(clippy::too_many_arguments)]
    fn evaluate_leaf(
        &self,
        dataset: &Dataset,
        leaf: LeafIndex,
        depth: usize,
        histogram: LeafHistogram,
        sums: &BinEntry,
        histograms: &mut [Option<LeafHistogram>],
        best_splits: &mut [Option<SplitInfo>],
        heap: &mut BinaryHeap<Candidate>,
    ) {
        let split_config = &self.config.split;
        if self.config.max_depth > 0 && depth >= self.config.max_depth as usize {
            return;
        }
        if sums.count < 2 * split_config.min_data_in_leaf
            || sums.sum_hessians < 2.0 * split_config.min_sum_hessian_in_leaf
        {
            return;
        }

        if let Some(split) = self
            .split_finder
            .find_best_split(&histogram, dataset.bin_mappers(), sums)
        {
            heap.push(Candidate {
                leaf,
                depth,
                gain: split.gain,
                policy: self.config.grow_policy,
            });
            best_splits[leaf] = Some(split);
            histograms[leaf] = Some(histogram);
        }
    }
}

fn sums_of(rows: &[DataSize], gradients: &[Grad], hessians: &[Grad]) -> BinEntry {
    let mut sums = BinEntry::default();
    for &row in rows {
        sums.add(gradients[row as usize] as f64, hessians[row as usize] as f64);
    }
    sums
}

/// Routing of a binned value, equivalent to [`SplitCondition::goes_left`]
/// on the raw value.
#[inline]
fn bin_goes_left(split: &SplitInfo, mapper: &BinMapper, bin: BinIndex) -> bool {
    if split.is_categorical() {
        split.categorical_bins.binary_search(&bin).is_ok()
    } else if mapper.missing_bin() == Some(bin) {
        split.default_left
    } else {
        bin <= split.threshold_bin
    }
}

fn split_condition(split: &SplitInfo, mapper: &BinMapper) -> SplitCondition {
    match mapper.feature_type() {
        FeatureType::Categorical => {
            let categories: Vec<i32> = split
                .categorical_bins
                .iter()
                .filter_map(|&bin| mapper.bin_to_category(bin))
                .collect();
            SplitCondition::Categorical {
                categories: CategoryBitset::from_values(&categories),
            }
        }
        FeatureType::Numerical => SplitCondition::Numerical {
            threshold: split.threshold,
            default_left: split.default_left && mapper.missing_type() == MissingType::NaN,
            missing_type: mapper.missing_type(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetBuilder;
    use approx::assert_relative_eq;
    use ndarray::{Array1, Array2};

    fn step_dataset(n: usize) -> (Dataset, Vec<Grad>, Vec<Grad>) {
        let x: Vec<f32> = (0..n).map(|i| i as f32).collect();
        let features = Array2::from_shape_vec((n, 1), x).unwrap();
        let dataset = DatasetBuilder::new()
            .features(features)
            .labels(Array1::zeros(n))
            .min_data_in_bin(1)
            .build()
            .unwrap();
        // gradient of L2 loss at score 0 for labels 0 / 10
        let gradients: Vec<Grad> = (0..n).map(|i| if i < n / 2 { 0.0 } else { -10.0 }).collect();
        (dataset, gradients, vec![1.0; n])
    }

    fn learner(num_leaves: usize, policy: GrowPolicy) -> SerialTreeLearner {
        SerialTreeLearner::new(SerialTreeLearnerConfig {
            num_leaves,
            grow_policy: policy,
            split: SplitFinderConfig {
                min_data_in_leaf: 1,
                min_sum_hessian_in_leaf: 0.0,
                ..SplitFinderConfig::default()
            },
            ..SerialTreeLearnerConfig::default()
        })
    }

    #[test]
    fn test_single_split_recovers_step() {
        let (dataset, gradients, hessians) = step_dataset(40);
        let mut learner = learner(2, GrowPolicy::LeafWise);
        let tree = learner.train(&dataset, &gradients, &hessians, None).unwrap();
        assert_eq!(tree.num_leaves(), 2);
        assert_relative_eq!(tree.leaf_output(0), 0.0);
        assert_relative_eq!(tree.leaf_output(1), 10.0);
        assert_eq!(learner.partition().leaf_count(0), 20);
        let row = ndarray::arr1(&[30.0f32]);
        assert_relative_eq!(tree.predict(&row.view()), 10.0);
    }

    #[test]
    fn test_leaf_limit_and_rows_cover_data() {
        let (dataset, _, hessians) = step_dataset(64);
        let gradients: Vec<Grad> = (0..64).map(|i| ((i * 7) % 13) as f32 - 6.0).collect();
        let mut learner = learner(7, GrowPolicy::LeafWise);
        let tree = learner.train(&dataset, &gradients, &hessians, None).unwrap();
        assert!(tree.num_leaves() <= 7);
        let total: usize = (0..tree.num_leaves())
            .map(|l| learner.partition().leaf_count(l))
            .sum();
        assert_eq!(total, 64);
        tree.validate().unwrap();
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let (dataset, _, hessians) = step_dataset(64);
        let gradients: Vec<Grad> = (0..64).map(|i| ((i * 5) % 11) as f32 - 5.0).collect();
        let mut learner = SerialTreeLearner::new(SerialTreeLearnerConfig {
            max_depth: 2,
            ..learner(31, GrowPolicy::LeafWise).config().clone()
        });
        let tree = learner.train(&dataset, &gradients, &hessians, None).unwrap();
        assert!(tree.depth() <= 2);
        assert!(tree.num_leaves() <= 4);
    }

    #[test]
    fn test_depth_wise_fills_levels() {
        let (dataset, _, hessians) = step_dataset(64);
        let gradients: Vec<Grad> = (0..64).map(|i| ((i * 5) % 11) as f32 - 5.0).collect();
        let mut learner = learner(4, GrowPolicy::DepthWise);
        let tree = learner.train(&dataset, &gradients, &hessians, None).unwrap();
        if tree.num_leaves() == 4 {
            assert_eq!(tree.depth(), 2);
        }
    }

    #[test]
    fn test_subtraction_matches_rescan() {
        let (dataset, _, hessians) = step_dataset(100);
        let gradients: Vec<Grad> = (0..100).map(|i| ((i * 37) % 17) as f32 - 8.0).collect();
        let mut with = learner(15, GrowPolicy::LeafWise);
        let mut without = SerialTreeLearner::new(SerialTreeLearnerConfig {
            use_histogram_subtraction: false,
            ..with.config().clone()
        });
        let a = with.train(&dataset, &gradients, &hessians, None).unwrap();
        let b = without.train(&dataset, &gradients, &hessians, None).unwrap();
        assert_eq!(a.num_leaves(), b.num_leaves());
        let split_a: Vec<_> = a.splits().map(|s| (s.feature, s.condition.clone())).collect();
        let split_b: Vec<_> = b.splits().map(|s| (s.feature, s.condition.clone())).collect();
        assert_eq!(split_a, split_b);
    }

    #[test]
    fn test_constant_gradients_give_single_leaf() {
        let (dataset, _, hessians) = step_dataset(30);
        let gradients = vec![1.0; 30];
        let mut learner = learner(31, GrowPolicy::LeafWise);
        let tree = learner.train(&dataset, &gradients, &hessians, None).unwrap();
        assert!(tree.is_single_leaf());
    }

    #[test]
    fn test_bagged_rows_only() {
        let (dataset, gradients, hessians) = step_dataset(40);
        let bag: Vec<DataSize> = (0..40).step_by(2).collect();
        let mut learner = learner(2, GrowPolicy::LeafWise);
        let tree = learner.train(&dataset, &gradients, &hessians, Some(&bag)).unwrap();
        assert_eq!(learner.partition().num_used_rows(), 20);
        assert_eq!(tree.leaf_count(0) + tree.leaf_count(1), 20);
    }

    #[test]
    fn test_non_finite_gradient_is_error() {
        let (dataset, mut gradients, hessians) = step_dataset(10);
        gradients[3] = f32::NAN;
        let mut learner = learner(4, GrowPolicy::LeafWise);
        assert!(learner.train(&dataset, &gradients, &hessians, None).is_err());
    }
}
