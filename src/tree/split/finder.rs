//! Split finding over leaf histograms.
//!
//! For every usable feature the finder scans the bins of the leaf histogram
//! and keeps the threshold with the highest regularized gain
//!
//! ```text
//! gain = f(G_L, H_L) + f(G_R, H_R) - f(G_P, H_P) - min_gain_to_split
//! f(G, H) = ThresholdL1(G)^2 / (H + lambda_l2)
//! ```
//!
//! A split is only returned when this net gain is strictly positive. Ties
//! keep the earliest candidate: lowest feature, then lowest bin, then the
//! missing-right assignment.

use crate::config::Config;
use crate::core::types::{BinIndex, DataSize, FeatureIndex, FeatureType, MissingType, Score};
use crate::dataset::BinMapper;
use crate::tree::histogram::{BinEntry, FeatureHistogram, LeafHistogram};
use rayon::prelude::*;

/// Best split found for one leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitInfo {
    pub feature: FeatureIndex,
    /// Numerical splits send bins `0..=threshold_bin` left
    pub threshold_bin: BinIndex,
    /// Raw-value threshold matching `threshold_bin`
    pub threshold: f64,
    /// Net gain, already reduced by `min_gain_to_split`
    pub gain: f64,
    pub left_sum_gradient: f64,
    pub left_sum_hessian: f64,
    pub left_count: DataSize,
    pub right_sum_gradient: f64,
    pub right_sum_hessian: f64,
    pub right_count: DataSize,
    pub left_output: Score,
    pub right_output: Score,
    /// Where missing values go; always `false` for categorical splits
    pub default_left: bool,
    /// Bins sent left by a categorical split, empty for numerical splits
    pub categorical_bins: Vec<BinIndex>,
}

impl SplitInfo {
    pub fn is_categorical(&self) -> bool {
        !self.categorical_bins.is_empty()
    }

    pub(crate) fn left_sums(&self) -> BinEntry {
        BinEntry {
            sum_gradients: self.left_sum_gradient,
            sum_hessians: self.left_sum_hessian,
            count: self.left_count,
        }
    }

    pub(crate) fn right_sums(&self) -> BinEntry {
        BinEntry {
            sum_gradients: self.right_sum_gradient,
            sum_hessians: self.right_sum_hessian,
            count: self.right_count,
        }
    }
}

/// Configuration for split finding.
#[derive(Debug, Clone)]
pub struct SplitFinderConfig {
    pub min_data_in_leaf: DataSize,
    pub min_sum_hessian_in_leaf: f64,
    pub lambda_l1: f64,
    pub lambda_l2: f64,
    pub min_gain_to_split: f64,
    /// Clamp on the absolute leaf output, `<= 0` disables
    pub max_delta_step: f64,
    pub max_cat_to_onehot: usize,
    pub max_cat_threshold: usize,
    pub cat_smooth: f64,
    pub cat_l2: f64,
    pub min_data_per_group: DataSize,
}

impl Default for SplitFinderConfig {
    fn default() -> Self {
        SplitFinderConfig::from_config(&Config::default())
    }
}

impl SplitFinderConfig {
    pub fn from_config(config: &Config) -> Self {
        SplitFinderConfig {
            min_data_in_leaf: config.min_data_in_leaf as DataSize,
            min_sum_hessian_in_leaf: config.min_sum_hessian_in_leaf,
            lambda_l1: config.lambda_l1,
            lambda_l2: config.lambda_l2,
            min_gain_to_split: config.min_gain_to_split,
            max_delta_step: config.max_delta_step,
            max_cat_to_onehot: config.max_cat_to_onehot,
            max_cat_threshold: config.max_cat_threshold,
            cat_smooth: config.cat_smooth,
            cat_l2: config.cat_l2,
            min_data_per_group: config.min_data_per_group as DataSize,
        }
    }
}

/// Soft-thresholds a gradient sum by `lambda_l1`.
#[inline]
pub(crate) fn threshold_l1(sum_gradient: f64, lambda_l1: f64) -> f64 {
    let reduced = (sum_gradient.abs() - lambda_l1).max(0.0);
    reduced.copysign(sum_gradient)
}

/// Optimal leaf output `-ThresholdL1(G) / (H + lambda_l2)`, clamped to
/// `max_delta_step` when positive.
#[inline]
pub fn leaf_output(
    sum_gradient: f64,
    sum_hessian: f64,
    lambda_l1: f64,
    lambda_l2: f64,
    max_delta_step: f64,
) -> Score {
    let denominator = sum_hessian + lambda_l2;
    if denominator <= 0.0 {
        return 0.0;
    }
    let output = -threshold_l1(sum_gradient, lambda_l1) / denominator;
    if max_delta_step > 0.0 && output.abs() > max_delta_step {
        max_delta_step.copysign(output)
    } else {
        output
    }
}

/// Loss reduction of a leaf when it takes `output`.
#[inline]
fn leaf_gain_given_output(sum_gradient: f64, sum_hessian: f64, lambda_l1: f64, lambda_l2: f64, output: f64) -> f64 {
    let g = threshold_l1(sum_gradient, lambda_l1);
    -(2.0 * g * output + (sum_hessian + lambda_l2) * output * output)
}

/// `f(G, H)` of a leaf.
#[inline]
pub(crate) fn leaf_gain(
    sum_gradient: f64,
    sum_hessian: f64,
    lambda_l1: f64,
    lambda_l2: f64,
    max_delta_step: f64,
) -> f64 {
    if sum_hessian + lambda_l2 <= 0.0 {
        return 0.0;
    }
    if max_delta_step <= 0.0 {
        let g = threshold_l1(sum_gradient, lambda_l1);
        g * g / (sum_hessian + lambda_l2)
    } else {
        let output = leaf_output(sum_gradient, sum_hessian, lambda_l1, lambda_l2, max_delta_step);
        leaf_gain_given_output(sum_gradient, sum_hessian, lambda_l1, lambda_l2, output)
    }
}

/// Split finder for identifying optimal split points using histogram data.
#[derive(Debug, Clone, Default)]
pub struct SplitFinder {
    config: SplitFinderConfig,
}

impl SplitFinder {
    pub fn new(config: SplitFinderConfig) -> Self {
        SplitFinder { config }
    }

    pub fn config(&self) -> &SplitFinderConfig {
        &self.config
    }

    /// `f(G, H)` under the numerical regularization.
    #[inline]
    pub(crate) fn gain_of(&self, sums: &BinEntry, lambda_l2: f64) -> f64 {
        leaf_gain(
            sums.sum_gradients,
            sums.sum_hessians,
            self.config.lambda_l1,
            lambda_l2,
            self.config.max_delta_step,
        )
    }

    #[inline]
    pub(crate) fn output_of(&self, sums: &BinEntry, lambda_l2: f64) -> Score {
        leaf_output(
            sums.sum_gradients,
            sums.sum_hessians,
            self.config.lambda_l1,
            lambda_l2,
            self.config.max_delta_step,
        )
    }

    /// Whether both children satisfy the data and hessian minimums.
    #[inline]
    pub(crate) fn children_allowed(&self, left: &BinEntry, right: &BinEntry) -> bool {
        left.count >= self.config.min_data_in_leaf
            && right.count >= self.config.min_data_in_leaf
            && left.sum_hessians >= self.config.min_sum_hessian_in_leaf
            && right.sum_hessians >= self.config.min_sum_hessian_in_leaf
    }

    /// Output of a leaf from its sums with the numerical regularization.
    pub fn leaf_output(&self, sums: &BinEntry) -> Score {
        self.output_of(sums, self.config.lambda_l2)
    }

    /// Best split over all features of a leaf, evaluated per feature in
    /// parallel and reduced in feature order.
    pub fn find_best_split(
        &self,
        histogram: &LeafHistogram,
        bin_mappers: &[BinMapper],
        parent: &BinEntry,
    ) -> Option<SplitInfo> {
        let candidates: Vec<Option<SplitInfo>> = (0..histogram.num_features())
            .into_par_iter()
            .map(|feature| {
                let feature_hist = histogram.feature(feature);
                if feature_hist.is_empty() {
                    return None;
                }
                self.find_best_split_for_feature(feature, feature_hist, &bin_mappers[feature], parent)
            })
            .collect();

        let mut best: Option<SplitInfo> = None;
        for candidate in candidates.into_iter().flatten() {
            if best.as_ref().map_or(true, |b| candidate.gain > b.gain) {
                best = Some(candidate);
            }
        }
        best
    }

    /// Best split of a single feature.
    pub fn find_best_split_for_feature(
        &self,
        feature: FeatureIndex,
        histogram: &FeatureHistogram,
        mapper: &BinMapper,
        parent: &BinEntry,
    ) -> Option<SplitInfo> {
        if mapper.is_trivial() || histogram.num_bins() < 2 {
            return None;
        }
        match mapper.feature_type() {
            FeatureType::Numerical => self.find_numerical(feature, histogram, mapper, parent),
            FeatureType::Categorical => self.find_categorical(feature, histogram, mapper, parent),
        }
    }

    fn find_numerical(
        &self,
        feature: FeatureIndex,
        histogram: &FeatureHistogram,
        mapper: &BinMapper,
        parent: &BinEntry,
    ) -> Option<SplitInfo> {
        let lambda_l2 = self.config.lambda_l2;
        let min_gain_shift = self.gain_of(parent, lambda_l2) + self.config.min_gain_to_split;

        let (num_value_bins, missing) = match mapper.missing_type() {
            MissingType::NaN => (
                histogram.num_bins() - 1,
                *histogram.bin((histogram.num_bins() - 1) as BinIndex),
            ),
            MissingType::None => (histogram.num_bins(), BinEntry::default()),
        };

        let mut best_gain = f64::NEG_INFINITY;
        let mut best: Option<(BinIndex, bool, BinEntry)> = None;
        let mut prefix = BinEntry::default();

        // with missing rows the last value bin is a candidate too: every
        // value left, missing right
        let last_bin = if missing.count > 0 {
            num_value_bins
        } else {
            num_value_bins.saturating_sub(1)
        };
        for bin in 0..last_bin {
            prefix.accumulate(histogram.bin(bin as BinIndex));

            // missing right first, so ties keep it
            let mut options = [(false, prefix), (true, prefix)];
            options[1].1.accumulate(&missing);
            let tries = if missing.count == 0 || bin + 1 == num_value_bins {
                1
            } else {
                2
            };

            for &(default_left, left) in &options[..tries] {
                let right = parent.subtract(&left);
                if !self.children_allowed(&left, &right) {
                    continue;
                }
                let gain = self.gain_of(&left, lambda_l2) + self.gain_of(&right, lambda_l2);
                if gain <= min_gain_shift {
                    continue;
                }
                if gain > best_gain {
                    best_gain = gain;
                    best = Some((bin as BinIndex, default_left, left));
                }
            }
        }

        let (threshold_bin, default_left, left) = best?;
        let right = parent.subtract(&left);
        Some(SplitInfo {
            feature,
            threshold_bin,
            threshold: mapper.bin_upper_bound(threshold_bin),
            gain: best_gain - min_gain_shift,
            left_sum_gradient: left.sum_gradients,
            left_sum_hessian: left.sum_hessians,
            left_count: left.count,
            right_sum_gradient: right.sum_gradients,
            right_sum_hessian: right.sum_hessians,
            right_count: right.count,
            left_output: self.output_of(&left, lambda_l2),
            right_output: self.output_of(&right, lambda_l2),
            default_left,
            categorical_bins: Vec::new(),
        })
    }
}
