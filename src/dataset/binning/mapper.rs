//! Bin mapper implementation for feature discretization.
//!
//! A [`BinMapper`] turns raw feature values into bin indices. Bin boundaries
//! are computed once from a sample of the training data and then shared by
//! every dataset validated against it.
//!
//! Numerical features store the upper bound of every bin but the last;
//! a value `v` falls into the first bin whose bound is `>= v`. When missing
//! values were seen during construction, NaN owns an extra bin placed after
//! all value bins. Categorical features map each retained category to its
//! own bin, ordered by frequency; negative values, NaN and categories that
//! did not make the cut share a final "other" bin.

use crate::core::constants::MAX_CATEGORY_VALUE;
use crate::core::error::{LightGBMError, Result};
use crate::core::types::*;
use std::collections::HashMap;

/// Parameters controlling bin construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinningParams {
    /// Maximum number of bins, including the missing bin
    pub max_bin: usize,
    /// Minimum number of sampled rows per bin
    pub min_data_in_bin: usize,
    /// Give NaN its own bin when it occurs
    pub use_missing: bool,
}

/// Bin mapper for a single feature
#[derive(Debug, Clone, PartialEq)]
pub struct BinMapper {
    feature_type: FeatureType,
    missing_type: MissingType,
    /// Upper bounds of all numerical value bins except the last
    upper_bounds: Vec<f64>,
    /// Category value of each categorical bin except the "other" bin
    bin_to_category: Vec<i32>,
    category_to_bin: HashMap<i32, BinIndex>,
    num_bins: usize,
    is_trivial: bool,
}

impl BinMapper {
    /// Build a numerical mapper from sampled values.
    pub fn new_numerical(values: &[f32], params: &BinningParams) -> Result<Self> {
        if params.max_bin < 2 {
            return Err(LightGBMError::invalid_parameter(
                "max_bin",
                params.max_bin.to_string(),
                "must be at least 2",
            ));
        }

        let has_nan = values.iter().any(|v| v.is_nan());
        let missing_type = if has_nan && params.use_missing {
            MissingType::NaN
        } else {
            MissingType::None
        };

        let mut sorted: Vec<f64> = values
            .iter()
            .map(|&v| {
                if v.is_nan() {
                    // only reached when NaN has no bin of its own
                    if missing_type == MissingType::NaN {
                        f64::NAN
                    } else {
                        0.0
                    }
                } else {
                    v as f64
                }
            })
            .filter(|v| !v.is_nan())
            .collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mut distinct: Vec<f64> = Vec::new();
        let mut counts: Vec<usize> = Vec::new();
        for v in sorted {
            match distinct.last() {
                Some(&last) if last == v => {
                    if let Some(c) = counts.last_mut() {
                        *c += 1;
                    }
                }
                _ => {
                    distinct.push(v);
                    counts.push(1);
                }
            }
        }

        let max_value_bins = if missing_type == MissingType::NaN {
            params.max_bin - 1
        } else {
            params.max_bin
        };
        let upper_bounds =
            greedy_upper_bounds(&distinct, &counts, max_value_bins, params.min_data_in_bin);

        let num_value_bins = upper_bounds.len() + 1;
        let num_bins = num_value_bins + usize::from(missing_type == MissingType::NaN);
        let is_trivial = distinct.len() + usize::from(missing_type == MissingType::NaN) <= 1;

        Ok(BinMapper {
            feature_type: FeatureType::Numerical,
            missing_type,
            upper_bounds,
            bin_to_category: Vec::new(),
            category_to_bin: HashMap::new(),
            num_bins,
            is_trivial,
        })
    }

    /// Build a categorical mapper from sampled values.
    ///
    /// Values are truncated to integers. The most frequent categories get
    /// the lowest bins; ties are broken by the smaller category value.
    pub fn new_categorical(values: &[f32], params: &BinningParams) -> Result<Self> {
        if params.max_bin < 2 {
            return Err(LightGBMError::invalid_parameter(
                "max_bin",
                params.max_bin.to_string(),
                "must be at least 2",
            ));
        }

        let mut counts: HashMap<i32, usize> = HashMap::new();
        let mut num_other = 0usize;
        for &v in values {
            if v.is_nan() || v < 0.0 {
                num_other += 1;
            } else if v > MAX_CATEGORY_VALUE as f32 {
                return Err(LightGBMError::dataset(format!(
                    "Categorical value {} exceeds the maximum of {}; renumber categories to consecutive integers starting from zero",
                    v, MAX_CATEGORY_VALUE
                )));
            } else {
                *counts.entry(v as i32).or_insert(0) += 1;
            }
        }

        let mut categories: Vec<(i32, usize)> = counts.into_iter().collect();
        categories.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let keep = categories.len().min(params.max_bin - 1);
        let dropped: usize = categories[keep..].iter().map(|&(_, c)| c).sum();
        if keep < categories.len() {
            log::warn!(
                "Categorical feature has {} categories, only the {} most frequent get their own bin",
                categories.len(),
                keep
            );
        }
        num_other += dropped;

        let bin_to_category: Vec<i32> = categories[..keep].iter().map(|&(c, _)| c).collect();
        let category_to_bin = bin_to_category
            .iter()
            .enumerate()
            .map(|(bin, &c)| (c, bin as BinIndex))
            .collect();

        let num_bins = keep + 1;
        let non_empty = keep + usize::from(num_other > 0);
        let missing_type = if num_other > 0 {
            MissingType::NaN
        } else {
            MissingType::None
        };

        Ok(BinMapper {
            feature_type: FeatureType::Categorical,
            missing_type,
            upper_bounds: Vec::new(),
            bin_to_category,
            category_to_bin,
            num_bins,
            is_trivial: non_empty <= 1,
        })
    }

    /// Map a raw value to its bin.
    pub fn value_to_bin(&self, value: f64) -> BinIndex {
        match self.feature_type {
            FeatureType::Numerical => {
                let value = if value.is_nan() {
                    match self.missing_type {
                        MissingType::NaN => return (self.num_bins - 1) as BinIndex,
                        MissingType::None => 0.0,
                    }
                } else {
                    value
                };
                self.upper_bounds.partition_point(|&ub| ub < value) as BinIndex
            }
            FeatureType::Categorical => {
                if value.is_nan() || value < 0.0 {
                    return self.other_bin();
                }
                self.category_to_bin
                    .get(&(value as i32))
                    .copied()
                    .unwrap_or_else(|| self.other_bin())
            }
        }
    }

    /// Split threshold that separates `bin` (inclusive, left) from `bin + 1`.
    pub fn bin_upper_bound(&self, bin: BinIndex) -> f64 {
        self.upper_bounds
            .get(bin as usize)
            .copied()
            .unwrap_or(f64::INFINITY)
    }

    /// Category value stored in a categorical bin, `None` for the other bin.
    pub fn bin_to_category(&self, bin: BinIndex) -> Option<i32> {
        self.bin_to_category.get(bin as usize).copied()
    }

    /// Category values in bin order.
    pub fn categories(&self) -> &[i32] {
        &self.bin_to_category
    }

    /// Upper bounds of the numerical value bins except the last.
    pub fn upper_bounds(&self) -> &[f64] {
        &self.upper_bounds
    }

    /// Bin that collects negative, NaN and unseen categories.
    pub fn other_bin(&self) -> BinIndex {
        (self.num_bins - 1) as BinIndex
    }

    /// Bin holding missing values, if any.
    pub fn missing_bin(&self) -> Option<BinIndex> {
        match (self.feature_type, self.missing_type) {
            (FeatureType::Numerical, MissingType::NaN) => Some((self.num_bins - 1) as BinIndex),
            (FeatureType::Categorical, _) => Some(self.other_bin()),
            _ => None,
        }
    }

    /// Total number of bins, including the missing or other bin.
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    pub fn feature_type(&self) -> FeatureType {
        self.feature_type
    }

    pub fn missing_type(&self) -> MissingType {
        self.missing_type
    }

    /// A feature with at most one populated bin can never be split.
    pub fn is_trivial(&self) -> bool {
        self.is_trivial
    }
}

/// Greedily place bin boundaries over sorted distinct values.
///
/// Each bin collects at least `min_data_in_bin` rows and roughly an equal
/// share of the remaining rows, so no more than `max_bins` bins are made.
/// Boundaries sit halfway between neighbouring distinct values.
fn greedy_upper_bounds(
    distinct: &[f64],
    counts: &[usize],
    max_bins: usize,
    min_data_in_bin: usize,
) -> Vec<f64> {
    let mut bounds = Vec::new();
    if distinct.len() <= 1 {
        return bounds;
    }

    let total: usize = counts.iter().sum();
    let mut remaining = total;
    let mut current = 0usize;

    for i in 0..distinct.len() - 1 {
        current += counts[i];
        remaining -= counts[i];

        if bounds.len() + 1 >= max_bins {
            break;
        }

        let bins_left = max_bins - bounds.len();
        let target = if distinct.len() <= max_bins {
            1
        } else {
            (current + remaining) / bins_left
        };

        if current >= target.max(min_data_in_bin.max(1)) {
            bounds.push(midpoint(distinct[i], distinct[i + 1]));
            current = 0;
        }
    }

    bounds
}

fn midpoint(lower: f64, upper: f64) -> f64 {
    let mid = lower + (upper - lower) / 2.0;
    if mid.is_finite() && mid >= lower && mid < upper {
        mid
    } else if lower.is_finite() {
        lower
    } else {
        // keeps thresholds finite so models stay JSON-representable
        f64::MIN
    }
}
