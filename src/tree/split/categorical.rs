//! Categorical split search.
//!
//! Few categories are split one-vs-rest. Otherwise the categories with
//! enough support are sorted by `sum_gradient / (sum_hessian + cat_smooth)`
//! and scanned from both ends, sending a growing prefix of the order to the
//! left child. The "other" bin (NaN, negative, rare and unseen categories)
//! never joins the left set.

use crate::core::types::{BinIndex, FeatureIndex};
use crate::dataset::BinMapper;
use crate::tree::histogram::{BinEntry, FeatureHistogram};
use crate::tree::split::finder::{SplitFinder, SplitInfo};

impl SplitFinder {
    pub(crate) fn find_categorical(
        &self,
        feature: FeatureIndex,
        histogram: &FeatureHistogram,
        mapper: &BinMapper,
        parent: &BinEntry,
    ) -> Option<SplitInfo> {
        let config = self.config();
        let category_bins = mapper.other_bin() as usize;
        if category_bins == 0 {
            return None;
        }

        if category_bins <= config.max_cat_to_onehot {
            self.find_one_hot(feature, histogram, category_bins, parent)
        } else {
            self.find_sorted(feature, histogram, category_bins, parent)
        }
    }

    fn find_one_hot(
        &self,
        feature: FeatureIndex,
        histogram: &FeatureHistogram,
        category_bins: usize,
        parent: &BinEntry,
    ) -> Option<SplitInfo> {
        let lambda_l2 = self.config().lambda_l2;
        let min_gain_shift = self.gain_of(parent, lambda_l2) + self.config().min_gain_to_split;

        let mut best_gain = f64::NEG_INFINITY;
        let mut best_bin = None;
        for bin in 0..category_bins {
            let left = *histogram.bin(bin as BinIndex);
            let right = parent.subtract(&left);
            if !self.children_allowed(&left, &right) {
                continue;
            }
            let gain = self.gain_of(&left, lambda_l2) + self.gain_of(&right, lambda_l2);
            if gain > min_gain_shift && gain > best_gain {
                best_gain = gain;
                best_bin = Some(bin as BinIndex);
            }
        }

        let bin = best_bin?;
        let left = *histogram.bin(bin);
        Some(self.categorical_split(
            feature,
            vec![bin],
            left,
            parent,
            best_gain - min_gain_shift,
            lambda_l2,
        ))
    }

    fn find_sorted(
        &self,
        feature: FeatureIndex,
        histogram: &FeatureHistogram,
        category_bins: usize,
        parent: &BinEntry,
    ) -> Option<SplitInfo> {
        let config = self.config();
        let lambda_l2 = config.lambda_l2 + config.cat_l2;
        let min_gain_shift = self.gain_of(parent, lambda_l2) + config.min_gain_to_split;

        let mut sorted: Vec<BinIndex> = (0..category_bins as BinIndex)
            .filter(|&bin| histogram.bin(bin).count as f64 >= config.cat_smooth)
            .collect();
        if sorted.is_empty() {
            return None;
        }
        let ratio = |bin: BinIndex| {
            let entry = histogram.bin(bin);
            entry.sum_gradients / (entry.sum_hessians + config.cat_smooth)
        };
        sorted.sort_by(|&a, &b| ratio(a).total_cmp(&ratio(b)).then(a.cmp(&b)));

        let used = sorted.len();
        let max_num_cat = config.max_cat_threshold.min((used + 1) / 2).max(1);

        let mut best_gain = f64::NEG_INFINITY;
        let mut best: Option<(bool, usize, BinEntry)> = None;

        for reverse in [false, true] {
            let mut left = BinEntry::default();
            let mut group_count = 0;
            for i in 0..used.min(max_num_cat) {
                let bin = if reverse { sorted[used - 1 - i] } else { sorted[i] };
                let entry = histogram.bin(bin);
                left.accumulate(entry);
                group_count += entry.count;

                if left.count < config.min_data_in_leaf
                    || left.sum_hessians < config.min_sum_hessian_in_leaf
                {
                    continue;
                }
                let right = parent.subtract(&left);
                if right.count < config.min_data_in_leaf
                    || right.sum_hessians < config.min_sum_hessian_in_leaf
                {
                    break;
                }
                if group_count < config.min_data_per_group {
                    continue;
                }
                group_count = 0;

                let gain = self.gain_of(&left, lambda_l2) + self.gain_of(&right, lambda_l2);
                if gain > min_gain_shift && gain > best_gain {
                    best_gain = gain;
                    best = Some((reverse, i + 1, left));
                }
            }
        }

        let (reverse, take, left) = best?;
        let mut bins: Vec<BinIndex> = if reverse {
            sorted.iter().rev().take(take).copied().collect()
        } else {
            sorted.iter().take(take).copied().collect()
        };
        bins.sort_unstable();
        Some(self.categorical_split(feature, bins, left, parent, best_gain - min_gain_shift, lambda_l2))
    }

    fn categorical_split(
        &self,
        feature: FeatureIndex,
        bins: Vec<BinIndex>,
        left: BinEntry,
        parent: &BinEntry,
        gain: f64,
        lambda_l2: f64,
    ) -> SplitInfo {
        let right = parent.subtract(&left);
        SplitInfo {
            feature,
            threshold_bin: 0,
            threshold: 0.0,
            gain,
            left_sum_gradient: left.sum_gradients,
            left_sum_hessian: left.sum_hessians,
            left_count: left.count,
            right_sum_gradient: right.sum_gradients,
            right_sum_hessian: right.sum_hessians,
            right_count: right.count,
            left_output: self.output_of(&left, lambda_l2),
            right_output: self.output_of(&right, lambda_l2),
            default_left: false,
            categorical_bins: bins,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::dataset::{BinMapper, BinningParams};
    use crate::tree::histogram::{BinEntry, FeatureHistogram};
    use crate::tree::split::finder::{SplitFinder, SplitFinderConfig};

    fn categorical_mapper(num_categories: usize) -> BinMapper {
        let values: Vec<f32> = (0..num_categories)
            .flat_map(|c| std::iter::repeat(c as f32).take(num_categories + 5 - c))
            .collect();
        BinMapper::new_categorical(
            &values,
            &BinningParams {
                max_bin: 255,
                min_data_in_bin: 1,
                use_missing: true,
            },
        )
        .unwrap()
    }

    fn histogram_with(entries: &[(f64, f64, u32)]) -> FeatureHistogram {
        let mut hist = FeatureHistogram::new(entries.len());
        for (slot, &(g, h, c)) in hist.bins_mut().iter_mut().zip(entries) {
            *slot = BinEntry {
                sum_gradients: g,
                sum_hessians: h,
                count: c,
            };
        }
        hist
    }

    fn finder() -> SplitFinder {
        SplitFinder::new(SplitFinderConfig {
            min_data_in_leaf: 1,
            min_sum_hessian_in_leaf: 0.0,
            cat_smooth: 1.0,
            cat_l2: 0.0,
            min_data_per_group: 1,
            ..SplitFinderConfig::default()
        })
    }

    #[test]
    fn test_one_hot_picks_single_category() {
        let mapper = categorical_mapper(3);
        // three category bins plus the empty other bin
        let hist = histogram_with(&[(1.0, 5.0, 5), (-9.0, 5.0, 5), (1.0, 5.0, 5), (0.0, 0.0, 0)]);
        let parent = hist.total();
        let split = finder()
            .find_best_split_for_feature(0, &hist, &mapper, &parent)
            .unwrap();
        assert_eq!(split.categorical_bins, vec![1]);
        assert!(!split.default_left);
        assert!(split.left_output > 0.0);
    }

    #[test]
    fn test_sorted_scan_groups_similar_categories() {
        let mapper = categorical_mapper(6);
        let hist = histogram_with(&[
            (-5.0, 5.0, 5),
            (5.0, 5.0, 5),
            (-5.0, 5.0, 5),
            (5.0, 5.0, 5),
            (-5.0, 5.0, 5),
            (5.0, 5.0, 5),
            (0.0, 0.0, 0),
        ]);
        let parent = hist.total();
        let split = finder()
            .find_best_split_for_feature(0, &hist, &mapper, &parent)
            .unwrap();
        assert!(split.is_categorical());
        let negatives = vec![0, 2, 4];
        let positives = vec![1, 3, 5];
        assert!(split.categorical_bins == negatives || split.categorical_bins == positives);
        assert_eq!(split.left_count, 15);
    }

    #[test]
    fn test_other_bin_never_goes_left() {
        let mapper = categorical_mapper(2);
        let hist = histogram_with(&[(1.0, 3.0, 3), (1.0, 3.0, 3), (-20.0, 3.0, 3)]);
        let parent = hist.total();
        if let Some(split) = finder().find_best_split_for_feature(0, &hist, &mapper, &parent) {
            assert!(!split.categorical_bins.contains(&mapper.other_bin()));
        }
    }
}
