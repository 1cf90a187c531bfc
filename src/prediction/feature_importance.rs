//! Split- and gain-based feature importance.

use crate::boosting::Booster;
use crate::core::types::ImportanceType;

/// Importance of every feature over the first `num_iteration` rounds.
///
/// With `None` the best iteration is used when one was recorded and every
/// round otherwise; `Some(0)` also selects every round. Features never used
/// in a split score zero.
pub fn feature_importance(
    booster: &Booster,
    importance_type: ImportanceType,
    num_iteration: Option<usize>,
) -> Vec<f64> {
    let (_, end) = booster.iteration_range(0, num_iteration);
    let num_trees = end * booster.num_tree_per_iteration();
    let mut importance = vec![0.0; booster.num_features()];

    for tree in &booster.trees()[..num_trees] {
        for split in tree.splits() {
            if let Some(slot) = importance.get_mut(split.feature) {
                match importance_type {
                    ImportanceType::Split => *slot += 1.0,
                    ImportanceType::Gain => *slot += split.gain,
                }
            }
        }
    }
    importance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::MissingType;
    use crate::tree::{LeafStats, SplitCondition, Tree};
    use approx::assert_relative_eq;

    fn tree_on(feature: usize, gain: f64) -> Tree {
        let leaf = LeafStats {
            output: 1.0,
            data_count: 1,
            sum_hessians: 1.0,
        };
        let mut tree = Tree::new();
        let condition = SplitCondition::Numerical {
            threshold: 0.0,
            default_left: false,
            missing_type: MissingType::None,
        };
        tree.split(0, feature, condition, gain, leaf, leaf).unwrap();
        tree
    }

    #[test]
    fn test_split_and_gain() {
        let trees = vec![tree_on(0, 2.0), tree_on(2, 0.5), tree_on(0, 1.0)];
        let booster = Booster::from_trees(trees, 1, 3);

        assert_eq!(
            feature_importance(&booster, ImportanceType::Split, None),
            vec![2.0, 0.0, 1.0]
        );
        let gain = feature_importance(&booster, ImportanceType::Gain, None);
        assert_relative_eq!(gain[0], 3.0);
        assert_relative_eq!(gain[2], 0.5);
    }

    #[test]
    fn test_iteration_limit_and_best_iteration() {
        let trees = vec![tree_on(0, 2.0), tree_on(1, 0.5)];
        let mut booster = Booster::from_trees(trees, 1, 2);
        assert_eq!(
            feature_importance(&booster, ImportanceType::Split, Some(1)),
            vec![1.0, 0.0]
        );
        booster.best_iteration = Some(1);
        assert_eq!(
            feature_importance(&booster, ImportanceType::Split, None),
            vec![1.0, 0.0]
        );
        assert_eq!(
            feature_importance(&booster, ImportanceType::Split, Some(0)),
            vec![1.0, 1.0]
        );
    }

    #[test]
    fn test_no_splits_is_all_zero() {
        let booster = Booster::from_trees(vec![Tree::constant(1.0, 4)], 1, 4);
        assert_eq!(
            feature_importance(&booster, ImportanceType::Gain, None),
            vec![0.0; 4]
        );
    }
}
