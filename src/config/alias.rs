//! Parameter and value alias resolution.
//!
//! Many spellings map onto one canonical option (`n_estimators`,
//! `num_boost_round` and `num_iterations` are the same parameter). The
//! tables below are the single source of truth for those mappings and for
//! the precedence used when several spellings of one option are supplied
//! with different values:
//!
//! 1. the canonical name wins over any alias;
//! 2. among aliases, the one listed first in [`PARAMETER_ALIASES`] wins.
//!
//! The order of the alias lists is therefore part of the contract, not a
//! registration artifact. For the `metric` option the precedence is
//! `metric` > `metrics` > `metric_types`.
//!
//! Across sources the precedence is explicit builder argument > parameter
//! map > default; that layer lives in [`crate::config::ConfigBuilder`].

use crate::core::error::{LightGBMError, Result};
use crate::core::types::{MetricKind, ObjectiveType};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

/// Canonical parameter names and their aliases, in precedence order.
pub static PARAMETER_ALIASES: &[(&str, &[&str])] = &[
    ("objective", &["objective_type", "app", "application", "loss"]),
    ("boosting", &["boosting_type", "boost"]),
    ("data_sample_strategy", &[]),
    (
        "num_iterations",
        &[
            "num_iteration",
            "n_iter",
            "num_tree",
            "num_trees",
            "num_round",
            "num_rounds",
            "nrounds",
            "num_boost_round",
            "n_estimators",
            "max_iter",
        ],
    ),
    ("learning_rate", &["shrinkage_rate", "eta"]),
    ("num_leaves", &["num_leaf", "max_leaves", "max_leaf", "max_leaf_nodes"]),
    ("grow_policy", &["growth_policy", "tree_growth"]),
    ("num_threads", &["num_thread", "nthread", "nthreads", "n_jobs"]),
    ("seed", &["random_seed", "random_state"]),
    ("max_depth", &[]),
    (
        "min_data_in_leaf",
        &["min_data_per_leaf", "min_data", "min_child_samples", "min_samples_leaf"],
    ),
    (
        "min_sum_hessian_in_leaf",
        &["min_sum_hessian_per_leaf", "min_sum_hessian", "min_hessian", "min_child_weight"],
    ),
    ("bagging_fraction", &["sub_row", "subsample", "bagging"]),
    ("bagging_freq", &["subsample_freq"]),
    ("bagging_seed", &["bagging_fraction_seed"]),
    ("feature_fraction", &["sub_feature", "colsample_bytree"]),
    ("feature_fraction_seed", &[]),
    (
        "early_stopping_round",
        &["early_stopping_rounds", "early_stopping", "n_iter_no_change"],
    ),
    ("first_metric_only", &[]),
    ("early_stopping_min_delta", &[]),
    ("max_delta_step", &["max_tree_output", "max_leaf_output"]),
    ("lambda_l1", &["reg_alpha", "l1_regularization"]),
    ("lambda_l2", &["reg_lambda", "lambda", "l2_regularization"]),
    ("min_gain_to_split", &["min_split_gain"]),
    ("drop_rate", &["rate_drop"]),
    ("max_drop", &[]),
    ("skip_drop", &[]),
    ("xgboost_dart_mode", &[]),
    ("uniform_drop", &[]),
    ("drop_seed", &[]),
    ("top_rate", &[]),
    ("other_rate", &[]),
    ("min_data_per_group", &[]),
    ("max_cat_threshold", &[]),
    ("cat_l2", &[]),
    ("cat_smooth", &[]),
    ("max_cat_to_onehot", &[]),
    ("max_bin", &["max_bins"]),
    ("min_data_in_bin", &[]),
    ("bin_construct_sample_cnt", &["subsample_for_bin"]),
    ("use_missing", &[]),
    (
        "categorical_feature",
        &["cat_feature", "categorical_column", "cat_column", "categorical_features"],
    ),
    ("num_class", &["num_classes"]),
    ("is_unbalance", &["unbalance", "unbalanced_sets"]),
    ("scale_pos_weight", &[]),
    ("sigmoid", &[]),
    ("boost_from_average", &[]),
    ("alpha", &[]),
    ("lambdarank_truncation_level", &[]),
    ("lambdarank_norm", &[]),
    ("label_gain", &[]),
    ("metric", &["metrics", "metric_types"]),
    ("eval_at", &["ndcg_eval_at", "ndcg_at", "map_eval_at", "map_at"]),
    ("multi_error_top_k", &[]),
    (
        "is_provide_training_metric",
        &["training_metric", "is_training_metric", "train_metric"],
    ),
    ("verbosity", &["verbose"]),
    ("use_histogram_subtraction", &["histogram_subtraction"]),
];

/// Accepted spellings of each objective value.
pub static OBJECTIVE_ALIASES: &[(ObjectiveType, &[&str])] = &[
    (
        ObjectiveType::Regression,
        &[
            "regression",
            "regression_l2",
            "l2",
            "mean_squared_error",
            "mse",
            "l2_root",
            "root_mean_squared_error",
            "rmse",
        ],
    ),
    (
        ObjectiveType::RegressionL1,
        &["regression_l1", "l1", "mean_absolute_error", "mae"],
    ),
    (ObjectiveType::Huber, &["huber"]),
    (ObjectiveType::Quantile, &["quantile"]),
    (ObjectiveType::Mape, &["mape", "mean_absolute_percentage_error"]),
    (ObjectiveType::Binary, &["binary"]),
    (ObjectiveType::Multiclass, &["multiclass", "softmax"]),
    (ObjectiveType::LambdaRank, &["lambdarank"]),
    (ObjectiveType::Custom, &["custom", "none", "null", "na"]),
];

/// Accepted spellings of each metric value.
pub static METRIC_ALIASES: &[(MetricKind, &[&str])] = &[
    (MetricKind::None, &["none", "null", "custom", "na"]),
    (
        MetricKind::L2,
        &["l2", "mean_squared_error", "mse", "regression_l2", "regression"],
    ),
    (MetricKind::Rmse, &["rmse", "root_mean_squared_error", "l2_root"]),
    (
        MetricKind::L1,
        &["l1", "mean_absolute_error", "mae", "regression_l1"],
    ),
    (MetricKind::Huber, &["huber"]),
    (MetricKind::Quantile, &["quantile"]),
    (MetricKind::Mape, &["mape", "mean_absolute_percentage_error"]),
    (MetricKind::BinaryLogloss, &["binary_logloss", "binary"]),
    (MetricKind::BinaryError, &["binary_error"]),
    (MetricKind::Auc, &["auc"]),
    (
        MetricKind::MultiLogloss,
        &["multi_logloss", "multiclass", "softmax"],
    ),
    (MetricKind::MultiError, &["multi_error"]),
    (MetricKind::Ndcg, &["ndcg", "lambdarank"]),
];

struct AliasTable {
    /// spelling -> (canonical name, precedence rank)
    lookup: HashMap<&'static str, (&'static str, usize)>,
}

fn alias_table() -> &'static AliasTable {
    static TABLE: OnceLock<AliasTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut lookup = HashMap::new();
        for &(canonical, aliases) in PARAMETER_ALIASES {
            lookup.insert(canonical, (canonical, 0));
            for (rank, &alias) in aliases.iter().enumerate() {
                lookup.entry(alias).or_insert((canonical, rank + 1));
            }
        }
        AliasTable { lookup }
    })
}

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase().replace('-', "_")
}

/// Canonical name of a parameter spelling, if known.
pub fn canonical_name(key: &str) -> Option<&'static str> {
    alias_table()
        .lookup
        .get(normalize_key(key).as_str())
        .map(|&(canonical, _)| canonical)
}

/// Precedence rank of a spelling: 0 for the canonical name, `i + 1` for the
/// `i`-th listed alias.
pub fn precedence_rank(key: &str) -> Option<usize> {
    alias_table()
        .lookup
        .get(normalize_key(key).as_str())
        .map(|&(_, rank)| rank)
}

/// Resolve a raw parameter map onto canonical names.
///
/// Unknown keys are ignored with a warning. When one option is given under
/// several spellings, the highest-precedence spelling wins regardless of
/// the iteration order of `params`.
pub fn resolve_params<I, K, V>(params: I) -> BTreeMap<&'static str, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut resolved: BTreeMap<&'static str, (usize, String, String)> = BTreeMap::new();

    for (key, value) in params {
        let key = normalize_key(key.as_ref());
        let value = value.as_ref().trim().to_string();
        let Some(&(canonical, rank)) = alias_table().lookup.get(key.as_str()) else {
            log::warn!("Unknown parameter: {}", key);
            continue;
        };

        match resolved.get(canonical) {
            Some((best_rank, best_key, best_value)) => {
                let (winner_key, winner_value, loser_key, loser_value) =
                    if rank < *best_rank || (rank == *best_rank && key < *best_key) {
                        (key.clone(), value.clone(), best_key.clone(), best_value.clone())
                    } else {
                        (best_key.clone(), best_value.clone(), key.clone(), value.clone())
                    };
                if winner_value != loser_value {
                    log::warn!(
                        "{} is set with {}={}, {}={} will be ignored. Current value: {}={}",
                        canonical,
                        winner_key,
                        winner_value,
                        loser_key,
                        loser_value,
                        winner_key,
                        winner_value
                    );
                }
                let new_rank = rank.min(*best_rank);
                resolved.insert(canonical, (new_rank, winner_key, winner_value));
            }
            None => {
                resolved.insert(canonical, (rank, key, value));
            }
        }
    }

    resolved
        .into_iter()
        .map(|(canonical, (_, _, value))| (canonical, value))
        .collect()
}

/// Resolve an objective spelling.
pub fn resolve_objective(value: &str) -> Result<ObjectiveType> {
    let value = normalize_key(value);
    OBJECTIVE_ALIASES
        .iter()
        .find(|(_, names)| names.contains(&value.as_str()))
        .map(|&(objective, _)| objective)
        .ok_or_else(|| {
            LightGBMError::invalid_parameter("objective", value, "unknown objective")
        })
}

/// Resolve a single metric spelling.
pub fn resolve_metric(value: &str) -> Result<MetricKind> {
    let value = normalize_key(value);
    // `ndcg@k` selects NDCG; the positions come from `eval_at`
    let base = value.split('@').next().unwrap_or_default();
    METRIC_ALIASES
        .iter()
        .find(|(_, names)| names.contains(&base))
        .map(|&(kind, _)| kind)
        .ok_or_else(|| LightGBMError::invalid_parameter("metric", value.clone(), "unknown metric"))
}

/// Parse a comma separated metric list.
///
/// Aliases of one metric collapse onto a single entry (`"l2,regression,mse"`
/// is `[l2]`), keeping first-occurrence order.
pub fn parse_metric_list(value: &str) -> Result<Vec<MetricKind>> {
    let mut metrics = Vec::new();
    for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let kind = resolve_metric(name)?;
        if !metrics.contains(&kind) {
            metrics.push(kind);
        }
    }
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_lookup() {
        assert_eq!(canonical_name("n_estimators"), Some("num_iterations"));
        assert_eq!(canonical_name("num_boost_round"), Some("num_iterations"));
        assert_eq!(canonical_name("reg_lambda"), Some("lambda_l2"));
        assert_eq!(canonical_name("min_child_samples"), Some("min_data_in_leaf"));
        assert_eq!(canonical_name("boosting_type"), Some("boosting"));
        assert_eq!(canonical_name("early_stopping_rounds"), Some("early_stopping_round"));
        assert_eq!(canonical_name("Learning-Rate"), Some("learning_rate"));
        assert_eq!(canonical_name("not_a_parameter"), None);
    }

    #[test]
    fn test_alias_lists_are_disjoint() {
        let mut seen = std::collections::HashSet::new();
        for (canonical, aliases) in PARAMETER_ALIASES {
            assert!(seen.insert(*canonical), "duplicate {}", canonical);
            for alias in *aliases {
                assert!(seen.insert(*alias), "duplicate {}", alias);
            }
        }
    }

    #[test]
    fn test_canonical_name_wins_over_alias() {
        let resolved = resolve_params(vec![
            ("n_estimators", "10"),
            ("num_iterations", "20"),
            ("num_round", "30"),
        ]);
        assert_eq!(resolved.get("num_iterations").map(String::as_str), Some("20"));
    }

    #[test]
    fn test_alias_order_defines_precedence() {
        // metric > metrics > metric_types, independent of input order
        let resolved = resolve_params(vec![("metric_types", "l1"), ("metrics", "auc")]);
        assert_eq!(resolved.get("metric").map(String::as_str), Some("auc"));

        let resolved = resolve_params(vec![("metrics", "auc"), ("metric_types", "l1")]);
        assert_eq!(resolved.get("metric").map(String::as_str), Some("auc"));

        let resolved = resolve_params(vec![("metric_types", "l1"), ("metric", "mape")]);
        assert_eq!(resolved.get("metric").map(String::as_str), Some("mape"));
    }

    #[test]
    fn test_unknown_parameters_are_ignored() {
        let resolved = resolve_params(vec![("unknown_option", "1"), ("eta", "0.3")]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved.get("learning_rate").map(String::as_str), Some("0.3"));
    }

    #[test]
    fn test_objective_aliases() {
        assert_eq!(resolve_objective("mse").unwrap(), ObjectiveType::Regression);
        assert_eq!(resolve_objective("MAE").unwrap(), ObjectiveType::RegressionL1);
        assert_eq!(resolve_objective("softmax").unwrap(), ObjectiveType::Multiclass);
        assert_eq!(resolve_objective("none").unwrap(), ObjectiveType::Custom);
        assert!(resolve_objective("poisson_like").is_err());
    }

    #[test]
    fn test_metric_aliases_collapse() {
        let metrics = parse_metric_list("l2, regression, mse").unwrap();
        assert_eq!(metrics, vec![MetricKind::L2]);

        let metrics = parse_metric_list("l1,l2").unwrap();
        assert_eq!(metrics, vec![MetricKind::L1, MetricKind::L2]);

        assert_eq!(resolve_metric("None").unwrap(), MetricKind::None);
        assert_eq!(resolve_metric("ndcg@3").unwrap(), MetricKind::Ndcg);
        assert!(resolve_metric("gamma_deviance").is_err());
    }

    #[test]
    fn test_precedence_rank() {
        assert_eq!(precedence_rank("metric"), Some(0));
        assert_eq!(precedence_rank("metrics"), Some(1));
        assert_eq!(precedence_rank("metric_types"), Some(2));
    }
}
