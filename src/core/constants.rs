//! Default configuration values and numeric constants.
//!
//! Defaults follow LightGBM's documented parameter defaults so that a
//! configuration built from an empty parameter map behaves like the
//! reference implementation.

/// Default maximum number of bins for feature discretization.
pub const DEFAULT_MAX_BIN: usize = 255;

/// Default minimum number of rows in one bin.
pub const DEFAULT_MIN_DATA_IN_BIN: usize = 3;

/// Default number of rows sampled to construct bin boundaries.
pub const DEFAULT_BIN_CONSTRUCT_SAMPLE_CNT: usize = 200_000;

/// Default minimum number of data points required in a leaf.
pub const DEFAULT_MIN_DATA_IN_LEAF: usize = 20;

/// Default minimum sum of hessian values required in a leaf.
pub const DEFAULT_MIN_SUM_HESSIAN_IN_LEAF: f64 = 1e-3;

/// Default maximum tree depth.
/// Non-positive values mean no limit.
pub const DEFAULT_MAX_DEPTH: i32 = -1;

/// Default number of leaves for each tree.
pub const DEFAULT_NUM_LEAVES: usize = 31;

/// Upper bound accepted for `num_leaves`.
pub const MAX_NUM_LEAVES: usize = 131_072;

/// Default learning rate (shrinkage) for gradient boosting.
pub const DEFAULT_LEARNING_RATE: f64 = 0.1;

/// Default number of boosting iterations.
pub const DEFAULT_NUM_ITERATIONS: usize = 100;

/// Default L1 regularization parameter.
pub const DEFAULT_LAMBDA_L1: f64 = 0.0;

/// Default L2 regularization parameter.
pub const DEFAULT_LAMBDA_L2: f64 = 0.0;

/// Default minimum gain required to perform a split.
pub const DEFAULT_MIN_GAIN_TO_SPLIT: f64 = 0.0;

/// Default feature fraction for subsampling features per tree.
pub const DEFAULT_FEATURE_FRACTION: f64 = 1.0;

/// Default bagging fraction for subsampling rows.
pub const DEFAULT_BAGGING_FRACTION: f64 = 1.0;

/// Default bagging frequency (0 disables bagging).
pub const DEFAULT_BAGGING_FREQ: usize = 0;

/// Default seeds for the random components.
pub const DEFAULT_BAGGING_SEED: u64 = 3;
pub const DEFAULT_FEATURE_FRACTION_SEED: u64 = 2;
pub const DEFAULT_DROP_SEED: u64 = 4;

/// Seed of the row sample used to construct bin boundaries.
pub const DEFAULT_DATA_RANDOM_SEED: u64 = 1;

/// Default GOSS retain ratio of large-gradient rows.
pub const DEFAULT_TOP_RATE: f64 = 0.2;

/// Default GOSS retain ratio of small-gradient rows.
pub const DEFAULT_OTHER_RATE: f64 = 0.1;

/// DART defaults.
pub const DEFAULT_DROP_RATE: f64 = 0.1;
pub const DEFAULT_MAX_DROP: i32 = 50;
pub const DEFAULT_SKIP_DROP: f64 = 0.5;

/// Categorical split defaults.
pub const DEFAULT_MAX_CAT_TO_ONEHOT: usize = 4;
pub const DEFAULT_MAX_CAT_THRESHOLD: usize = 32;
pub const DEFAULT_CAT_SMOOTH: f64 = 10.0;
pub const DEFAULT_CAT_L2: f64 = 10.0;
pub const DEFAULT_MIN_DATA_PER_GROUP: usize = 100;

/// Largest category value a categorical feature may hold.
pub const MAX_CATEGORY_VALUE: i32 = 1 << 24;

/// Default Huber delta and quantile level.
pub const DEFAULT_ALPHA: f64 = 0.9;

/// Default sigmoid scale for binary classification and LambdaRank.
pub const DEFAULT_SIGMOID: f64 = 1.0;

/// Default truncation level for LambdaRank pairs.
pub const DEFAULT_LAMBDARANK_TRUNCATION_LEVEL: usize = 30;

/// Default NDCG evaluation positions.
pub const DEFAULT_EVAL_AT: [usize; 5] = [1, 2, 3, 4, 5];

/// Number of default label gains (`2^i - 1` for `i` in `0..31`).
pub const DEFAULT_LABEL_GAIN_SIZE: usize = 31;

/// Default prediction early-stopping check period.
pub const DEFAULT_PRED_EARLY_STOP_FREQ: usize = 10;

/// Default prediction early-stopping margin.
pub const DEFAULT_PRED_EARLY_STOP_MARGIN: f64 = 10.0;

/// Small constant guarding divisions and probability clipping.
pub const K_EPSILON: f64 = 1e-15;

/// Zero threshold for hessian sums and gains.
pub const K_ZERO_THRESHOLD: f64 = 1e-35;

/// Version tag written into serialized models.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Default label gains used by LambdaRank and NDCG: `2^i - 1`.
pub fn default_label_gain() -> Vec<f64> {
    (0..DEFAULT_LABEL_GAIN_SIZE)
        .map(|i| ((1u64 << i) - 1) as f64)
        .collect()
}

/// Default names given to unnamed feature columns.
pub fn default_feature_name(index: usize) -> String {
    format!("Column_{}", index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_label_gain() {
        let gains = default_label_gain();
        assert_eq!(gains.len(), DEFAULT_LABEL_GAIN_SIZE);
        assert_eq!(gains[0], 0.0);
        assert_eq!(gains[1], 1.0);
        assert_eq!(gains[3], 7.0);
    }

    #[test]
    fn test_feature_name() {
        assert_eq!(default_feature_name(3), "Column_3");
    }
}
