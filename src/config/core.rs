//! Core configuration structure and builder.
//!
//! [`Config`] holds every training parameter under its canonical LightGBM
//! name. Values arrive from three sources with a fixed precedence: an
//! explicit [`ConfigBuilder`] setter beats a parameter map entry, which
//! beats the default. Parameter maps and configuration files go through the
//! alias table in [`crate::config::alias`].

use crate::config::alias;
use crate::core::constants::*;
use crate::core::error::{LightGBMError, Result};
use crate::core::types::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Main configuration structure for training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Core training parameters
    /// Objective function type
    pub objective: ObjectiveType,
    /// Boosting algorithm
    pub boosting: BoostingType,
    /// Row sampling strategy
    pub data_sample_strategy: DataSampleStrategy,
    /// Number of boosting rounds
    pub num_iterations: usize,
    /// Shrinkage applied to every new tree
    pub learning_rate: f64,
    /// Maximum number of leaves in one tree
    pub num_leaves: usize,
    /// Leaf-wise (best-first) or depth-wise growth
    pub grow_policy: GrowPolicy,
    /// Maximum depth of tree (non-positive for unlimited)
    pub max_depth: i32,
    /// Worker threads (0 uses the global rayon pool)
    pub num_threads: usize,
    /// Master seed; when set it derives every other seed
    pub seed: Option<u64>,

    // Regularization and split constraints
    /// Minimum number of rows in a leaf
    pub min_data_in_leaf: usize,
    /// Minimum sum of hessians in a leaf
    pub min_sum_hessian_in_leaf: f64,
    /// L1 regularization term
    pub lambda_l1: f64,
    /// L2 regularization term
    pub lambda_l2: f64,
    /// Minimum gain required to make a split
    pub min_gain_to_split: f64,
    /// Maximum absolute leaf output (non-positive disables the clamp)
    pub max_delta_step: f64,

    // Sampling parameters
    /// Fraction of features used per tree
    pub feature_fraction: f64,
    /// Seed of the feature sampler
    pub feature_fraction_seed: u64,
    /// Fraction of rows used per bagging round
    pub bagging_fraction: f64,
    /// Re-sample rows every `bagging_freq` rounds (0 disables bagging)
    pub bagging_freq: usize,
    /// Seed of the row sampler
    pub bagging_seed: u64,
    /// GOSS fraction of large-gradient rows kept
    pub top_rate: f64,
    /// GOSS fraction of small-gradient rows sampled
    pub other_rate: f64,

    // DART parameters
    /// Probability of dropping each previous tree
    pub drop_rate: f64,
    /// Maximum dropped trees per round (non-positive for unlimited)
    pub max_drop: i32,
    /// Probability of skipping the dropout in a round
    pub skip_drop: f64,
    /// Use XGBoost-style normalization of dropped trees
    pub xgboost_dart_mode: bool,
    /// Drop trees uniformly instead of by weight
    pub uniform_drop: bool,
    /// Seed of the dropout sampler
    pub drop_seed: u64,

    // Early stopping
    /// Patience in rounds (0 disables early stopping)
    pub early_stopping_round: usize,
    /// Only the first metric drives early stopping
    pub first_metric_only: bool,
    /// Minimum improvement that counts as progress
    pub early_stopping_min_delta: f64,

    // Dataset parameters
    /// Maximum number of bins per feature
    pub max_bin: usize,
    /// Minimum number of rows in one bin
    pub min_data_in_bin: usize,
    /// Rows sampled to construct bin boundaries
    pub bin_construct_sample_cnt: usize,
    /// Give NaN its own bin and learn its direction
    pub use_missing: bool,
    /// Column indices treated as categorical
    pub categorical_feature: Vec<usize>,

    // Categorical split parameters
    /// One-vs-rest search up to this many categories
    pub max_cat_to_onehot: usize,
    /// Maximum categories on the left side of a split
    pub max_cat_threshold: usize,
    /// Smoothing added to category hessians when sorting
    pub cat_smooth: f64,
    /// Extra L2 regularization for categorical splits
    pub cat_l2: f64,
    /// Minimum rows per category group
    pub min_data_per_group: usize,

    // Objective parameters
    /// Number of classes (multiclass only)
    pub num_class: usize,
    /// Reweight binary labels to balance classes
    pub is_unbalance: bool,
    /// Weight of positive binary labels
    pub scale_pos_weight: f64,
    /// Sigmoid scale for binary and LambdaRank
    pub sigmoid: f64,
    /// Start from the objective's optimal constant
    pub boost_from_average: bool,
    /// Huber delta and quantile level
    pub alpha: f64,
    /// Pairs considered per query for LambdaRank
    pub lambdarank_truncation_level: usize,
    /// Normalize LambdaRank gradients per query
    pub lambdarank_norm: bool,
    /// Gain of each relevance label
    pub label_gain: Vec<f64>,

    // Metric parameters
    /// Metrics to evaluate (empty means the objective's default)
    pub metric: Vec<MetricKind>,
    /// NDCG evaluation positions
    pub eval_at: Vec<usize>,
    /// `k` of the multiclass top-k error
    pub multi_error_top_k: usize,
    /// Report metrics on the training set
    pub is_provide_training_metric: bool,

    // Miscellaneous
    /// Log verbosity (<0 fatal, 0 warn, 1 info, >1 debug)
    pub verbosity: i32,
    /// Derive the larger sibling histogram by subtraction
    pub use_histogram_subtraction: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            objective: ObjectiveType::Regression,
            boosting: BoostingType::GBDT,
            data_sample_strategy: DataSampleStrategy::Bagging,
            num_iterations: DEFAULT_NUM_ITERATIONS,
            learning_rate: DEFAULT_LEARNING_RATE,
            num_leaves: DEFAULT_NUM_LEAVES,
            grow_policy: GrowPolicy::LeafWise,
            max_depth: DEFAULT_MAX_DEPTH,
            num_threads: 0,
            seed: None,

            min_data_in_leaf: DEFAULT_MIN_DATA_IN_LEAF,
            min_sum_hessian_in_leaf: DEFAULT_MIN_SUM_HESSIAN_IN_LEAF,
            lambda_l1: DEFAULT_LAMBDA_L1,
            lambda_l2: DEFAULT_LAMBDA_L2,
            min_gain_to_split: DEFAULT_MIN_GAIN_TO_SPLIT,
            max_delta_step: 0.0,

            feature_fraction: DEFAULT_FEATURE_FRACTION,
            feature_fraction_seed: DEFAULT_FEATURE_FRACTION_SEED,
            bagging_fraction: DEFAULT_BAGGING_FRACTION,
            bagging_freq: DEFAULT_BAGGING_FREQ,
            bagging_seed: DEFAULT_BAGGING_SEED,
            top_rate: DEFAULT_TOP_RATE,
            other_rate: DEFAULT_OTHER_RATE,

            drop_rate: DEFAULT_DROP_RATE,
            max_drop: DEFAULT_MAX_DROP,
            skip_drop: DEFAULT_SKIP_DROP,
            xgboost_dart_mode: false,
            uniform_drop: false,
            drop_seed: DEFAULT_DROP_SEED,

            early_stopping_round: 0,
            first_metric_only: false,
            early_stopping_min_delta: 0.0,

            max_bin: DEFAULT_MAX_BIN,
            min_data_in_bin: DEFAULT_MIN_DATA_IN_BIN,
            bin_construct_sample_cnt: DEFAULT_BIN_CONSTRUCT_SAMPLE_CNT,
            use_missing: true,
            categorical_feature: Vec::new(),

            max_cat_to_onehot: DEFAULT_MAX_CAT_TO_ONEHOT,
            max_cat_threshold: DEFAULT_MAX_CAT_THRESHOLD,
            cat_smooth: DEFAULT_CAT_SMOOTH,
            cat_l2: DEFAULT_CAT_L2,
            min_data_per_group: DEFAULT_MIN_DATA_PER_GROUP,

            num_class: 1,
            is_unbalance: false,
            scale_pos_weight: 1.0,
            sigmoid: DEFAULT_SIGMOID,
            boost_from_average: true,
            alpha: DEFAULT_ALPHA,
            lambdarank_truncation_level: DEFAULT_LAMBDARANK_TRUNCATION_LEVEL,
            lambdarank_norm: true,
            label_gain: default_label_gain(),

            metric: Vec::new(),
            eval_at: DEFAULT_EVAL_AT.to_vec(),
            multi_error_top_k: 1,
            is_provide_training_metric: false,

            verbosity: 1,
            use_histogram_subtraction: true,
        }
    }
}

/// Seeds of the random components of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomSeeds {
    pub bagging: u64,
    pub feature_fraction: u64,
    pub drop: u64,
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(LightGBMError::invalid_parameter(
                "learning_rate",
                self.learning_rate.to_string(),
                "must be a positive finite number",
            ));
        }

        if self.num_leaves < 2 || self.num_leaves > MAX_NUM_LEAVES {
            return Err(LightGBMError::invalid_parameter(
                "num_leaves",
                self.num_leaves.to_string(),
                format!("must be in range [2, {}]", MAX_NUM_LEAVES),
            ));
        }

        for (name, value) in [
            ("feature_fraction", self.feature_fraction),
            ("bagging_fraction", self.bagging_fraction),
        ] {
            if value <= 0.0 || value > 1.0 {
                return Err(LightGBMError::invalid_parameter(
                    name,
                    value.to_string(),
                    "must be in range (0.0, 1.0]",
                ));
            }
        }

        for (name, value) in [
            ("lambda_l1", self.lambda_l1),
            ("lambda_l2", self.lambda_l2),
            ("min_gain_to_split", self.min_gain_to_split),
            ("min_sum_hessian_in_leaf", self.min_sum_hessian_in_leaf),
            ("cat_smooth", self.cat_smooth),
            ("cat_l2", self.cat_l2),
            ("early_stopping_min_delta", self.early_stopping_min_delta),
        ] {
            if value < 0.0 || value.is_nan() {
                return Err(LightGBMError::invalid_parameter(
                    name,
                    value.to_string(),
                    "must be non-negative",
                ));
            }
        }

        for (name, value) in [
            ("top_rate", self.top_rate),
            ("other_rate", self.other_rate),
            ("drop_rate", self.drop_rate),
            ("skip_drop", self.skip_drop),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(LightGBMError::invalid_parameter(
                    name,
                    value.to_string(),
                    "must be in range [0.0, 1.0]",
                ));
            }
        }

        crate::ensure!(
            self.top_rate + self.other_rate <= 1.0,
            crate::config_error!(
                "top_rate + other_rate must not exceed 1.0, got {} + {}",
                self.top_rate,
                self.other_rate
            )
        );

        if self.max_bin < 2 {
            return Err(LightGBMError::invalid_parameter(
                "max_bin",
                self.max_bin.to_string(),
                "must be at least 2",
            ));
        }

        if self.min_data_in_bin == 0 {
            return Err(LightGBMError::invalid_parameter(
                "min_data_in_bin",
                "0",
                "must be at least 1",
            ));
        }

        crate::ensure!(
            self.max_cat_threshold > 0,
            LightGBMError::invalid_parameter("max_cat_threshold", "0", "must be at least 1")
        );

        if self.sigmoid <= 0.0 {
            return Err(LightGBMError::invalid_parameter(
                "sigmoid",
                self.sigmoid.to_string(),
                "must be positive",
            ));
        }

        if self.scale_pos_weight <= 0.0 {
            return Err(LightGBMError::invalid_parameter(
                "scale_pos_weight",
                self.scale_pos_weight.to_string(),
                "must be positive",
            ));
        }

        if self.objective == ObjectiveType::Multiclass {
            if self.num_class < 2 {
                return Err(LightGBMError::invalid_parameter(
                    "num_class",
                    self.num_class.to_string(),
                    "multiclass objective requires at least 2 classes",
                ));
            }
        } else if self.num_class != 1 && self.objective != ObjectiveType::Custom {
            return Err(LightGBMError::invalid_parameter(
                "num_class",
                self.num_class.to_string(),
                format!("must be 1 for objective {}", self.objective),
            ));
        }
        if self.num_class == 0 {
            return Err(LightGBMError::invalid_parameter(
                "num_class",
                "0",
                "must be at least 1",
            ));
        }

        crate::ensure!(
            !(self.is_unbalance && self.scale_pos_weight != 1.0),
            crate::config_error!("Cannot set is_unbalance and scale_pos_weight at the same time")
        );

        if matches!(self.objective, ObjectiveType::Quantile)
            && !(self.alpha > 0.0 && self.alpha < 1.0)
        {
            return Err(LightGBMError::invalid_parameter(
                "alpha",
                self.alpha.to_string(),
                "quantile level must be in range (0.0, 1.0)",
            ));
        }
        if matches!(self.objective, ObjectiveType::Huber) && self.alpha <= 0.0 {
            return Err(LightGBMError::invalid_parameter(
                "alpha",
                self.alpha.to_string(),
                "huber delta must be positive",
            ));
        }

        if self.eval_at.iter().any(|&k| k == 0) {
            return Err(LightGBMError::invalid_parameter(
                "eval_at",
                format!("{:?}", self.eval_at),
                "positions must be positive",
            ));
        }

        if self.multi_error_top_k == 0 {
            return Err(LightGBMError::invalid_parameter(
                "multi_error_top_k",
                "0",
                "must be at least 1",
            ));
        }

        if self.label_gain.iter().any(|g| !g.is_finite()) {
            return Err(LightGBMError::invalid_parameter(
                "label_gain",
                format!("{:?}", self.label_gain),
                "gains must be finite",
            ));
        }

        if self.boosting == BoostingType::RandomForest {
            let bagging = self.bagging_freq > 0 && self.bagging_fraction < 1.0;
            if !bagging && self.feature_fraction >= 1.0 {
                return Err(LightGBMError::config(
                    "Random forest requires bagging (bagging_freq > 0 and bagging_fraction < 1) \
                     or feature_fraction < 1",
                ));
            }
            if self.data_sample_strategy == DataSampleStrategy::Goss {
                return Err(LightGBMError::config(
                    "Random forest cannot be combined with GOSS sampling",
                ));
            }
        }

        Ok(())
    }

    /// Load configuration from a `.json` or `.toml` file.
    ///
    /// Keys may use any alias known to [`crate::config::alias`].
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let params = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => {
                let value: serde_json::Value = serde_json::from_str(&content)?;
                json_to_params(&value)?
            }
            Some("toml") => {
                let table: toml::Table = toml::from_str(&content)?;
                toml_to_params(&table)
            }
            _ => {
                return Err(LightGBMError::config(
                    "Unsupported config file format. Use .json or .toml",
                ))
            }
        };

        ConfigBuilder::new().params(params).build()
    }

    /// Save configuration to a `.json` or `.toml` file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string_pretty(self).map_err(|e| {
                LightGBMError::config(format!("Failed to serialize to TOML: {}", e))
            })?,
            _ => {
                return Err(LightGBMError::config(
                    "Unsupported config file format. Use .json or .toml",
                ))
            }
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Parse LightGBM `key=value` configuration text.
    ///
    /// Blank lines and `#` comments are skipped.
    pub fn from_conf_str(text: &str) -> Result<Self> {
        let mut params = Vec::new();
        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(LightGBMError::config(format!(
                    "Line {} is not of the form key=value: '{}'",
                    line_no + 1,
                    raw.trim()
                )));
            };
            params.push((key.trim().to_string(), value.trim().to_string()));
        }
        ConfigBuilder::new().params(params).build()
    }

    /// Build a configuration from a string parameter map.
    pub fn from_params<K, V>(params: &HashMap<K, V>) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        ConfigBuilder::new()
            .params(params.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))
            .build()
    }

    /// Set one canonical parameter from its string form
    pub fn set_param(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "objective" => self.objective = value.parse()?,
            "boosting" => {
                self.boosting = value.parse()?;
                if value.eq_ignore_ascii_case("goss") {
                    self.data_sample_strategy = DataSampleStrategy::Goss;
                }
            }
            "data_sample_strategy" => self.data_sample_strategy = value.parse()?,
            "num_iterations" => self.num_iterations = parse_num(key, value)?,
            "learning_rate" => self.learning_rate = parse_num(key, value)?,
            "num_leaves" => self.num_leaves = parse_num(key, value)?,
            "grow_policy" => self.grow_policy = value.parse()?,
            "max_depth" => self.max_depth = parse_num(key, value)?,
            "num_threads" => self.num_threads = parse_threads(value)?,
            "seed" => self.seed = Some(parse_num(key, value)?),
            "min_data_in_leaf" => self.min_data_in_leaf = parse_num(key, value)?,
            "min_sum_hessian_in_leaf" => self.min_sum_hessian_in_leaf = parse_num(key, value)?,
            "lambda_l1" => self.lambda_l1 = parse_num(key, value)?,
            "lambda_l2" => self.lambda_l2 = parse_num(key, value)?,
            "min_gain_to_split" => self.min_gain_to_split = parse_num(key, value)?,
            "max_delta_step" => self.max_delta_step = parse_num(key, value)?,
            "feature_fraction" => self.feature_fraction = parse_num(key, value)?,
            "feature_fraction_seed" => self.feature_fraction_seed = parse_num(key, value)?,
            "bagging_fraction" => self.bagging_fraction = parse_num(key, value)?,
            "bagging_freq" => self.bagging_freq = parse_num(key, value)?,
            "bagging_seed" => self.bagging_seed = parse_num(key, value)?,
            "top_rate" => self.top_rate = parse_num(key, value)?,
            "other_rate" => self.other_rate = parse_num(key, value)?,
            "drop_rate" => self.drop_rate = parse_num(key, value)?,
            "max_drop" => self.max_drop = parse_num(key, value)?,
            "skip_drop" => self.skip_drop = parse_num(key, value)?,
            "xgboost_dart_mode" => self.xgboost_dart_mode = parse_bool(key, value)?,
            "uniform_drop" => self.uniform_drop = parse_bool(key, value)?,
            "drop_seed" => self.drop_seed = parse_num(key, value)?,
            "early_stopping_round" => self.early_stopping_round = parse_num(key, value)?,
            "first_metric_only" => self.first_metric_only = parse_bool(key, value)?,
            "early_stopping_min_delta" => self.early_stopping_min_delta = parse_num(key, value)?,
            "max_bin" => self.max_bin = parse_num(key, value)?,
            "min_data_in_bin" => self.min_data_in_bin = parse_num(key, value)?,
            "bin_construct_sample_cnt" => self.bin_construct_sample_cnt = parse_num(key, value)?,
            "use_missing" => self.use_missing = parse_bool(key, value)?,
            "categorical_feature" => self.categorical_feature = parse_list(key, value)?,
            "max_cat_to_onehot" => self.max_cat_to_onehot = parse_num(key, value)?,
            "max_cat_threshold" => self.max_cat_threshold = parse_num(key, value)?,
            "cat_smooth" => self.cat_smooth = parse_num(key, value)?,
            "cat_l2" => self.cat_l2 = parse_num(key, value)?,
            "min_data_per_group" => self.min_data_per_group = parse_num(key, value)?,
            "num_class" => self.num_class = parse_num(key, value)?,
            "is_unbalance" => self.is_unbalance = parse_bool(key, value)?,
            "scale_pos_weight" => self.scale_pos_weight = parse_num(key, value)?,
            "sigmoid" => self.sigmoid = parse_num(key, value)?,
            "boost_from_average" => self.boost_from_average = parse_bool(key, value)?,
            "alpha" => self.alpha = parse_num(key, value)?,
            "lambdarank_truncation_level" => {
                self.lambdarank_truncation_level = parse_num(key, value)?
            }
            "lambdarank_norm" => self.lambdarank_norm = parse_bool(key, value)?,
            "label_gain" => self.label_gain = parse_list(key, value)?,
            "metric" => self.metric = alias::parse_metric_list(value)?,
            "eval_at" => self.eval_at = parse_list(key, value)?,
            "multi_error_top_k" => self.multi_error_top_k = parse_num(key, value)?,
            "is_provide_training_metric" => {
                self.is_provide_training_metric = parse_bool(key, value)?
            }
            "verbosity" => self.verbosity = parse_num(key, value)?,
            "use_histogram_subtraction" => {
                self.use_histogram_subtraction = parse_bool(key, value)?
            }
            other => {
                return Err(LightGBMError::invalid_parameter(
                    other,
                    value,
                    "unknown parameter",
                ))
            }
        }
        Ok(())
    }

    /// Number of trees grown per boosting round
    pub fn num_tree_per_iteration(&self) -> usize {
        match self.objective {
            ObjectiveType::Multiclass => self.num_class,
            ObjectiveType::Custom => self.num_class.max(1),
            _ => 1,
        }
    }

    /// Check if early stopping is enabled
    pub fn is_early_stopping_enabled(&self) -> bool {
        self.early_stopping_round > 0
    }

    /// Check if bagging is active
    pub fn is_bagging_enabled(&self) -> bool {
        self.data_sample_strategy == DataSampleStrategy::Bagging
            && self.bagging_freq > 0
            && self.bagging_fraction < 1.0
    }

    /// Metrics evaluated for this configuration.
    ///
    /// An empty list selects the objective's default metric, a list holding
    /// `none` disables built-in metrics.
    pub fn resolved_metrics(&self) -> Vec<MetricKind> {
        if self.metric.contains(&MetricKind::None) {
            return Vec::new();
        }
        if self.metric.is_empty() {
            return match self.objective.default_metric() {
                MetricKind::None => Vec::new(),
                kind => vec![kind],
            };
        }
        let mut metrics = Vec::with_capacity(self.metric.len());
        for &kind in &self.metric {
            if !metrics.contains(&kind) {
                metrics.push(kind);
            }
        }
        metrics
    }

    /// Seeds used by bagging, feature sampling and DART.
    ///
    /// A master `seed` derives all three deterministically.
    pub fn random_seeds(&self) -> RandomSeeds {
        match self.seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                RandomSeeds {
                    bagging: rng.gen(),
                    feature_fraction: rng.gen(),
                    drop: rng.gen(),
                }
            }
            None => RandomSeeds {
                bagging: self.bagging_seed,
                feature_fraction: self.feature_fraction_seed,
                drop: self.drop_seed,
            },
        }
    }

    /// Effective worker thread count
    pub fn effective_num_threads(&self) -> usize {
        if self.num_threads == 0 {
            num_cpus::get()
        } else {
            self.num_threads
        }
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse::<T>().map_err(|_| {
        LightGBMError::invalid_parameter(key, value, "cannot parse numeric value")
    })
}

fn parse_threads(value: &str) -> Result<usize> {
    // LightGBM accepts negative thread counts as "use the default"
    let threads: i64 = parse_num("num_threads", value)?;
    Ok(threads.max(0) as usize)
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "+" | "yes" => Ok(true),
        "false" | "0" | "-" | "no" => Ok(false),
        _ => Err(LightGBMError::invalid_parameter(
            key,
            value,
            "expected a boolean",
        )),
    }
}

fn parse_list<T: std::str::FromStr>(key: &str, value: &str) -> Result<Vec<T>> {
    value
        .trim_matches(|c| c == '[' || c == ']')
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|item| parse_num(key, item))
        .collect()
}

fn json_to_params(value: &serde_json::Value) -> Result<Vec<(String, String)>> {
    let object = value
        .as_object()
        .ok_or_else(|| LightGBMError::config("JSON config must be an object"))?;
    let mut params = Vec::with_capacity(object.len());
    for (key, value) in object {
        let text = match value {
            serde_json::Value::Null => continue,
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            other => other.to_string(),
        };
        params.push((key.clone(), text));
    }
    Ok(params)
}

fn toml_to_params(table: &toml::Table) -> Vec<(String, String)> {
    table
        .iter()
        .map(|(key, value)| {
            let text = match value {
                toml::Value::String(s) => s.clone(),
                toml::Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        toml::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(","),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect()
}

/// Configuration builder for fluent configuration creation.
///
/// Explicit setters take precedence over entries supplied through
/// [`ConfigBuilder::params`], regardless of call order.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
    explicit: HashSet<&'static str>,
    params: Vec<(String, String)>,
    validation_errors: Vec<String>,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
            explicit: HashSet::new(),
            params: Vec::new(),
            validation_errors: Vec::new(),
        }
    }

    fn mark(mut self, key: &'static str) -> Self {
        self.explicit.insert(key);
        self
    }

    /// Add entries of a string parameter map (aliases allowed)
    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.params.extend(
            params
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string())),
        );
        self
    }

    /// Add one string parameter (aliases allowed)
    pub fn param<K: AsRef<str>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.as_ref().to_string(), value.to_string()));
        self
    }

    /// Set the objective function
    pub fn objective(mut self, objective: ObjectiveType) -> Self {
        self.config.objective = objective;
        self.mark("objective")
    }

    /// Set the boosting algorithm
    pub fn boosting_type(mut self, boosting: BoostingType) -> Self {
        self.config.boosting = boosting;
        self.mark("boosting")
    }

    /// Set the row sampling strategy
    pub fn data_sample_strategy(mut self, strategy: DataSampleStrategy) -> Self {
        self.config.data_sample_strategy = strategy;
        self.mark("data_sample_strategy")
    }

    /// Set the number of boosting iterations
    pub fn num_iterations(mut self, iterations: usize) -> Self {
        self.config.num_iterations = iterations;
        self.mark("num_iterations")
    }

    /// Set the learning rate
    pub fn learning_rate(mut self, rate: f64) -> Self {
        if rate <= 0.0 {
            self.validation_errors
                .push("learning_rate must be positive".to_string());
        }
        self.config.learning_rate = rate;
        self.mark("learning_rate")
    }

    /// Set the number of leaves
    pub fn num_leaves(mut self, leaves: usize) -> Self {
        if leaves < 2 {
            self.validation_errors
                .push("num_leaves must be at least 2".to_string());
        }
        self.config.num_leaves = leaves;
        self.mark("num_leaves")
    }

    /// Set the tree growth policy
    pub fn grow_policy(mut self, policy: GrowPolicy) -> Self {
        self.config.grow_policy = policy;
        self.mark("grow_policy")
    }

    /// Set the maximum tree depth
    pub fn max_depth(mut self, depth: i32) -> Self {
        self.config.max_depth = depth;
        self.mark("max_depth")
    }

    /// Set the minimum number of rows per leaf
    pub fn min_data_in_leaf(mut self, min_data: usize) -> Self {
        self.config.min_data_in_leaf = min_data;
        self.mark("min_data_in_leaf")
    }

    /// Set the minimum hessian sum per leaf
    pub fn min_sum_hessian_in_leaf(mut self, min_hessian: f64) -> Self {
        self.config.min_sum_hessian_in_leaf = min_hessian;
        self.mark("min_sum_hessian_in_leaf")
    }

    /// Set L1 regularization
    pub fn lambda_l1(mut self, lambda: f64) -> Self {
        if lambda < 0.0 {
            self.validation_errors
                .push("lambda_l1 must be non-negative".to_string());
        }
        self.config.lambda_l1 = lambda;
        self.mark("lambda_l1")
    }

    /// Set L2 regularization
    pub fn lambda_l2(mut self, lambda: f64) -> Self {
        if lambda < 0.0 {
            self.validation_errors
                .push("lambda_l2 must be non-negative".to_string());
        }
        self.config.lambda_l2 = lambda;
        self.mark("lambda_l2")
    }

    /// Set the minimum split gain
    pub fn min_gain_to_split(mut self, gain: f64) -> Self {
        self.config.min_gain_to_split = gain;
        self.mark("min_gain_to_split")
    }

    /// Set the leaf output clamp
    pub fn max_delta_step(mut self, step: f64) -> Self {
        self.config.max_delta_step = step;
        self.mark("max_delta_step")
    }

    /// Set the number of worker threads
    pub fn num_threads(mut self, threads: usize) -> Self {
        self.config.num_threads = threads;
        self.mark("num_threads")
    }

    /// Set the master seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self.mark("seed")
    }

    /// Set the feature fraction
    pub fn feature_fraction(mut self, fraction: f64) -> Self {
        if fraction <= 0.0 || fraction > 1.0 {
            self.validation_errors
                .push("feature_fraction must be in range (0.0, 1.0]".to_string());
        }
        self.config.feature_fraction = fraction;
        self.mark("feature_fraction")
    }

    /// Set the bagging fraction
    pub fn bagging_fraction(mut self, fraction: f64) -> Self {
        if fraction <= 0.0 || fraction > 1.0 {
            self.validation_errors
                .push("bagging_fraction must be in range (0.0, 1.0]".to_string());
        }
        self.config.bagging_fraction = fraction;
        self.mark("bagging_fraction")
    }

    /// Set the bagging frequency
    pub fn bagging_freq(mut self, freq: usize) -> Self {
        self.config.bagging_freq = freq;
        self.mark("bagging_freq")
    }

    /// Set the bagging seed
    pub fn bagging_seed(mut self, seed: u64) -> Self {
        self.config.bagging_seed = seed;
        self.mark("bagging_seed")
    }

    /// Set the GOSS top rate
    pub fn top_rate(mut self, rate: f64) -> Self {
        self.config.top_rate = rate;
        self.mark("top_rate")
    }

    /// Set the GOSS other rate
    pub fn other_rate(mut self, rate: f64) -> Self {
        self.config.other_rate = rate;
        self.mark("other_rate")
    }

    /// Set the DART drop rate
    pub fn drop_rate(mut self, rate: f64) -> Self {
        self.config.drop_rate = rate;
        self.mark("drop_rate")
    }

    /// Set the DART skip probability
    pub fn skip_drop(mut self, rate: f64) -> Self {
        self.config.skip_drop = rate;
        self.mark("skip_drop")
    }

    /// Set the DART maximum number of dropped trees
    pub fn max_drop(mut self, max_drop: i32) -> Self {
        self.config.max_drop = max_drop;
        self.mark("max_drop")
    }

    /// Set the early stopping patience
    pub fn early_stopping_round(mut self, rounds: usize) -> Self {
        self.config.early_stopping_round = rounds;
        self.mark("early_stopping_round")
    }

    /// Only the first metric drives early stopping
    pub fn first_metric_only(mut self, enabled: bool) -> Self {
        self.config.first_metric_only = enabled;
        self.mark("first_metric_only")
    }

    /// Set the minimum improvement for early stopping
    pub fn early_stopping_min_delta(mut self, delta: f64) -> Self {
        self.config.early_stopping_min_delta = delta;
        self.mark("early_stopping_min_delta")
    }

    /// Set the maximum number of bins
    pub fn max_bin(mut self, max_bin: usize) -> Self {
        if max_bin < 2 {
            self.validation_errors
                .push("max_bin must be at least 2".to_string());
        }
        self.config.max_bin = max_bin;
        self.mark("max_bin")
    }

    /// Set the minimum number of rows per bin
    pub fn min_data_in_bin(mut self, min_data: usize) -> Self {
        self.config.min_data_in_bin = min_data;
        self.mark("min_data_in_bin")
    }

    /// Enable or disable the dedicated missing-value bin
    pub fn use_missing(mut self, enabled: bool) -> Self {
        self.config.use_missing = enabled;
        self.mark("use_missing")
    }

    /// Set the categorical column indices
    pub fn categorical_feature(mut self, columns: Vec<usize>) -> Self {
        self.config.categorical_feature = columns;
        self.mark("categorical_feature")
    }

    /// Set the one-vs-rest category limit
    pub fn max_cat_to_onehot(mut self, limit: usize) -> Self {
        self.config.max_cat_to_onehot = limit;
        self.mark("max_cat_to_onehot")
    }

    /// Set the minimum rows per category group
    pub fn min_data_per_group(mut self, min_data: usize) -> Self {
        self.config.min_data_per_group = min_data;
        self.mark("min_data_per_group")
    }

    /// Set categorical smoothing
    pub fn cat_smooth(mut self, smooth: f64) -> Self {
        self.config.cat_smooth = smooth;
        self.mark("cat_smooth")
    }

    /// Set categorical L2 regularization
    pub fn cat_l2(mut self, lambda: f64) -> Self {
        self.config.cat_l2 = lambda;
        self.mark("cat_l2")
    }

    /// Set the number of classes
    pub fn num_class(mut self, num_class: usize) -> Self {
        if num_class == 0 {
            self.validation_errors
                .push("num_class must be at least 1".to_string());
        }
        self.config.num_class = num_class;
        self.mark("num_class")
    }

    /// Balance binary classes by label weights
    pub fn is_unbalance(mut self, enabled: bool) -> Self {
        self.config.is_unbalance = enabled;
        self.mark("is_unbalance")
    }

    /// Set the positive class weight
    pub fn scale_pos_weight(mut self, weight: f64) -> Self {
        self.config.scale_pos_weight = weight;
        self.mark("scale_pos_weight")
    }

    /// Set the sigmoid scale
    pub fn sigmoid(mut self, sigmoid: f64) -> Self {
        self.config.sigmoid = sigmoid;
        self.mark("sigmoid")
    }

    /// Start boosting from the objective's optimal constant
    pub fn boost_from_average(mut self, enabled: bool) -> Self {
        self.config.boost_from_average = enabled;
        self.mark("boost_from_average")
    }

    /// Set the Huber delta or quantile level
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.config.alpha = alpha;
        self.mark("alpha")
    }

    /// Set the relevance label gains
    pub fn label_gain(mut self, gains: Vec<f64>) -> Self {
        self.config.label_gain = gains;
        self.mark("label_gain")
    }

    /// Set the metrics to evaluate
    pub fn metric(mut self, metrics: Vec<MetricKind>) -> Self {
        self.config.metric = metrics;
        self.mark("metric")
    }

    /// Set the NDCG evaluation positions
    pub fn eval_at(mut self, positions: Vec<usize>) -> Self {
        self.config.eval_at = positions;
        self.mark("eval_at")
    }

    /// Report metrics on the training set
    pub fn is_provide_training_metric(mut self, enabled: bool) -> Self {
        self.config.is_provide_training_metric = enabled;
        self.mark("is_provide_training_metric")
    }

    /// Set the log verbosity
    pub fn verbosity(mut self, verbosity: i32) -> Self {
        self.config.verbosity = verbosity;
        self.mark("verbosity")
    }

    /// Enable or disable histogram subtraction
    pub fn use_histogram_subtraction(mut self, enabled: bool) -> Self {
        self.config.use_histogram_subtraction = enabled;
        self.mark("use_histogram_subtraction")
    }

    /// Build the configuration
    pub fn build(self) -> Result<Config> {
        if !self.validation_errors.is_empty() {
            return Err(LightGBMError::config(format!(
                "Configuration validation failed: {}",
                self.validation_errors.join(", ")
            )));
        }

        let mut config = self.config;
        let resolved: BTreeMap<&'static str, String> = alias::resolve_params(self.params);

        // `boosting=goss` sets the strategy too, so apply it before an
        // explicit data_sample_strategy entry can override it
        if let Some(value) = resolved.get("boosting") {
            if !self.explicit.contains("boosting") {
                config.set_param("boosting", value)?;
            }
        }
        for (key, value) in &resolved {
            if *key == "boosting" {
                continue;
            }
            if self.explicit.contains(key) {
                log::warn!(
                    "Parameter {}={} ignored, an explicit value was given",
                    key,
                    value
                );
                continue;
            }
            config.set_param(key, value)?;
        }

        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
