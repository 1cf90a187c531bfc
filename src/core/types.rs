//! Core data types for the training engine.
//!
//! Scalar aliases mirror the storage choices of the boosting loop: raw
//! scores are accumulated in `f64`, per-sample gradients are stored in `f32`
//! and histogram sums are accumulated in `f64`.

use crate::core::error::{LightGBMError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Row index type used by partitions and sample sets.
pub type DataSize = u32;

/// Raw prediction (margin) type.
pub type Score = f64;

/// Per-sample gradient and Hessian storage type.
pub type Grad = f32;

/// Target value and sample weight type.
pub type Label = f32;

/// Histogram accumulation type.
pub type Hist = f64;

/// Feature index type for identifying features in the dataset.
pub type FeatureIndex = usize;

/// Bin index type for discretized feature values.
pub type BinIndex = u32;

/// Index of a node inside a tree's node arena.
pub type NodeIndex = usize;

/// Stable leaf identifier inside a tree.
pub type LeafIndex = usize;

/// Objective function kinds.
///
/// `Custom` marks a configuration whose gradients come from a user callable
/// supplied next to the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveType {
    /// Squared loss regression
    Regression,
    /// Absolute loss regression
    RegressionL1,
    /// Huber loss regression
    Huber,
    /// Quantile (pinball) loss regression
    Quantile,
    /// Mean absolute percentage error regression
    Mape,
    /// Logistic binary classification
    Binary,
    /// Softmax multiclass classification
    Multiclass,
    /// LambdaRank learning to rank
    #[serde(rename = "lambdarank")]
    LambdaRank,
    /// User supplied objective
    Custom,
}

impl Default for ObjectiveType {
    fn default() -> Self {
        ObjectiveType::Regression
    }
}

impl ObjectiveType {
    /// Canonical configuration name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectiveType::Regression => "regression",
            ObjectiveType::RegressionL1 => "regression_l1",
            ObjectiveType::Huber => "huber",
            ObjectiveType::Quantile => "quantile",
            ObjectiveType::Mape => "mape",
            ObjectiveType::Binary => "binary",
            ObjectiveType::Multiclass => "multiclass",
            ObjectiveType::LambdaRank => "lambdarank",
            ObjectiveType::Custom => "custom",
        }
    }

    /// Whether the objective is one of the regression losses.
    pub fn is_regression(&self) -> bool {
        matches!(
            self,
            ObjectiveType::Regression
                | ObjectiveType::RegressionL1
                | ObjectiveType::Huber
                | ObjectiveType::Quantile
                | ObjectiveType::Mape
        )
    }

    /// Metrics evaluated when the configuration names none.
    pub fn default_metric(&self) -> MetricKind {
        match self {
            ObjectiveType::Regression => MetricKind::L2,
            ObjectiveType::RegressionL1 => MetricKind::L1,
            ObjectiveType::Huber => MetricKind::Huber,
            ObjectiveType::Quantile => MetricKind::Quantile,
            ObjectiveType::Mape => MetricKind::Mape,
            ObjectiveType::Binary => MetricKind::BinaryLogloss,
            ObjectiveType::Multiclass => MetricKind::MultiLogloss,
            ObjectiveType::LambdaRank => MetricKind::Ndcg,
            ObjectiveType::Custom => MetricKind::None,
        }
    }
}

impl fmt::Display for ObjectiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectiveType {
    type Err = LightGBMError;

    fn from_str(s: &str) -> Result<Self> {
        crate::config::alias::resolve_objective(s)
    }
}

/// Boosting strategy types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoostingType {
    /// Gradient Boosting Decision Tree
    #[serde(rename = "gbdt")]
    GBDT,
    /// Dropouts meet Multiple Additive Regression Trees
    #[serde(rename = "dart")]
    DART,
    /// Random Forest
    #[serde(rename = "rf")]
    RandomForest,
}

impl Default for BoostingType {
    fn default() -> Self {
        BoostingType::GBDT
    }
}

impl fmt::Display for BoostingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoostingType::GBDT => write!(f, "gbdt"),
            BoostingType::DART => write!(f, "dart"),
            BoostingType::RandomForest => write!(f, "rf"),
        }
    }
}

impl FromStr for BoostingType {
    type Err = LightGBMError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gbdt" | "gbrt" | "goss" => Ok(BoostingType::GBDT),
            "dart" => Ok(BoostingType::DART),
            "rf" | "random_forest" => Ok(BoostingType::RandomForest),
            other => Err(LightGBMError::invalid_parameter(
                "boosting",
                other,
                "expected one of gbdt, dart, rf, goss",
            )),
        }
    }
}

/// Per-round row sampling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSampleStrategy {
    /// Uniform row bagging driven by `bagging_fraction`/`bagging_freq`
    Bagging,
    /// Gradient-based one-side sampling
    Goss,
}

impl Default for DataSampleStrategy {
    fn default() -> Self {
        DataSampleStrategy::Bagging
    }
}

impl fmt::Display for DataSampleStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSampleStrategy::Bagging => write!(f, "bagging"),
            DataSampleStrategy::Goss => write!(f, "goss"),
        }
    }
}

impl FromStr for DataSampleStrategy {
    type Err = LightGBMError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bagging" => Ok(DataSampleStrategy::Bagging),
            "goss" => Ok(DataSampleStrategy::Goss),
            other => Err(LightGBMError::invalid_parameter(
                "data_sample_strategy",
                other,
                "expected bagging or goss",
            )),
        }
    }
}

/// Tree growth policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowPolicy {
    /// Always split the leaf with the globally best gain
    #[serde(rename = "leafwise")]
    LeafWise,
    /// Split every leaf of the current depth before descending
    #[serde(rename = "depthwise")]
    DepthWise,
}

impl Default for GrowPolicy {
    fn default() -> Self {
        GrowPolicy::LeafWise
    }
}

impl fmt::Display for GrowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrowPolicy::LeafWise => write!(f, "leafwise"),
            GrowPolicy::DepthWise => write!(f, "depthwise"),
        }
    }
}

impl FromStr for GrowPolicy {
    type Err = LightGBMError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "leafwise" | "leaf_wise" | "leaf" | "lossguide" => Ok(GrowPolicy::LeafWise),
            "depthwise" | "depth_wise" | "depth" | "levelwise" | "level_wise" | "level" => {
                Ok(GrowPolicy::DepthWise)
            }
            other => Err(LightGBMError::invalid_parameter(
                "grow_policy",
                other,
                "expected leafwise or depthwise",
            )),
        }
    }
}

/// Built-in evaluation metric kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Disables metric evaluation
    None,
    /// Mean squared error
    L2,
    /// Root mean squared error
    Rmse,
    /// Mean absolute error
    L1,
    /// Huber loss
    Huber,
    /// Quantile loss
    Quantile,
    /// Mean absolute percentage error
    Mape,
    /// Binary log loss
    BinaryLogloss,
    /// Binary classification error rate
    BinaryError,
    /// Area under the ROC curve
    Auc,
    /// Multiclass log loss
    MultiLogloss,
    /// Multiclass error rate
    MultiError,
    /// Normalized discounted cumulative gain at each `eval_at` position
    Ndcg,
}

impl MetricKind {
    /// Canonical metric name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::None => "none",
            MetricKind::L2 => "l2",
            MetricKind::Rmse => "rmse",
            MetricKind::L1 => "l1",
            MetricKind::Huber => "huber",
            MetricKind::Quantile => "quantile",
            MetricKind::Mape => "mape",
            MetricKind::BinaryLogloss => "binary_logloss",
            MetricKind::BinaryError => "binary_error",
            MetricKind::Auc => "auc",
            MetricKind::MultiLogloss => "multi_logloss",
            MetricKind::MultiError => "multi_error",
            MetricKind::Ndcg => "ndcg",
        }
    }

    /// Whether larger values are better.
    pub fn higher_better(&self) -> bool {
        matches!(self, MetricKind::Auc | MetricKind::Ndcg)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = LightGBMError;

    fn from_str(s: &str) -> Result<Self> {
        crate::config::alias::resolve_metric(s)
    }
}

/// Feature importance types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportanceType {
    /// Number of times a feature is used to split
    Split,
    /// Total gain of the splits using a feature
    Gain,
}

impl Default for ImportanceType {
    fn default() -> Self {
        ImportanceType::Split
    }
}

impl FromStr for ImportanceType {
    type Err = LightGBMError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "split" => Ok(ImportanceType::Split),
            "gain" => Ok(ImportanceType::Gain),
            other => Err(LightGBMError::invalid_parameter(
                "importance_type",
                other,
                "expected split or gain",
            )),
        }
    }
}

/// Feature kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureType {
    /// Ordered numeric feature split by threshold
    Numerical,
    /// Unordered integer categories split by set membership
    Categorical,
}

impl Default for FeatureType {
    fn default() -> Self {
        FeatureType::Numerical
    }
}

/// How missing values of a feature are represented in its bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingType {
    /// No missing values seen at binning time; NaN is treated as zero
    None,
    /// NaN values own the last bin and follow the learned default direction
    NaN,
}

impl Default for MissingType {
    fn default() -> Self {
        MissingType::None
    }
}

/// Log verbosity, mapped from LightGBM's integer `verbosity` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only fatal errors (`verbosity < 0`)
    Fatal,
    /// Warnings (`verbosity == 0`)
    Warning,
    /// Informational messages (`verbosity == 1`)
    Info,
    /// Debug messages (`verbosity > 1`)
    Debug,
}

impl VerbosityLevel {
    /// Map the integer parameter onto a level.
    pub fn from_verbosity(verbosity: i32) -> Self {
        match verbosity {
            v if v < 0 => VerbosityLevel::Fatal,
            0 => VerbosityLevel::Warning,
            1 => VerbosityLevel::Info,
            _ => VerbosityLevel::Debug,
        }
    }

    /// Corresponding `log` level filter.
    pub fn level_filter(&self) -> log::LevelFilter {
        match self {
            VerbosityLevel::Fatal => log::LevelFilter::Error,
            VerbosityLevel::Warning => log::LevelFilter::Warn,
            VerbosityLevel::Info => log::LevelFilter::Info,
            VerbosityLevel::Debug => log::LevelFilter::Debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objective_names_and_defaults() {
        assert_eq!(ObjectiveType::default(), ObjectiveType::Regression);
        assert_eq!(ObjectiveType::LambdaRank.to_string(), "lambdarank");
        assert_eq!(ObjectiveType::Binary.default_metric(), MetricKind::BinaryLogloss);
        assert_eq!(ObjectiveType::RegressionL1.default_metric(), MetricKind::L1);
        assert!(ObjectiveType::Quantile.is_regression());
        assert!(!ObjectiveType::Multiclass.is_regression());
    }

    #[test]
    fn test_boosting_type_parsing() {
        assert_eq!("gbdt".parse::<BoostingType>().unwrap(), BoostingType::GBDT);
        assert_eq!("RF".parse::<BoostingType>().unwrap(), BoostingType::RandomForest);
        assert_eq!("dart".parse::<BoostingType>().unwrap(), BoostingType::DART);
        assert!("xgb".parse::<BoostingType>().is_err());
    }

    #[test]
    fn test_grow_policy_aliases() {
        assert_eq!("lossguide".parse::<GrowPolicy>().unwrap(), GrowPolicy::LeafWise);
        assert_eq!("levelwise".parse::<GrowPolicy>().unwrap(), GrowPolicy::DepthWise);
    }

    #[test]
    fn test_metric_direction() {
        assert!(MetricKind::Auc.higher_better());
        assert!(MetricKind::Ndcg.higher_better());
        assert!(!MetricKind::L2.higher_better());
        assert!(!MetricKind::MultiError.higher_better());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&ObjectiveType::RegressionL1).unwrap();
        assert_eq!(json, "\"regression_l1\"");
        let json = serde_json::to_string(&BoostingType::RandomForest).unwrap();
        assert_eq!(json, "\"rf\"");
        let kind: MetricKind = serde_json::from_str("\"binary_logloss\"").unwrap();
        assert_eq!(kind, MetricKind::BinaryLogloss);
    }

    #[test]
    fn test_verbosity_mapping() {
        assert_eq!(VerbosityLevel::from_verbosity(-1), VerbosityLevel::Fatal);
        assert_eq!(VerbosityLevel::from_verbosity(0), VerbosityLevel::Warning);
        assert_eq!(VerbosityLevel::from_verbosity(3).level_filter(), log::LevelFilter::Debug);
    }
}
