//! Evaluation metrics.
//!
//! A [`Metric`] scores the raw predictions of one evaluation set after
//! every boosting round. Metrics are created per evaluation set by
//! [`create_metrics`] and initialised against that set's [`Metadata`], so
//! per-dataset state (for example the ideal DCG of every query) is computed
//! once. Results accumulate in an [`EvalHistory`].
//!
//! Weighted metrics whose weights sum to zero evaluate to NaN.
//!
//! ```rust
//! use lightgbm_engine::config::ConfigBuilder;
//! use lightgbm_engine::core::traits::OutputTransform;
//! use lightgbm_engine::core::types::MetricKind;
//! use lightgbm_engine::dataset::Metadata;
//! use lightgbm_engine::metrics::create_metrics;
//!
//! # fn main() -> lightgbm_engine::Result<()> {
//! let config = ConfigBuilder::new().metric(vec![MetricKind::L2, MetricKind::L1]).build()?;
//! let metadata = Metadata::new(vec![1.0, 2.0], None, None, None)?;
//! let mut metrics = create_metrics(&config, OutputTransform::Identity)?;
//! for metric in metrics.iter_mut() {
//!     metric.init(&metadata)?;
//! }
//! let l2 = metrics[0].eval(&metadata, &[1.5, 2.0])?;
//! assert!((l2 - 0.125).abs() < 1e-12);
//! # Ok(())
//! # }
//! ```

pub mod classification;
pub mod custom;
pub mod ranking;
pub mod regression;

pub use classification::{AucMetric, BinaryMetric, MulticlassMetric};
pub use custom::{CustomMetric, MetricFn};
pub use ranking::NdcgMetric;
pub use regression::RegressionMetric;

use crate::config::Config;
use crate::core::error::Result;
use crate::core::traits::OutputTransform;
use crate::core::types::{MetricKind, Score};
use crate::dataset::Metadata;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// An evaluation metric over the raw scores of one dataset.
pub trait Metric: Send + Sync + Debug {
    /// Name reported in evaluation results, e.g. `l2` or `ndcg@3`.
    fn name(&self) -> &str;

    /// Whether larger values are better.
    fn higher_better(&self) -> bool;

    /// Precompute dataset dependent state.
    fn init(&mut self, _metadata: &Metadata) -> Result<()> {
        Ok(())
    }

    /// Evaluate raw, class-major scores.
    fn eval(&self, metadata: &Metadata, scores: &[Score]) -> Result<f64>;

    fn box_clone(&self) -> Box<dyn Metric>;
}

impl Clone for Box<dyn Metric> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// One metric value of one evaluation set at one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalResult {
    pub data_name: String,
    pub metric_name: String,
    #[serde(with = "crate::io::serialization::float_repr")]
    pub value: f64,
    pub higher_better: bool,
}

impl EvalResult {
    /// `set's metric: value`, the form used by evaluation logs.
    pub fn to_log_string(&self) -> String {
        format!("{}'s {}: {:.6}", self.data_name, self.metric_name, self.value)
    }
}

/// Recorded values of one metric on one evaluation set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalSeries {
    pub data_name: String,
    pub metric_name: String,
    #[serde(with = "crate::io::serialization::float_repr::vec")]
    pub values: Vec<f64>,
}

/// Per-round metric values keyed by evaluation set and metric name, in
/// the order the series were first recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalHistory {
    series: Vec<EvalSeries>,
}

impl EvalHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &EvalResult) {
        match self
            .series
            .iter_mut()
            .find(|s| s.data_name == result.data_name && s.metric_name == result.metric_name)
        {
            Some(series) => series.values.push(result.value),
            None => self.series.push(EvalSeries {
                data_name: result.data_name.clone(),
                metric_name: result.metric_name.clone(),
                values: vec![result.value],
            }),
        }
    }

    /// Values of one metric for every recorded round.
    pub fn get(&self, data_name: &str, metric_name: &str) -> Option<&[f64]> {
        self.series
            .iter()
            .find(|s| s.data_name == data_name && s.metric_name == metric_name)
            .map(|s| s.values.as_slice())
    }

    pub fn series(&self) -> &[EvalSeries] {
        &self.series
    }

    /// Distinct evaluation set names, in recording order.
    pub fn data_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for s in &self.series {
            if !names.contains(&s.data_name.as_str()) {
                names.push(&s.data_name);
            }
        }
        names
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Drop every value recorded after `num_rounds` rounds.
    pub fn truncate(&mut self, num_rounds: usize) {
        for series in &mut self.series {
            series.values.truncate(num_rounds);
        }
    }
}

/// Create the built-in metrics configured for `config`.
///
/// `transform` is the objective's output transform; classification metrics
/// use it to turn raw scores into probabilities.
pub fn create_metrics(config: &Config, transform: OutputTransform) -> Result<Vec<Box<dyn Metric>>> {
    let mut metrics: Vec<Box<dyn Metric>> = Vec::new();
    for kind in config.resolved_metrics() {
        match kind {
            MetricKind::None => {}
            MetricKind::L2
            | MetricKind::Rmse
            | MetricKind::L1
            | MetricKind::Huber
            | MetricKind::Quantile
            | MetricKind::Mape => metrics.push(Box::new(RegressionMetric::new(kind, config.alpha))),
            MetricKind::BinaryLogloss | MetricKind::BinaryError => {
                metrics.push(Box::new(BinaryMetric::new(kind, transform)))
            }
            MetricKind::Auc => metrics.push(Box::new(AucMetric::new())),
            MetricKind::MultiLogloss | MetricKind::MultiError => metrics.push(Box::new(
                MulticlassMetric::new(kind, config.num_class, config.multi_error_top_k, transform)?,
            )),
            MetricKind::Ndcg => {
                for &k in &config.eval_at {
                    metrics.push(Box::new(NdcgMetric::new(k, config.label_gain.clone())));
                }
            }
        }
    }
    Ok(metrics)
}

/// Weighted mean of a pointwise loss; NaN when the weights sum to zero.
pub(crate) fn weighted_mean_loss<F>(metadata: &Metadata, loss: F) -> f64
where
    F: Fn(usize) -> f64,
{
    let num_data = metadata.num_data();
    match metadata.weights() {
        Some(weights) => {
            let mut sum = 0.0;
            let mut sum_weights = 0.0;
            for (i, &w) in weights.iter().enumerate() {
                sum += loss(i) * w as f64;
                sum_weights += w as f64;
            }
            sum / sum_weights
        }
        None => (0..num_data).map(loss).sum::<f64>() / num_data as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::core::types::ObjectiveType;

    #[test]
    fn test_default_metric_follows_objective() {
        let config = ConfigBuilder::new()
            .objective(ObjectiveType::Binary)
            .build()
            .unwrap();
        let metrics = create_metrics(&config, OutputTransform::Sigmoid { sigmoid: 1.0 }).unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].name(), "binary_logloss");
    }

    #[test]
    fn test_none_disables_metrics() {
        let config = ConfigBuilder::new()
            .metric(vec![MetricKind::None])
            .build()
            .unwrap();
        assert!(create_metrics(&config, OutputTransform::Identity).unwrap().is_empty());
    }

    #[test]
    fn test_ndcg_expands_eval_at() {
        let config = ConfigBuilder::new()
            .objective(ObjectiveType::LambdaRank)
            .eval_at(vec![1, 3])
            .build()
            .unwrap();
        let metrics = create_metrics(&config, OutputTransform::Identity).unwrap();
        let names: Vec<_> = metrics.iter().map(|m| m.name().to_string()).collect();
        assert_eq!(names, vec!["ndcg@1", "ndcg@3"]);
        assert!(metrics.iter().all(|m| m.higher_better()));
    }

    #[test]
    fn test_zero_weights_give_nan() {
        let md = Metadata::new(vec![1.0, 2.0], Some(vec![0.0, 0.0]), None, None).unwrap();
        assert!(weighted_mean_loss(&md, |_| 1.0).is_nan());
    }

    #[test]
    fn test_history_records_in_order() {
        let mut history = EvalHistory::new();
        for value in [0.5, 0.4] {
            history.record(&EvalResult {
                data_name: "valid_0".into(),
                metric_name: "l2".into(),
                value,
                higher_better: false,
            });
        }
        assert_eq!(history.get("valid_0", "l2"), Some(&[0.5, 0.4][..]));
        history.truncate(1);
        assert_eq!(history.get("valid_0", "l2"), Some(&[0.5][..]));
        assert!(history.get("training", "l2").is_none());
    }
}
