//! Pointwise regression metrics.

use crate::core::error::{LightGBMError, Result};
use crate::core::types::{MetricKind, Score};
use crate::dataset::Metadata;
use crate::metrics::{weighted_mean_loss, Metric};

/// `l2`, `rmse`, `l1`, `huber`, `quantile` or `mape`.
///
/// `alpha` is the Huber delta or the quantile level.
#[derive(Debug, Clone)]
pub struct RegressionMetric {
    kind: MetricKind,
    alpha: f64,
}

impl RegressionMetric {
    pub fn new(kind: MetricKind, alpha: f64) -> Self {
        RegressionMetric { kind, alpha }
    }

    #[inline]
    fn loss_on_point(&self, label: f64, score: f64) -> f64 {
        let diff = score - label;
        match self.kind {
            MetricKind::L2 | MetricKind::Rmse => diff * diff,
            MetricKind::L1 => diff.abs(),
            MetricKind::Huber => {
                if diff.abs() <= self.alpha {
                    0.5 * diff * diff
                } else {
                    self.alpha * (diff.abs() - 0.5 * self.alpha)
                }
            }
            MetricKind::Quantile => {
                let delta = label - score;
                if delta < 0.0 {
                    (self.alpha - 1.0) * delta
                } else {
                    self.alpha * delta
                }
            }
            MetricKind::Mape => diff.abs() / label.abs().max(1.0),
            _ => f64::NAN,
        }
    }
}

impl Metric for RegressionMetric {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn higher_better(&self) -> bool {
        false
    }

    fn eval(&self, metadata: &Metadata, scores: &[Score]) -> Result<f64> {
        let labels = metadata.labels();
        if scores.len() != labels.len() {
            return Err(LightGBMError::dimension_mismatch(
                format!("{} scores", labels.len()),
                format!("{} scores", scores.len()),
            ));
        }
        let loss = weighted_mean_loss(metadata, |i| self.loss_on_point(labels[i] as f64, scores[i]));
        Ok(match self.kind {
            MetricKind::Rmse => loss.sqrt(),
            _ => loss,
        })
    }

    fn box_clone(&self) -> Box<dyn Metric> {
        Box::new(self.clone())
    }
}
