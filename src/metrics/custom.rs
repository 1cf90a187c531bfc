//! User supplied evaluation metric.

use crate::core::error::{LightGBMError, Result};
use crate::core::types::Score;
use crate::dataset::Metadata;
use crate::metrics::Metric;
use std::fmt;
use std::sync::Arc;

/// Signature of a user metric: raw class-major scores and the metadata of
/// the evaluated set in, one value out.
pub type MetricFn = dyn Fn(&[Score], &Metadata) -> anyhow::Result<f64> + Send + Sync;

/// Metric backed by a closure. Custom metrics are evaluated after the
/// configured built-in metrics.
#[derive(Clone)]
pub struct CustomMetric {
    name: String,
    higher_better: bool,
    func: Arc<MetricFn>,
}

impl CustomMetric {
    pub fn new<F>(name: impl Into<String>, higher_better: bool, func: F) -> Self
    where
        F: Fn(&[Score], &Metadata) -> anyhow::Result<f64> + Send + Sync + 'static,
    {
        CustomMetric {
            name: name.into(),
            higher_better,
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for CustomMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomMetric")
            .field("name", &self.name)
            .field("higher_better", &self.higher_better)
            .finish_non_exhaustive()
    }
}

impl Metric for CustomMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn higher_better(&self) -> bool {
        self.higher_better
    }

    fn eval(&self, metadata: &Metadata, scores: &[Score]) -> Result<f64> {
        (self.func)(scores, metadata).map_err(|e| LightGBMError::user_callback(&self.name, e))
    }

    fn box_clone(&self) -> Box<dyn Metric> {
        Box::new(self.clone())
    }
}
