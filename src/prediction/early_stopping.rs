//! Prediction early stopping.
//!
//! While a row's raw scores are accumulated tree by tree, the margin of the
//! current scores is checked every `round_period` rounds; once it exceeds
//! the threshold the remaining rounds are skipped for that row. Binary
//! models use `2 * |score|`, multiclass models the gap between the two
//! largest class scores.

use crate::core::constants::{DEFAULT_PRED_EARLY_STOP_FREQ, DEFAULT_PRED_EARLY_STOP_MARGIN};
use crate::core::error::{LightGBMError, Result};
use crate::core::types::ObjectiveType;
use serde::{Deserialize, Serialize};

/// Configuration for prediction early stopping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionEarlyStopConfig {
    pub margin_threshold: f64,
    /// How often, in rounds, the margin is checked
    pub round_period: usize,
}

impl PredictionEarlyStopConfig {
    pub fn new() -> Self {
        Self {
            margin_threshold: DEFAULT_PRED_EARLY_STOP_MARGIN,
            round_period: DEFAULT_PRED_EARLY_STOP_FREQ,
        }
    }

    pub fn with_margin_threshold(mut self, threshold: f64) -> Self {
        self.margin_threshold = threshold;
        self
    }

    pub fn with_round_period(mut self, period: usize) -> Self {
        self.round_period = period;
        self
    }
}

impl Default for PredictionEarlyStopConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarginKind {
    Binary,
    Multiclass,
}

/// Margin check of one model type.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionEarlyStopInstance {
    kind: MarginKind,
    margin_threshold: f64,
    round_period: usize,
}

impl PredictionEarlyStopInstance {
    pub fn round_period(&self) -> usize {
        self.round_period
    }

    /// Whether the raw scores of one row are decided.
    pub fn should_stop(&self, raw: &[f64]) -> bool {
        match self.kind {
            MarginKind::Binary => binary_margin(raw).is_some_and(|m| m > self.margin_threshold),
            MarginKind::Multiclass => multiclass_margin(raw).is_some_and(|m| m > self.margin_threshold),
        }
    }

    /// Whether the check runs after `rounds_done` rounds.
    pub fn is_check_round(&self, rounds_done: usize) -> bool {
        rounds_done > 0 && rounds_done % self.round_period.max(1) == 0
    }
}

pub fn create_binary(config: &PredictionEarlyStopConfig) -> PredictionEarlyStopInstance {
    PredictionEarlyStopInstance {
        kind: MarginKind::Binary,
        margin_threshold: config.margin_threshold,
        round_period: config.round_period,
    }
}

pub fn create_multiclass(config: &PredictionEarlyStopConfig) -> PredictionEarlyStopInstance {
    PredictionEarlyStopInstance {
        kind: MarginKind::Multiclass,
        margin_threshold: config.margin_threshold,
        round_period: config.round_period,
    }
}

/// Instance matching a model's objective; only binary and multiclass
/// models support early stopping.
pub fn create_for_objective(
    objective: ObjectiveType,
    config: &PredictionEarlyStopConfig,
) -> Result<PredictionEarlyStopInstance> {
    match objective {
        ObjectiveType::Binary => Ok(create_binary(config)),
        ObjectiveType::Multiclass => Ok(create_multiclass(config)),
        other => Err(LightGBMError::prediction(format!(
            "Prediction early stopping is not supported for objective {}",
            other
        ))),
    }
}

fn binary_margin(raw: &[f64]) -> Option<f64> {
    match raw {
        [score] => Some(2.0 * score.abs()),
        _ => None,
    }
}

fn multiclass_margin(raw: &[f64]) -> Option<f64> {
    if raw.len() < 2 {
        return None;
    }
    let mut top = f64::NEG_INFINITY;
    let mut second = f64::NEG_INFINITY;
    for &v in raw {
        if v > top {
            second = top;
            top = v;
        } else if v > second {
            second = v;
        }
    }
    Some(top - second)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_margin() {
        let instance = create_binary(&PredictionEarlyStopConfig::new().with_margin_threshold(1.0));
        assert!(instance.should_stop(&[0.6]));
        assert!(instance.should_stop(&[-0.6]));
        assert!(!instance.should_stop(&[0.5]));
    }

    #[test]
    fn test_multiclass_margin() {
        let instance = create_multiclass(&PredictionEarlyStopConfig::new().with_margin_threshold(0.5));
        assert!(instance.should_stop(&[0.9, 0.1, 0.0]));
        assert!(!instance.should_stop(&[0.75, 0.25]));
        assert!(!instance.should_stop(&[3.0, 2.9, -1.0]));
        assert!(!instance.should_stop(&[5.0]));
    }

    #[test]
    fn test_check_rounds() {
        let instance = create_binary(&PredictionEarlyStopConfig::new().with_round_period(3));
        assert!(!instance.is_check_round(0));
        assert!(!instance.is_check_round(2));
        assert!(instance.is_check_round(3));
        assert!(instance.is_check_round(6));
    }

    #[test]
    fn test_regression_is_rejected() {
        let err = create_for_objective(ObjectiveType::Regression, &PredictionEarlyStopConfig::new());
        assert!(err.is_err());
    }
}
