//! Prediction pipeline.
//!
//! - [`Predictor`]: transformed scores, raw scores, leaf indices and
//!   TreeSHAP contributions for a feature matrix
//! - [`early_stopping`]: margin-based early exit for classification models
//! - [`feature_importance`]: split counts and gain totals per feature

pub mod early_stopping;
pub mod feature_importance;
pub mod predictor;

pub use early_stopping::{PredictionEarlyStopConfig, PredictionEarlyStopInstance};
pub use predictor::{PredictConfig, Predictor};
