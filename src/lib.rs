//! # LightGBM Engine
//!
//! A gradient boosting decision tree engine: histogram-based tree learning
//! over binned features, leaf-wise or depth-wise growth, and an ensemble
//! that can be evaluated, early-stopped, saved and reloaded.
//!
//! ## Quick Start
//!
//! ```rust
//! use lightgbm_engine::{ConfigBuilder, Dataset, ObjectiveType, PredictConfig, GBDT};
//! use ndarray::{Array1, Array2};
//!
//! # fn main() -> lightgbm_engine::Result<()> {
//! let features = Array2::from_shape_fn((300, 3), |(i, j)| ((i * 7 + j * 13) % 29) as f32);
//! let labels = Array1::from_iter((0..300).map(|i| if features[[i, 0]] > 14.0 { 1.0 } else { 0.0 }));
//! let train = Dataset::builder().features(features.clone()).labels(labels.clone()).build()?;
//! let valid = Dataset::builder()
//!     .features(features.clone())
//!     .labels(labels)
//!     .reference(&train)
//!     .build()?;
//!
//! let config = ConfigBuilder::new()
//!     .objective(ObjectiveType::Binary)
//!     .num_iterations(20)
//!     .early_stopping_round(5)
//!     .build()?;
//!
//! let mut gbdt = GBDT::new(config, &train)?;
//! gbdt.add_valid(&valid, None)?;
//! let booster = gbdt.train()?;
//!
//! let probabilities = booster.predict(&features.view())?;
//! let raw = booster.predict_with(&features.view(), &PredictConfig::new().with_raw_score(true))?;
//! assert_eq!(probabilities.dim(), raw.dim());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: shared types, constants, the error type and objective traits
//! - [`config`]: parameters, aliases and validation
//! - [`dataset`]: feature binning, labels, weights, groups and init scores
//! - [`tree`]: histograms, split finding and the serial tree learner
//! - [`objective`]: gradients and hessians of the built-in losses
//! - [`metrics`]: evaluation metrics and the evaluation history
//! - [`boosting`]: the boosting driver, DART, sampling, callbacks and early stopping
//! - [`prediction`]: batch prediction, leaf indices, contributions and importance
//! - [`io`]: versioned JSON and bincode model files

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod boosting;
pub mod config;
pub mod core;
pub mod dataset;
pub mod io;
pub mod metrics;
pub mod objective;
pub mod prediction;
pub mod tree;

pub use crate::boosting::{
    train, Booster, Callback, CallbackAction, CallbackEnv, LearningRateSchedule, LogEvaluation,
    TrainingState, GBDT,
};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::core::error::{LightGBMError, Result};
pub use crate::core::traits::{ObjectiveFunction, OutputTransform};
pub use crate::core::types::{
    BoostingType, DataSampleStrategy, GrowPolicy, ImportanceType, MetricKind, ObjectiveType,
};
pub use crate::core::{initialize, initialize_with_verbosity};
pub use crate::dataset::{Dataset, DatasetBuilder, Metadata};
pub use crate::io::{load_model, save_model, SerializationFormat};
pub use crate::metrics::{CustomMetric, EvalHistory, EvalResult, Metric};
pub use crate::objective::CustomObjective;
pub use crate::prediction::{PredictConfig, Predictor};

/// Engine version recorded in saved models.
pub const VERSION: &str = crate::core::CORE_MODULE_VERSION;
