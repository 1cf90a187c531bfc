//! Boosting: the training driver and everything it orchestrates.
//!
//! [`GBDT`] runs the round loop for all three boosting modes (`gbdt`,
//! `dart`, `rf`). Row subsampling lives in [`sample_strategy`], dropout in
//! [`dart`], the stopping rule in [`early_stopping`] and user hooks in
//! [`callback`]. Training produces a [`Booster`].

pub mod callback;
pub mod dart;
pub mod early_stopping;
pub mod ensemble;
pub mod gbdt;
pub mod sample_strategy;

pub use callback::{Callback, CallbackAction, CallbackEnv, LearningRateSchedule, LogEvaluation};
pub use dart::Dart;
pub use early_stopping::{EarlyStopping, EarlyStoppingConfig, EarlyStoppingDecision};
pub use ensemble::Booster;
pub use gbdt::{train, TrainingState, GBDT};
pub use sample_strategy::SampleStrategy;
