//! Core infrastructure module.
//!
//! This module provides the foundational components shared by every other
//! part of the engine:
//!
//! - [`types`]: Fundamental data types and enumerations
//! - [`constants`]: Configuration defaults and numeric constants
//! - [`error`]: Error taxonomy and result type
//! - [`traits`]: The objective function abstraction
//!
//! ```rust
//! use lightgbm_engine::core::{
//!     types::{Score, ObjectiveType},
//!     constants::DEFAULT_LEARNING_RATE,
//!     error::{Result, LightGBMError},
//! };
//!
//! let learning_rate = DEFAULT_LEARNING_RATE;
//! let objective = ObjectiveType::Regression;
//! assert_eq!(objective.to_string(), "regression");
//! # let _ = learning_rate;
//! ```

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

pub use constants::*;
pub use error::{LightGBMError, Result};
pub use traits::*;
pub use types::*;

/// Version information for the core module
pub const CORE_MODULE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the logging backend.
///
/// Uses `env_logger`, so `RUST_LOG` controls the output. Calling this more
/// than once is harmless.
pub fn initialize() {
    if env_logger::try_init().is_ok() {
        log::debug!("Logging initialized (engine version {})", CORE_MODULE_VERSION);
    }
}

/// Initialize logging with a level derived from LightGBM's `verbosity`.
///
/// `RUST_LOG`, when set, still takes precedence over the verbosity level.
pub fn initialize_with_verbosity(verbosity: i32) {
    let level = VerbosityLevel::from_verbosity(verbosity).level_filter();
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_is_idempotent() {
        initialize();
        initialize();
        initialize_with_verbosity(-1);
    }
}
