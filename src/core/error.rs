//! Error handling and error types for the training engine.
//!
//! Every fallible operation in the crate returns [`Result`], whose error side
//! is the single [`LightGBMError`] enum. The variants follow the engine's
//! error taxonomy: configuration problems are reported before training
//! starts, schema problems are reported per prediction call, and contract
//! violations by user-supplied callables are fatal.

use std::io;
use thiserror::Error;

/// Main error type for the engine.
#[derive(Error, Debug)]
pub enum LightGBMError {
    /// Contradictory or otherwise unusable configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A single parameter carries an out-of-range or unparsable value
    #[error("Invalid parameter: {parameter} = {value}, {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Dataset construction and validation errors
    #[error("Dataset error: {message}")]
    Dataset { message: String },

    /// Dimension mismatch errors
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    /// Prediction input does not match the trained feature schema
    #[error("Schema error: {message}")]
    Schema { message: String },

    /// Boosting loop errors
    #[error("Training error: {message}")]
    Training { message: String },

    /// Errors raised while growing a single tree
    #[error("Tree construction error: {message}")]
    TreeConstruction { message: String },

    /// Objective contract violations (label domain, gradient shape)
    #[error("Objective error: {message}")]
    Objective { message: String },

    /// Metric evaluation errors
    #[error("Metric error: {message}")]
    Metric { message: String },

    /// Prediction errors
    #[error("Prediction error: {message}")]
    Prediction { message: String },

    /// Numerical computation errors (non-finite gradients, overflow)
    #[error("Numerical error: {message}")]
    Numerical { message: String },

    /// Model serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {source}")]
    IO {
        #[from]
        source: io::Error,
    },

    /// JSON serialization errors
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Bincode serialization errors
    #[error("Bincode error: {source}")]
    Bincode {
        #[from]
        source: bincode::Error,
    },

    /// TOML configuration parsing errors
    #[error("TOML error: {source}")]
    Toml {
        #[from]
        source: toml::de::Error,
    },

    /// Error returned by a user-supplied closure (objective, metric, callback)
    #[error("User function '{name}' failed: {source}")]
    UserCallback {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// Internal library errors (should not occur in normal usage)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Type alias for Results using LightGBMError
pub type Result<T> = std::result::Result<T, LightGBMError>;

impl LightGBMError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        LightGBMError::Config {
            message: message.into(),
        }
    }

    /// Create a dataset error
    pub fn dataset<S: Into<String>>(message: S) -> Self {
        LightGBMError::Dataset {
            message: message.into(),
        }
    }

    /// Create a schema error
    pub fn schema<S: Into<String>>(message: S) -> Self {
        LightGBMError::Schema {
            message: message.into(),
        }
    }

    /// Create a training error
    pub fn training<S: Into<String>>(message: S) -> Self {
        LightGBMError::Training {
            message: message.into(),
        }
    }

    /// Create a tree construction error
    pub fn tree_construction<S: Into<String>>(message: S) -> Self {
        LightGBMError::TreeConstruction {
            message: message.into(),
        }
    }

    /// Create an objective error
    pub fn objective<S: Into<String>>(message: S) -> Self {
        LightGBMError::Objective {
            message: message.into(),
        }
    }

    /// Create a metric error
    pub fn metric<S: Into<String>>(message: S) -> Self {
        LightGBMError::Metric {
            message: message.into(),
        }
    }

    /// Create a prediction error
    pub fn prediction<S: Into<String>>(message: S) -> Self {
        LightGBMError::Prediction {
            message: message.into(),
        }
    }

    /// Create a numerical error
    pub fn numerical<S: Into<String>>(message: S) -> Self {
        LightGBMError::Numerical {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        LightGBMError::Serialization {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter<P, V, R>(parameter: P, value: V, reason: R) -> Self
    where
        P: Into<String>,
        V: Into<String>,
        R: Into<String>,
    {
        LightGBMError::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch<E, A>(expected: E, actual: A) -> Self
    where
        E: Into<String>,
        A: Into<String>,
    {
        LightGBMError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Wrap an error returned by a user-supplied closure
    pub fn user_callback<S: Into<String>>(name: S, source: anyhow::Error) -> Self {
        LightGBMError::UserCallback {
            name: name.into(),
            source,
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        LightGBMError::Internal {
            message: message.into(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            LightGBMError::Config { .. } => "config",
            LightGBMError::InvalidParameter { .. } => "invalid_parameter",
            LightGBMError::Dataset { .. } => "dataset",
            LightGBMError::DimensionMismatch { .. } => "dimension_mismatch",
            LightGBMError::Schema { .. } => "schema",
            LightGBMError::Training { .. } => "training",
            LightGBMError::TreeConstruction { .. } => "tree_construction",
            LightGBMError::Objective { .. } => "objective",
            LightGBMError::Metric { .. } => "metric",
            LightGBMError::Prediction { .. } => "prediction",
            LightGBMError::Numerical { .. } => "numerical",
            LightGBMError::Serialization { .. } => "serialization",
            LightGBMError::IO { .. } => "io",
            LightGBMError::Json { .. } => "json",
            LightGBMError::Bincode { .. } => "bincode",
            LightGBMError::Toml { .. } => "toml",
            LightGBMError::UserCallback { .. } => "user_callback",
            LightGBMError::Internal { .. } => "internal",
        }
    }

    /// Whether this error belongs to the configuration class, i.e. it is
    /// raised before any tree is grown.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            LightGBMError::Config { .. } | LightGBMError::InvalidParameter { .. }
        )
    }
}

/// Convenience macros for error creation
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::core::error::LightGBMError::config($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::LightGBMError::config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! dataset_error {
    ($msg:expr) => {
        $crate::core::error::LightGBMError::dataset($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::LightGBMError::dataset(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! training_error {
    ($msg:expr) => {
        $crate::core::error::LightGBMError::training($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::LightGBMError::training(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}
