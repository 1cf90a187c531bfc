//! Model serialization.
//!
//! Both formats wrap the model in a versioned envelope:
//!
//! ```text
//! { format_version, engine_version, model }
//! ```
//!
//! Loading rejects envelopes written with a different `format_version` and
//! runs [`Booster::validate`] on the decoded model, so a file either yields
//! a model that predicts exactly like the saved one or an error.

pub mod bincode;
pub mod float_repr;
pub mod json;

use crate::boosting::Booster;
use crate::core::constants::MODEL_FORMAT_VERSION;
use crate::core::error::{LightGBMError, Result};
use crate::core::CORE_MODULE_VERSION;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported serialization formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SerializationFormat {
    /// Compact binary form
    #[default]
    Bincode,
    /// Human-readable text form
    Json,
}

impl fmt::Display for SerializationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationFormat::Bincode => write!(f, "bincode"),
            SerializationFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for SerializationFormat {
    type Err = LightGBMError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bincode" | "bin" => Ok(SerializationFormat::Bincode),
            "json" => Ok(SerializationFormat::Json),
            _ => Err(LightGBMError::serialization(format!("Unknown format: {}", s))),
        }
    }
}

/// On-disk wrapper around a model.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ModelEnvelope<M> {
    pub format_version: u32,
    pub engine_version: String,
    pub model: M,
}

impl<'a> ModelEnvelope<&'a Booster> {
    pub fn wrap(model: &'a Booster) -> Self {
        ModelEnvelope {
            format_version: MODEL_FORMAT_VERSION,
            engine_version: CORE_MODULE_VERSION.to_string(),
            model,
        }
    }
}

impl ModelEnvelope<Booster> {
    /// Check the envelope and hand out the validated model.
    pub fn unwrap_model(self) -> Result<Booster> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(LightGBMError::serialization(format!(
                "Unsupported model format version {} (written by engine {}), expected {}",
                self.format_version, self.engine_version, MODEL_FORMAT_VERSION
            )));
        }
        self.model.validate()?;
        Ok(self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<SerializationFormat>().unwrap(), SerializationFormat::Json);
        assert_eq!("bin".parse::<SerializationFormat>().unwrap(), SerializationFormat::Bincode);
        assert!("lightgbm".parse::<SerializationFormat>().is_err());
        assert_eq!(SerializationFormat::default().to_string(), "bincode");
    }
}
