//! Configuration management.
//!
//! [`Config`] carries every training parameter under its canonical name and
//! [`ConfigBuilder`] assembles one from explicit setters and string
//! parameter maps. Alias resolution and the precedence rules for conflicting
//! spellings live in [`alias`].

pub mod alias;
pub mod core;

pub use self::alias::{canonical_name, resolve_params};
pub use self::core::{Config, ConfigBuilder, RandomSeeds};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "lightgbm.toml";
