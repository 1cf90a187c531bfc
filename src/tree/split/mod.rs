//! Split finding for numerical and categorical features.

pub mod categorical;
pub mod finder;

pub use finder::{leaf_output, SplitFinder, SplitFinderConfig, SplitInfo};
