//! Dataset management.
//!
//! Datasets are built from an in-memory feature matrix and labels through
//! [`DatasetBuilder`]. Construction discretizes every feature once; the
//! resulting bins are what histogram construction and row partitioning
//! operate on during training.

pub mod binning;
pub mod dataset;

pub use binning::{BinMapper, BinningParams};
pub use dataset::{Dataset, DatasetBuilder, FeatureInfo, Metadata};
