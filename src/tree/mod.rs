//! Tree learning subsystem.
//!
//! [`Tree`] is the trained decision tree. The remaining modules grow one:
//! [`histogram`] accumulates gradient statistics per bin, [`split`] finds the
//! best split of a leaf from them, [`sampling`] picks the features a tree
//! may use and [`learner`] drives growth and row partitioning.

pub mod histogram;
pub mod learner;
pub mod node;
pub mod sampling;
pub mod split;
pub mod tree;

pub use histogram::{BinEntry, FeatureHistogram, HistogramBuilder, LeafHistogram};
pub use learner::{DataPartition, SerialTreeLearner, SerialTreeLearnerConfig};
pub use node::{CategoryBitset, NodeSplit, SplitCondition, TreeNode};
pub use sampling::{FeatureSampler, FeatureSamplingConfig};
pub use split::{SplitFinder, SplitFinderConfig, SplitInfo};
pub use tree::{LeafStats, Tree};
