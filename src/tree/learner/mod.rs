//! Tree learning: row partitioning and the serial learner.

pub mod partition;
pub mod serial;

pub use partition::DataPartition;
pub use serial::{SerialTreeLearner, SerialTreeLearnerConfig};
