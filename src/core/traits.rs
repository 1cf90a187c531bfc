//! Core trait definitions.
//!
//! [`ObjectiveFunction`] is the single seam between the boosting driver and
//! every loss it can optimize, built-in or user supplied. The driver owns
//! the score and gradient buffers; objectives only read labels, weights and
//! query boundaries from the dataset [`Metadata`] and fill the buffers.

use crate::core::error::Result;
use crate::core::types::*;
use crate::dataset::Metadata;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Mapping from raw scores to the objective's natural output space.
///
/// Stored with a trained model so that transformed predictions do not need
/// the objective object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OutputTransform {
    /// Raw scores are the output
    Identity,
    /// Logistic transform `1 / (1 + exp(-sigmoid * s))`
    Sigmoid { sigmoid: f64 },
    /// Softmax across the classes of one row
    Softmax,
}

impl Default for OutputTransform {
    fn default() -> Self {
        OutputTransform::Identity
    }
}

impl OutputTransform {
    /// Transform the raw scores of one row (`num_class` values) into `output`.
    pub fn apply(&self, raw: &[f64], output: &mut [f64]) {
        match self {
            OutputTransform::Identity => output.copy_from_slice(raw),
            OutputTransform::Sigmoid { sigmoid } => {
                for (out, &r) in output.iter_mut().zip(raw) {
                    *out = 1.0 / (1.0 + (-sigmoid * r).exp());
                }
            }
            OutputTransform::Softmax => softmax(raw, output),
        }
    }
}

/// Numerically stable softmax.
pub fn softmax(raw: &[f64], output: &mut [f64]) {
    let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for (out, &r) in output.iter_mut().zip(raw) {
        *out = (r - max).exp();
        sum += *out;
    }
    for out in output.iter_mut() {
        *out /= sum;
    }
}

/// Trait for objective functions that compute gradients and hessians.
///
/// Scores and gradients of multiclass objectives are laid out class-major:
/// the value for row `i` and class `k` lives at `k * num_data + i`.
pub trait ObjectiveFunction: Send + Sync + Debug {
    /// Objective name as reported in logs and model files.
    fn name(&self) -> &str;

    /// Validate labels and precompute per-dataset state.
    fn init(&mut self, metadata: &Metadata) -> Result<()>;

    /// Number of trees grown per boosting round.
    fn num_model_per_iteration(&self) -> usize {
        1
    }

    /// Compute first and second order gradients for the current scores.
    fn get_gradients(
        &self,
        metadata: &Metadata,
        scores: &[Score],
        gradients: &mut [Grad],
        hessians: &mut [Grad],
    ) -> Result<()>;

    /// Initial score for `class_id` used when boosting from the average.
    fn boost_from_score(&self, _metadata: &Metadata, _class_id: usize) -> f64 {
        0.0
    }

    /// Transform applied to raw scores for non-raw predictions.
    fn output_transform(&self) -> OutputTransform {
        OutputTransform::Identity
    }

    /// Whether leaf outputs are recomputed from residuals after growth.
    fn is_renew_tree_output(&self) -> bool {
        false
    }

    /// Recompute one leaf output from the residuals of the rows in the leaf.
    fn renew_tree_output(
        &self,
        _metadata: &Metadata,
        _scores: &[Score],
        _leaf_rows: &[DataSize],
        current_output: f64,
    ) -> f64 {
        current_output
    }

    /// Built-in kind, [`ObjectiveType::Custom`] for user objectives.
    fn objective_type(&self) -> ObjectiveType;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sigmoid_transform() {
        let transform = OutputTransform::Sigmoid { sigmoid: 1.0 };
        let mut out = [0.0; 2];
        transform.apply(&[0.0, 2.0], &mut out);
        assert_relative_eq!(out[0], 0.5);
        assert_relative_eq!(out[1], 1.0 / (1.0 + (-2.0f64).exp()));
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let mut out = [0.0; 3];
        OutputTransform::Softmax.apply(&[1.0, 2.0, 1000.0], &mut out);
        assert_relative_eq!(out.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(out[2] > 0.99);
    }

    #[test]
    fn test_identity_copies() {
        let mut out = [0.0; 2];
        OutputTransform::Identity.apply(&[-3.0, 4.5], &mut out);
        assert_eq!(out, [-3.0, 4.5]);
    }
}
