//! User supplied objective.

use crate::core::error::{LightGBMError, Result};
use crate::core::traits::{ObjectiveFunction, OutputTransform};
use crate::core::types::{Grad, ObjectiveType, Score};
use crate::dataset::Metadata;
use std::fmt;
use std::sync::Arc;

/// Signature of a user objective: raw scores (class-major) and the training
/// metadata in, per-row gradients and hessians of the same length out.
pub type GradientFn =
    dyn Fn(&[Score], &Metadata) -> anyhow::Result<(Vec<f64>, Vec<f64>)> + Send + Sync;

/// Objective whose gradients come from a closure.
///
/// The closure is treated opaquely; its output is only checked for length
/// and finiteness. Any violation aborts training.
#[derive(Clone)]
pub struct CustomObjective {
    name: String,
    func: Arc<GradientFn>,
    num_class: usize,
    output_transform: OutputTransform,
}

impl CustomObjective {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Score], &Metadata) -> anyhow::Result<(Vec<f64>, Vec<f64>)> + Send + Sync + 'static,
    {
        CustomObjective {
            name: name.into(),
            func: Arc::new(func),
            num_class: 1,
            output_transform: OutputTransform::Identity,
        }
    }

    /// Number of trees per round; scores are then class-major.
    pub fn with_num_class(mut self, num_class: usize) -> Self {
        self.num_class = num_class.max(1);
        self
    }

    /// Transform applied by non-raw predictions.
    pub fn with_output_transform(mut self, transform: OutputTransform) -> Self {
        self.output_transform = transform;
        self
    }
}

impl fmt::Debug for CustomObjective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomObjective")
            .field("name", &self.name)
            .field("num_class", &self.num_class)
            .finish_non_exhaustive()
    }
}

impl ObjectiveFunction for CustomObjective {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, _metadata: &Metadata) -> Result<()> {
        Ok(())
    }

    fn num_model_per_iteration(&self) -> usize {
        self.num_class
    }

    fn get_gradients(
        &self,
        metadata: &Metadata,
        scores: &[Score],
        gradients: &mut [Grad],
        hessians: &mut [Grad],
    ) -> Result<()> {
        let (grad, hess) =
            (self.func)(scores, metadata).map_err(|e| LightGBMError::user_callback(&self.name, e))?;
        let expected = gradients.len();
        if grad.len() != expected || hess.len() != expected {
            return Err(LightGBMError::objective(format!(
                "Custom objective '{}' returned {} gradients and {} hessians, expected {}",
                self.name,
                grad.len(),
                hess.len(),
                expected
            )));
        }
        for (i, (&g, &h)) in grad.iter().zip(&hess).enumerate() {
            if !g.is_finite() || !h.is_finite() {
                return Err(LightGBMError::objective(format!(
                    "Custom objective '{}' returned a non-finite value at position {}",
                    self.name, i
                )));
            }
            gradients[i] = g as Grad;
            hessians[i] = h as Grad;
        }
        Ok(())
    }

    fn output_transform(&self) -> OutputTransform {
        self.output_transform
    }

    fn objective_type(&self) -> ObjectiveType {
        ObjectiveType::Custom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> Metadata {
        Metadata::new(vec![1.0, 2.0, 3.0], None, None, None).unwrap()
    }

    #[test]
    fn test_l2_closure() {
        let obj = CustomObjective::new("my_l2", |scores: &[f64], md: &Metadata| {
            let g = scores
                .iter()
                .zip(md.labels())
                .map(|(s, &l)| s - l as f64)
                .collect();
            Ok((g, vec![1.0; scores.len()]))
        });
        let mut g = vec![0.0; 3];
        let mut h = vec![0.0; 3];
        obj.get_gradients(&metadata(), &[0.0; 3], &mut g, &mut h).unwrap();
        assert_eq!(g, vec![-1.0, -2.0, -3.0]);
        assert_eq!(h, vec![1.0; 3]);
    }

    #[test]
    fn test_wrong_length_is_fatal() {
        let obj = CustomObjective::new("short", |_: &[f64], _: &Metadata| Ok((vec![0.0], vec![1.0])));
        let mut g = vec![0.0; 3];
        let mut h = vec![0.0; 3];
        let err = obj.get_gradients(&metadata(), &[0.0; 3], &mut g, &mut h).unwrap_err();
        assert!(matches!(err, LightGBMError::Objective { .. }));
    }

    #[test]
    fn test_non_finite_is_fatal() {
        let obj = CustomObjective::new("nan", |s: &[f64], _: &Metadata| {
            Ok((vec![f64::NAN; s.len()], vec![1.0; s.len()]))
        });
        let mut g = vec![0.0; 3];
        let mut h = vec![0.0; 3];
        assert!(obj.get_gradients(&metadata(), &[0.0; 3], &mut g, &mut h).is_err());
    }

    #[test]
    fn test_closure_error_is_wrapped() {
        let obj = CustomObjective::new("failing", |_: &[f64], _: &Metadata| {
            Err(anyhow::anyhow!("boom"))
        });
        let mut g = vec![0.0; 3];
        let mut h = vec![0.0; 3];
        let err = obj.get_gradients(&metadata(), &[0.0; 3], &mut g, &mut h).unwrap_err();
        assert!(matches!(err, LightGBMError::UserCallback { .. }));
    }
}
