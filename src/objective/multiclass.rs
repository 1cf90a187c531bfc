//! Softmax objective for multiclass classification.

use crate::core::constants::K_EPSILON;
use crate::core::error::{LightGBMError, Result};
use crate::core::traits::{softmax, ObjectiveFunction, OutputTransform};
use crate::core::types::{Grad, ObjectiveType, Score};
use crate::dataset::Metadata;

/// Softmax cross-entropy; grows one tree per class and round.
///
/// Scores and gradients are class-major: class `k` of row `i` lives at
/// `k * num_data + i`.
#[derive(Debug, Clone)]
pub struct MulticlassSoftmax {
    num_class: usize,
    /// Hessian scale `K / (K - 1)`
    factor: f64,
    class_priors: Vec<f64>,
}

impl MulticlassSoftmax {
    pub fn new(num_class: usize) -> Result<Self> {
        if num_class < 2 {
            return Err(LightGBMError::invalid_parameter(
                "num_class",
                num_class.to_string(),
                "multiclass objective needs at least 2 classes",
            ));
        }
        Ok(MulticlassSoftmax {
            num_class,
            factor: num_class as f64 / (num_class as f64 - 1.0),
            class_priors: vec![1.0 / num_class as f64; num_class],
        })
    }
}

impl ObjectiveFunction for MulticlassSoftmax {
    fn name(&self) -> &str {
        "multiclass"
    }

    fn init(&mut self, metadata: &Metadata) -> Result<()> {
        let mut counts = vec![0.0; self.num_class];
        for (i, &label) in metadata.labels().iter().enumerate() {
            if label < 0.0 || label.fract() != 0.0 || label as usize >= self.num_class {
                return Err(LightGBMError::objective(format!(
                    "Multiclass labels must be integers in [0, {}), found {} at row {}",
                    self.num_class, label, i
                )));
            }
            counts[label as usize] += metadata.weight(i);
        }
        let total: f64 = counts.iter().sum();
        if total > 0.0 {
            self.class_priors = counts.iter().map(|c| c / total).collect();
        }
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
        let num_data = metadata.num_data();
        let labels = metadata.labels();
        let mut raw = vec![0.0; self.num_class];
        let mut prob = vec![0.0; self.num_class];
        for i in 0..num_data {
            for k in 0..self.num_class {
                raw[k] = scores[k * num_data + i];
            }
            softmax(&raw, &mut prob);
            let label = labels[i] as usize;
            let w = metadata.weight(i);
            for k in 0..self.num_class {
                let p = prob[k];
                let target = if k == label { 1.0 } else { 0.0 };
                gradients[k * num_data + i] = ((p - target) * w) as Grad;
                hessians[k * num_data + i] = (self.factor * p * (1.0 - p) * w) as Grad;
            }
        }
        Ok(())
    }

    /// Log of the weighted class frequency.
    fn boost_from_score(&self, _metadata: &Metadata, class_id: usize) -> f64 {
        self.class_priors
            .get(class_id)
            .map_or(0.0, |&p| p.max(K_EPSILON).ln())
    }

    fn output_transform(&self) -> OutputTransform {
        OutputTransform::Softmax
    }

    fn objective_type(&self) -> ObjectiveType {
        ObjectiveType::Multiclass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gradients_sum_to_zero_per_row() {
        let md = Metadata::new(vec![0.0, 2.0], None, None, None).unwrap();
        let mut obj = MulticlassSoftmax::new(3).unwrap();
        obj.init(&md).unwrap();
        let scores = vec![0.1, 0.0, 0.5, -0.2, 0.3, 1.0];
        let mut g = vec![0.0; 6];
        let mut h = vec![0.0; 6];
        obj.get_gradients(&md, &scores, &mut g, &mut h).unwrap();
        for i in 0..2 {
            let sum: f64 = (0..3).map(|k| g[k * 2 + i] as f64).sum();
            assert_relative_eq!(sum, 0.0, epsilon = 1e-6);
        }
        assert!(g[0] < 0.0);
        assert!(g[5] < 0.0);
        assert!(h.iter().all(|&x| x > 0.0));
    }

    #[test]
    fn test_label_range_checked() {
        let md = Metadata::new(vec![0.0, 3.0], None, None, None).unwrap();
        let mut obj = MulticlassSoftmax::new(3).unwrap();
        assert!(obj.init(&md).is_err());
        let md = Metadata::new(vec![0.5], None, None, None).unwrap();
        assert!(obj.init(&md).is_err());
    }

    #[test]
    fn test_boost_from_class_priors() {
        let md = Metadata::new(vec![0.0, 0.0, 0.0, 1.0], None, None, None).unwrap();
        let mut obj = MulticlassSoftmax::new(2).unwrap();
        obj.init(&md).unwrap();
        assert_relative_eq!(obj.boost_from_score(&md, 0), 0.75f64.ln());
        assert_relative_eq!(obj.boost_from_score(&md, 1), 0.25f64.ln());
        assert_eq!(obj.num_model_per_iteration(), 2);
    }
}
