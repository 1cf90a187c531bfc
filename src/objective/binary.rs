//! Logistic loss for binary classification.

use crate::core::constants::K_EPSILON;
use crate::core::error::{LightGBMError, Result};
use crate::core::traits::{ObjectiveFunction, OutputTransform};
use crate::core::types::{Grad, ObjectiveType, Score};
use crate::dataset::Metadata;
use log::{info, warn};

/// Binary log loss with labels in `{0, 1}`.
///
/// `is_unbalance` reweights the minority class by the class ratio and
/// `scale_pos_weight` multiplies the weight of positive rows.
#[derive(Debug, Clone)]
pub struct BinaryLogloss {
    sigmoid: f64,
    is_unbalance: bool,
    scale_pos_weight: f64,
    /// Weights of negative and positive labels
    label_weights: [f64; 2],
}

impl BinaryLogloss {
    pub fn new(sigmoid: f64, is_unbalance: bool, scale_pos_weight: f64) -> Result<Self> {
        if sigmoid <= 0.0 {
            return Err(LightGBMError::invalid_parameter(
                "sigmoid",
                sigmoid.to_string(),
                "must be positive",
            ));
        }
        Ok(BinaryLogloss {
            sigmoid,
            is_unbalance,
            scale_pos_weight,
            label_weights: [1.0, 1.0],
        })
    }

    pub fn label_weights(&self) -> [f64; 2] {
        self.label_weights
    }
}

impl ObjectiveFunction for BinaryLogloss {
    fn name(&self) -> &str {
        "binary"
    }

    fn init(&mut self, metadata: &Metadata) -> Result<()> {
        let mut num_pos = 0usize;
        let mut num_neg = 0usize;
        for (i, &label) in metadata.labels().iter().enumerate() {
            if label == 1.0 {
                num_pos += 1;
            } else if label == 0.0 {
                num_neg += 1;
            } else {
                return Err(LightGBMError::objective(format!(
                    "Binary labels must be 0 or 1, found {} at row {}",
                    label, i
                )));
            }
        }
        if num_pos == 0 || num_neg == 0 {
            warn!("Contains only one class");
        }
        info!("Number of positive: {}, number of negative: {}", num_pos, num_neg);

        self.label_weights = [1.0, 1.0];
        if self.is_unbalance && num_pos > 0 && num_neg > 0 {
            if num_pos > num_neg {
                self.label_weights[0] = num_pos as f64 / num_neg as f64;
            } else {
                self.label_weights[1] = num_neg as f64 / num_pos as f64;
            }
        }
        self.label_weights[1] *= self.scale_pos_weight;
        Ok(())
    }

    fn get_gradients(
        &self,
        metadata: &Metadata,
        scores: &[Score],
        gradients: &mut [Grad],
        hessians: &mut [Grad],
    ) -> Result<()> {
        let labels = metadata.labels();
        let weights = metadata.weights();
        for i in 0..labels.len() {
            let is_pos = labels[i] > 0.0;
            let label = if is_pos { 1.0 } else { -1.0 };
            let label_weight = self.label_weights[usize::from(is_pos)];
            let response = -label * self.sigmoid / (1.0 + (label * self.sigmoid * scores[i]).exp());
            let abs_response = response.abs();
            let w = label_weight * weights.map_or(1.0, |w| w[i] as f64);
            gradients[i] = (response * w) as Grad;
            hessians[i] = (abs_response * (self.sigmoid - abs_response) * w) as Grad;
        }
        Ok(())
    }

    /// Log-odds of the weighted positive rate.
    fn boost_from_score(&self, metadata: &Metadata, _class_id: usize) -> f64 {
        let labels = metadata.labels();
        let mut sum_pos = 0.0;
        for (i, &l) in labels.iter().enumerate() {
            if l > 0.0 {
                sum_pos += metadata.weight(i);
            }
        }
        let total = metadata.sum_weights();
        if total <= 0.0 {
            return 0.0;
        }
        let pavg = (sum_pos / total).clamp(K_EPSILON, 1.0 - K_EPSILON);
        let init = (pavg / (1.0 - pavg)).ln() / self.sigmoid;
        info!("[binary:BoostFromScore]: pavg={:.6} -> initscore={:.6}", pavg, init);
        init
    }

    fn output_transform(&self) -> OutputTransform {
        OutputTransform::Sigmoid {
            sigmoid: self.sigmoid,
        }
    }

    fn objective_type(&self) -> ObjectiveType {
        ObjectiveType::Binary
    }
}
