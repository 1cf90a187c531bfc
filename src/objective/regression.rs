//! Regression objectives: L2, L1, Huber, quantile and MAPE.
//!
//! The absolute-error family (L1, quantile, MAPE) has a zero hessian almost
//! everywhere, so trees are grown on unit hessians and every leaf output is
//! afterwards replaced by a (weighted) percentile of the residuals of the
//! rows in the leaf.

use crate::core::error::{LightGBMError, Result};
use crate::core::traits::ObjectiveFunction;
use crate::core::types::{DataSize, Grad, Label, ObjectiveType, Score};
use crate::dataset::Metadata;

fn check_labels(name: &str, labels: &[Label]) -> Result<()> {
    if let Some(i) = labels.iter().position(|l| !l.is_finite()) {
        return Err(LightGBMError::objective(format!(
            "{} objective requires finite labels, found {} at row {}",
            name, labels[i], i
        )));
    }
    Ok(())
}

/// Weighted mean of the labels.
fn weighted_mean(metadata: &Metadata) -> f64 {
    let labels = metadata.labels();
    match metadata.weights() {
        Some(weights) => {
            let mut sum = 0.0;
            let mut sum_w = 0.0;
            for (&l, &w) in labels.iter().zip(weights) {
                sum += l as f64 * w as f64;
                sum_w += w as f64;
            }
            if sum_w > 0.0 {
                sum / sum_w
            } else {
                0.0
            }
        }
        None => labels.iter().map(|&l| l as f64).sum::<f64>() / labels.len().max(1) as f64,
    }
}

/// Percentile of `values` at level `alpha`.
pub(crate) fn percentile(values: &[f64], alpha: f64) -> f64 {
    weighted_percentile(values, &vec![1.0; values.len()], alpha)
}

/// Weighted percentile of `values` at level `alpha`.
///
/// Each sorted value sits at the midpoint of its weight in the cumulative
/// distribution; levels between two midpoints interpolate linearly and
/// levels outside them clamp to the extreme values.
pub(crate) fn weighted_percentile(values: &[f64], weights: &[f64], alpha: f64) -> f64 {
    match values.len() {
        0 => return 0.0,
        1 => return values[0],
        _ => {}
    }
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return values[order[order.len() / 2]];
    }
    let mut acc = 0.0;
    let mut prev: Option<(f64, f64)> = None;
    for &i in &order {
        let position = (acc + weights[i] / 2.0) / total;
        acc += weights[i];
        if position >= alpha {
            return match prev {
                None => values[i],
                Some((prev_position, prev_value)) if position > prev_position => {
                    let t = (alpha - prev_position) / (position - prev_position);
                    prev_value + t * (values[i] - prev_value)
                }
                Some(_) => values[i],
            };
        }
        prev = Some((position, values[i]));
    }
    values[order[order.len() - 1]]
}

/// Percentile of the labels, weighted when the dataset carries weights.
fn label_percentile(metadata: &Metadata, alpha: f64, extra_weights: Option<&[f64]>) -> f64 {
    let labels: Vec<f64> = metadata.labels().iter().map(|&l| l as f64).collect();
    match (metadata.weights(), extra_weights) {
        (None, None) => percentile(&labels, alpha),
        (weights, extra) => {
            let w: Vec<f64> = (0..labels.len())
                .map(|i| {
                    weights.map_or(1.0, |w| w[i] as f64) * extra.map_or(1.0, |e| e[i])
                })
                .collect();
            weighted_percentile(&labels, &w, alpha)
        }
    }
}

/// Percentile of `label - score` over the rows of one leaf.
fn residual_percentile(
    metadata: &Metadata,
    scores: &[Score],
    rows: &[DataSize],
    alpha: f64,
    extra_weights: Option<&[f64]>,
) -> f64 {
    let labels = metadata.labels();
    let residuals: Vec<f64> = rows
        .iter()
        .map(|&r| labels[r as usize] as f64 - scores[r as usize])
        .collect();
    match (metadata.weights(), extra_weights) {
        (None, None) => percentile(&residuals, alpha),
        (weights, extra) => {
            let w: Vec<f64> = rows
                .iter()
                .map(|&r| {
                    let r = r as usize;
                    weights.map_or(1.0, |w| w[r] as f64) * extra.map_or(1.0, |e| e[r])
                })
                .collect();
            weighted_percentile(&residuals, &w, alpha)
        }
    }
}

/// Fill gradients from a per-row closure, scaling by row weights.
fn fill_weighted<F>(metadata: &Metadata, scores: &[Score], gradients: &mut [Grad], hessians: &mut [Grad], per_row: F)
where
    F: Fn(usize, f64, f64) -> (f64, f64),
{
    let labels = metadata.labels();
    let weights = metadata.weights();
    for i in 0..labels.len() {
        let (g, h) = per_row(i, scores[i], labels[i] as f64);
        let w = weights.map_or(1.0, |w| w[i] as f64);
        gradients[i] = (g * w) as Grad;
        hessians[i] = (h * w) as Grad;
    }
}

/// Squared loss.
#[derive(Debug, Clone, Default)]
pub struct RegressionL2;

impl ObjectiveFunction for RegressionL2 {
    fn name(&self) -> &str {
        "regression"
    }

    fn init(&mut self, metadata: &Metadata) -> Result<()> {
        check_labels(self.name(), metadata.labels())
    }

    fn get_gradients(&self, metadata: &Metadata, scores: &[Score], gradients: &mut [Grad], hessians: &mut [Grad]) -> Result<()> {
        fill_weighted(metadata, scores, gradients, hessians, |_, s, y| (s - y, 1.0));
        Ok(())
    }

    fn boost_from_score(&self, metadata: &Metadata, _class_id: usize) -> f64 {
        weighted_mean(metadata)
    }

    fn objective_type(&self) -> ObjectiveType {
        ObjectiveType::Regression
    }
}

/// Absolute loss.
#[derive(Debug, Clone, Default)]
pub struct RegressionL1;

impl ObjectiveFunction for RegressionL1 {
    fn name(&self) -> &str {
        "regression_l1"
    }

    fn init(&mut self, metadata: &Metadata) -> Result<()> {
        check_labels(self.name(), metadata.labels())
    }

    fn get_gradients(&self, metadata: &Metadata, scores: &[Score], gradients: &mut [Grad], hessians: &mut [Grad]) -> Result<()> {
        fill_weighted(metadata, scores, gradients, hessians, |_, s, y| {
            let diff = s - y;
            (if diff >= 0.0 { 1.0 } else { -1.0 }, 1.0)
        });
        Ok(())
    }

    fn boost_from_score(&self, metadata: &Metadata, _class_id: usize) -> f64 {
        label_percentile(metadata, 0.5, None)
    }

    fn is_renew_tree_output(&self) -> bool {
        true
    }

    fn renew_tree_output(&self, metadata: &Metadata, scores: &[Score], leaf_rows: &[DataSize], current_output: f64) -> f64 {
        if leaf_rows.is_empty() {
            return current_output;
        }
        residual_percentile(metadata, scores, leaf_rows, 0.5, None)
    }

    fn objective_type(&self) -> ObjectiveType {
        ObjectiveType::RegressionL1
    }
}

/// Huber loss with threshold `alpha`.
#[derive(Debug, Clone)]
pub struct Huber {
    alpha: f64,
}

impl Huber {
    pub fn new(alpha: f64) -> Self {
        Huber { alpha }
    }
}

impl ObjectiveFunction for Huber {
    fn name(&self) -> &str {
        "huber"
    }

    fn init(&mut self, metadata: &Metadata) -> Result<()> {
        check_labels(self.name(), metadata.labels())
    }

    fn get_gradients(&self, metadata: &Metadata, scores: &[Score], gradients: &mut [Grad], hessians: &mut [Grad]) -> Result<()> {
        let alpha = self.alpha;
        fill_weighted(metadata, scores, gradients, hessians, |_, s, y| {
            let diff = s - y;
            if diff.abs() <= alpha {
                (diff, 1.0)
            } else {
                (alpha.copysign(diff), 1.0)
            }
        });
        Ok(())
    }

    fn boost_from_score(&self, metadata: &Metadata, _class_id: usize) -> f64 {
        weighted_mean(metadata)
    }

    fn objective_type(&self) -> ObjectiveType {
        ObjectiveType::Huber
    }
}

/// Pinball loss at level `alpha`.
#[derive(Debug, Clone)]
pub struct Quantile {
    alpha: f64,
}

impl Quantile {
    pub fn new(alpha: f64) -> Self {
        Quantile { alpha }
    }
}

impl ObjectiveFunction for Quantile {
    fn name(&self) -> &str {
        "quantile"
    }

    fn init(&mut self, metadata: &Metadata) -> Result<()> {
        check_labels(self.name(), metadata.labels())
    }

    fn get_gradients(&self, metadata: &Metadata, scores: &[Score], gradients: &mut [Grad], hessians: &mut [Grad]) -> Result<()> {
        let alpha = self.alpha;
        fill_weighted(metadata, scores, gradients, hessians, |_, s, y| {
            if s - y >= 0.0 {
                (1.0 - alpha, 1.0)
            } else {
                (-alpha, 1.0)
            }
        });
        Ok(())
    }

    fn boost_from_score(&self, metadata: &Metadata, _class_id: usize) -> f64 {
        label_percentile(metadata, self.alpha, None)
    }

    fn is_renew_tree_output(&self) -> bool {
        true
    }

    fn renew_tree_output(&self, metadata: &Metadata, scores: &[Score], leaf_rows: &[DataSize], current_output: f64) -> f64 {
        if leaf_rows.is_empty() {
            return current_output;
        }
        residual_percentile(metadata, scores, leaf_rows, self.alpha, None)
    }

    fn objective_type(&self) -> ObjectiveType {
        ObjectiveType::Quantile
    }
}

/// Mean absolute percentage error; every row is weighted by
/// `1 / max(1, |label|)`.
#[derive(Debug, Clone, Default)]
pub struct Mape {
    label_weights: Vec<f64>,
}

impl ObjectiveFunction for Mape {
    fn name(&self) -> &str {
        "mape"
    }

    fn init(&mut self, metadata: &Metadata) -> Result<()> {
        check_labels(self.name(), metadata.labels())?;
        if metadata.labels().iter().any(|l| l.abs() < 1.0) {
            log::warn!("Some labels of the mape objective are close to zero; their weight is capped at 1");
        }
        self.label_weights = metadata
            .labels()
            .iter()
            .map(|&l| 1.0 / (l.abs() as f64).max(1.0))
            .collect();
        Ok(())
    }

    fn get_gradients(&self, metadata: &Metadata, scores: &[Score], gradients: &mut [Grad], hessians: &mut [Grad]) -> Result<()> {
        let label_weights = &self.label_weights;
        fill_weighted(metadata, scores, gradients, hessians, |i, s, y| {
            let sign = if s - y >= 0.0 { 1.0 } else { -1.0 };
            (sign * label_weights[i], 1.0)
        });
        Ok(())
    }

    fn boost_from_score(&self, metadata: &Metadata, _class_id: usize) -> f64 {
        label_percentile(metadata, 0.5, Some(&self.label_weights))
    }

    fn is_renew_tree_output(&self) -> bool {
        true
    }

    fn renew_tree_output(&self, metadata: &Metadata, scores: &[Score], leaf_rows: &[DataSize], current_output: f64) -> f64 {
        if leaf_rows.is_empty() {
            return current_output;
        }
        residual_percentile(metadata, scores, leaf_rows, 0.5, Some(&self.label_weights))
    }

    fn objective_type(&self) -> ObjectiveType {
        ObjectiveType::Mape
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn metadata(labels: Vec<f32>, weights: Option<Vec<f32>>) -> Metadata {
        Metadata::new(labels, weights, None, None).unwrap()
    }

    #[test]
    fn test_l2_gradients_and_init() {
        let md = metadata(vec![1.0, 2.0, 6.0], None);
        let mut obj = RegressionL2;
        obj.init(&md).unwrap();
        let mut g = vec![0.0; 3];
        let mut h = vec![0.0; 3];
        obj.get_gradients(&md, &[0.0, 2.0, 7.0], &mut g, &mut h).unwrap();
        assert_eq!(g, vec![-1.0, 0.0, 1.0]);
        assert_eq!(h, vec![1.0; 3]);
        assert_relative_eq!(obj.boost_from_score(&md, 0), 3.0);
    }

    #[test]
    fn test_weighted_l2() {
        let md = metadata(vec![0.0, 10.0], Some(vec![3.0, 1.0]));
        let obj = RegressionL2;
        assert_relative_eq!(obj.boost_from_score(&md, 0), 2.5);
        let mut g = vec![0.0; 2];
        let mut h = vec![0.0; 2];
        obj.get_gradients(&md, &[1.0, 1.0], &mut g, &mut h).unwrap();
        assert_eq!(g, vec![3.0, -9.0]);
        assert_eq!(h, vec![3.0, 1.0]);
    }

    #[test]
    fn test_huber_clips_gradient() {
        let md = metadata(vec![0.0, 0.0], None);
        let obj = Huber::new(1.0);
        let mut g = vec![0.0; 2];
        let mut h = vec![0.0; 2];
        obj.get_gradients(&md, &[0.5, -5.0], &mut g, &mut h).unwrap();
        assert_eq!(g, vec![0.5, -1.0]);
    }

    #[test]
    fn test_quantile_gradients() {
        let md = metadata(vec![1.0, 1.0], None);
        let obj = Quantile::new(0.9);
        let mut g = vec![0.0; 2];
        let mut h = vec![0.0; 2];
        obj.get_gradients(&md, &[2.0, 0.0], &mut g, &mut h).unwrap();
        assert_relative_eq!(g[0] as f64, 0.1, epsilon = 1e-6);
        assert_relative_eq!(g[1] as f64, -0.9, epsilon = 1e-6);
    }

    #[test]
    fn test_l1_renews_with_median() {
        let md = metadata(vec![1.0, 2.0, 3.0, 100.0, 5.0], None);
        let obj = RegressionL1;
        let scores = vec![0.0; 5];
        let out = obj.renew_tree_output(&md, &scores, &[0, 1, 2], 42.0);
        assert_relative_eq!(out, 2.0);
        assert_relative_eq!(obj.boost_from_score(&md, 0), 3.0);
    }

    #[test]
    fn test_percentile_helpers() {
        assert_relative_eq!(percentile(&[5.0, 1.0, 3.0], 0.5), 3.0);
        assert_relative_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], 0.5), 2.5);
        assert_relative_eq!(weighted_percentile(&[1.0, 2.0, 3.0], &[1.0, 1.0, 1.0], 0.5), 2.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_mape_label_weights() {
        let md = metadata(vec![10.0, 0.5], None);
        let mut obj = Mape::default();
        obj.init(&md).unwrap();
        let mut g = vec![0.0; 2];
        let mut h = vec![0.0; 2];
        obj.get_gradients(&md, &[12.0, 0.0], &mut g, &mut h).unwrap();
        assert_relative_eq!(g[0] as f64, 0.1, epsilon = 1e-6);
        assert_relative_eq!(g[1] as f64, -1.0);
    }

    #[test]
    fn test_non_finite_labels_rejected() {
        assert!(check_labels("regression", &[1.0, f32::INFINITY]).is_err());
        assert!(check_labels("regression", &[1.0, 2.0]).is_ok());
    }
}
