//! LambdaRank objective.
//!
//! Gradients are computed independently per query: within a query every
//! pair of rows with different relevance labels contributes a pairwise
//! logistic gradient weighted by the change in NDCG obtained by swapping
//! the two rows. Rows of different queries are never compared.

use crate::core::error::{LightGBMError, Result};
use crate::core::traits::ObjectiveFunction;
use crate::core::types::{DataSize, Grad, Label, ObjectiveType, Score};
use crate::dataset::Metadata;
use rayon::prelude::*;

/// Discount of a zero-based rank.
#[inline]
pub(crate) fn position_discount(rank: usize) -> f64 {
    1.0 / (rank as f64 + 2.0).log2()
}

/// DCG of the best ordering of `labels`, truncated at `k`.
pub(crate) fn max_dcg_at_k(labels: &[Label], label_gain: &[f64], k: usize) -> f64 {
    let mut sorted: Vec<usize> = labels.iter().map(|&l| l as usize).collect();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted
        .iter()
        .take(k)
        .enumerate()
        .map(|(rank, &label)| label_gain[label] * position_discount(rank))
        .sum()
}

#[derive(Debug, Clone)]
pub struct LambdaRank {
    sigmoid: f64,
    truncation_level: usize,
    norm: bool,
    label_gain: Vec<f64>,
    inverse_max_dcgs: Vec<f64>,
}

impl LambdaRank {
    pub fn new(sigmoid: f64, truncation_level: usize, norm: bool, label_gain: Vec<f64>) -> Result<Self> {
        if sigmoid <= 0.0 {
            return Err(LightGBMError::invalid_parameter(
                "sigmoid",
                sigmoid.to_string(),
                "must be positive",
            ));
        }
        Ok(LambdaRank {
            sigmoid,
            truncation_level,
            norm,
            label_gain,
            inverse_max_dcgs: Vec::new(),
        })
    }

    fn query_gradients(
        &self,
        labels: &[Label],
        scores: &[Score],
        inverse_max_dcg: f64,
        lambdas: &mut [Grad],
        hessians: &mut [Grad],
    ) {
        let cnt = labels.len();
        let mut out_lambdas = vec![0.0f64; cnt];
        let mut out_hessians = vec![0.0f64; cnt];

        let mut sorted: Vec<usize> = (0..cnt).collect();
        sorted.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        let best_score = scores[sorted[0]];
        let worst_score = scores[sorted[cnt - 1]];
        let mut sum_lambdas = 0.0;

        for i in 0..cnt.saturating_sub(1).min(self.truncation_level) {
            for j in (i + 1)..cnt {
                let (a, b) = (sorted[i], sorted[j]);
                if labels[a] == labels[b] {
                    continue;
                }
                let (high_rank, low_rank) = if labels[a] > labels[b] { (i, j) } else { (j, i) };
                let high = sorted[high_rank];
                let low = sorted[low_rank];

                let delta_score = scores[high] - scores[low];
                let dcg_gap = self.label_gain[labels[high] as usize] - self.label_gain[labels[low] as usize];
                let paired_discount = (position_discount(high_rank) - position_discount(low_rank)).abs();
                let mut delta_ndcg = dcg_gap * paired_discount * inverse_max_dcg;
                if self.norm && best_score != worst_score {
                    delta_ndcg /= 0.01 + delta_score.abs();
                }

                let p = 1.0 / (1.0 + (self.sigmoid * delta_score).exp());
                let p_lambda = -self.sigmoid * delta_ndcg * p;
                let p_hessian = self.sigmoid * self.sigmoid * delta_ndcg * p * (1.0 - p);

                out_lambdas[low] -= p_lambda;
                out_hessians[low] += p_hessian;
                out_lambdas[high] += p_lambda;
                out_hessians[high] += p_hessian;
                sum_lambdas -= 2.0 * p_lambda;
            }
        }

        let norm_factor = if self.norm && sum_lambdas > 0.0 {
            (1.0 + sum_lambdas).log2() / sum_lambdas
        } else {
            1.0
        };
        for i in 0..cnt {
            lambdas[i] = (out_lambdas[i] * norm_factor) as Grad;
            hessians[i] = (out_hessians[i] * norm_factor) as Grad;
        }
    }
}

/// Split `buffer` into one mutable slice per query.
pub(crate) fn split_by_queries<'a, T>(mut buffer: &'a mut [T], boundaries: &[DataSize]) -> Vec<&'a mut [T]> {
    let mut parts = Vec::with_capacity(boundaries.len().saturating_sub(1));
    for window in boundaries.windows(2) {
        let len = (window[1] - window[0]) as usize;
        let (head, tail) = buffer.split_at_mut(len);
        parts.push(head);
        buffer = tail;
    }
    parts
}

impl ObjectiveFunction for LambdaRank {
    fn name(&self) -> &str {
        "lambdarank"
    }

    fn init(&mut self, metadata: &Metadata) -> Result<()> {
        let boundaries = metadata.query_boundaries().ok_or_else(|| {
            LightGBMError::objective("Ranking tasks require query information")
        })?;
        let labels = metadata.labels();
        for (i, &label) in labels.iter().enumerate() {
            if label < 0.0 || label.fract() != 0.0 || label as usize >= self.label_gain.len() {
                return Err(LightGBMError::objective(format!(
                    "Ranking labels must be integers in [0, {}), found {} at row {}",
                    self.label_gain.len(),
                    label,
                    i
                )));
            }
        }
        self.inverse_max_dcgs = boundaries
            .windows(2)
            .map(|w| {
                let query = &labels[w[0] as usize..w[1] as usize];
                let max_dcg = max_dcg_at_k(query, &self.label_gain, self.truncation_level);
                if max_dcg > 0.0 {
                    1.0 / max_dcg
                } else {
                    0.0
                }
            })
            .collect();
        Ok(())
    }

    fn get_gradients(
        &self,
        metadata: &Metadata,
        scores: &[Score],
        gradients: &mut [Grad],
        hessians: &mut [Grad],
    ) -> Result<()> {
        let boundaries = metadata.query_boundaries().ok_or_else(|| {
            LightGBMError::objective("Ranking tasks require query information")
        })?;
        let labels = metadata.labels();
        let grad_parts = split_by_queries(gradients, boundaries);
        let hess_parts = split_by_queries(hessians, boundaries);

        grad_parts
            .into_par_iter()
            .zip(hess_parts)
            .enumerate()
            .for_each(|(q, (g, h))| {
                let start = boundaries[q] as usize;
                let end = boundaries[q + 1] as usize;
                self.query_gradients(&labels[start..end], &scores[start..end], self.inverse_max_dcgs[q], g, h);
            });

        if let Some(weights) = metadata.weights() {
            for i in 0..labels.len() {
                gradients[i] *= weights[i];
                hessians[i] *= weights[i];
            }
        }
        Ok(())
    }

    fn objective_type(&self) -> ObjectiveType {
        ObjectiveType::LambdaRank
    }
}
