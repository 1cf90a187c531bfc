//! NDCG for ranking.

use crate::core::error::{LightGBMError, Result};
use crate::core::types::{Label, Score};
use crate::dataset::Metadata;
use crate::metrics::Metric;
use crate::objective::ranking::{max_dcg_at_k, position_discount};
use rayon::prelude::*;

/// DCG of the first `k` rows of a query when ordered by descending score.
pub(crate) fn dcg_at_k(labels: &[Label], scores: &[Score], label_gain: &[f64], k: usize) -> f64 {
    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order
        .iter()
        .take(k)
        .enumerate()
        .map(|(rank, &i)| label_gain[labels[i] as usize] * position_discount(rank))
        .sum()
}

/// NDCG at one truncation position, averaged over queries.
///
/// Queries whose ideal DCG is zero (no relevant rows) score 1. With row
/// weights, every query is weighted by the mean weight of its rows.
#[derive(Debug, Clone)]
pub struct NdcgMetric {
    k: usize,
    label_gain: Vec<f64>,
    name: String,
    inverse_max_dcgs: Vec<f64>,
}

impl NdcgMetric {
    pub fn new(k: usize, label_gain: Vec<f64>) -> Self {
        NdcgMetric {
            k,
            label_gain,
            name: format!("ndcg@{}", k),
            inverse_max_dcgs: Vec::new(),
        }
    }
}

impl Metric for NdcgMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn higher_better(&self) -> bool {
        true
    }

    fn init(&mut self, metadata: &Metadata) -> Result<()> {
        let boundaries = metadata
            .query_boundaries()
            .ok_or_else(|| LightGBMError::metric("The NDCG metric requires query information"))?;
        let labels = metadata.labels();
        if let Some(&bad) = labels
            .iter()
            .find(|&&l| l < 0.0 || l as usize >= self.label_gain.len())
        {
            return Err(LightGBMError::metric(format!(
                "Label {} is outside the label_gain table of size {}",
                bad,
                self.label_gain.len()
            )));
        }
        self.inverse_max_dcgs = boundaries
            .windows(2)
            .map(|w| {
                let max_dcg = max_dcg_at_k(&labels[w[0] as usize..w[1] as usize], &self.label_gain, self.k);
                if max_dcg > 0.0 {
                    1.0 / max_dcg
                } else {
                    -1.0
                }
            })
            .collect();
        Ok(())
    }

    fn eval(&self, metadata: &Metadata, scores: &[Score]) -> Result<f64> {
        let boundaries = metadata
            .query_boundaries()
            .ok_or_else(|| LightGBMError::metric("The NDCG metric requires query information"))?;
        if self.inverse_max_dcgs.len() + 1 != boundaries.len() {
            return Err(LightGBMError::metric("NDCG metric was not initialised for this dataset"));
        }
        let labels = metadata.labels();

        let (sum, sum_weights) = (0..self.inverse_max_dcgs.len())
            .into_par_iter()
            .map(|q| {
                let start = boundaries[q] as usize;
                let end = boundaries[q + 1] as usize;
                let weight = match metadata.weights() {
                    Some(w) if end > start => {
                        w[start..end].iter().map(|&x| x as f64).sum::<f64>() / (end - start) as f64
                    }
                    _ => 1.0,
                };
                let inverse = self.inverse_max_dcgs[q];
                let ndcg = if inverse < 0.0 {
                    1.0
                } else {
                    dcg_at_k(&labels[start..end], &scores[start..end], &self.label_gain, self.k) * inverse
                };
                (ndcg * weight, weight)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .fold((0.0, 0.0), |acc, (v, w)| (acc.0 + v, acc.1 + w));
        Ok(sum / sum_weights)
    }

    fn box_clone(&self) -> Box<dyn Metric> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::default_label_gain;
    use approx::assert_relative_eq;

    fn metric(k: usize, md: &Metadata) -> NdcgMetric {
        let mut m = NdcgMetric::new(k, default_label_gain());
        m.init(md).unwrap();
        m
    }

    #[test]
    fn test_perfect_order_scores_one() {
        let md = Metadata::new(vec![2.0, 1.0, 0.0], None, None, Some(vec![3])).unwrap();
        let value = metric(3, &md).eval(&md, &[3.0, 2.0, 1.0]).unwrap();
        assert_relative_eq!(value, 1.0);
    }

    #[test]
    fn test_swapped_top_two() {
        let md = Metadata::new(vec![1.0, 0.0], None, None, Some(vec![2])).unwrap();
        let value = metric(2, &md).eval(&md, &[0.0, 1.0]).unwrap();
        assert_relative_eq!(value, 1.0 / 3.0f64.log2());
    }

    #[test]
    fn test_irrelevant_query_counts_as_one() {
        let md = Metadata::new(vec![0.0, 0.0, 1.0, 0.0], None, None, Some(vec![2, 2])).unwrap();
        let value = metric(1, &md).eval(&md, &[0.5, 0.1, 0.0, 1.0]).unwrap();
        assert_relative_eq!(value, 0.5);
    }

    #[test]
    fn test_requires_queries() {
        let md = Metadata::new(vec![0.0, 1.0], None, None, None).unwrap();
        let mut m = NdcgMetric::new(1, default_label_gain());
        assert!(m.init(&md).is_err());
    }
}
