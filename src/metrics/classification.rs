//! Binary and multiclass classification metrics.
//!
//! Raw scores are converted with the objective's output transform first.
//! With an identity transform (custom objectives) the scores are read as
//! probabilities directly.

use crate::core::constants::K_EPSILON;
use crate::core::error::{LightGBMError, Result};
use crate::core::traits::OutputTransform;
use crate::core::types::{MetricKind, Score};
use crate::dataset::Metadata;
use crate::metrics::{weighted_mean_loss, Metric};

fn check_len(metadata: &Metadata, scores: &[Score], num_class: usize) -> Result<()> {
    let expected = metadata.num_data() * num_class;
    if scores.len() != expected {
        return Err(LightGBMError::dimension_mismatch(
            format!("{} scores", expected),
            format!("{} scores", scores.len()),
        ));
    }
    Ok(())
}

/// `binary_logloss` or `binary_error`.
#[derive(Debug, Clone)]
pub struct BinaryMetric {
    kind: MetricKind,
    transform: OutputTransform,
}

impl BinaryMetric {
    pub fn new(kind: MetricKind, transform: OutputTransform) -> Self {
        BinaryMetric { kind, transform }
    }

    #[inline]
    fn probability(&self, score: f64) -> f64 {
        match self.transform {
            OutputTransform::Sigmoid { sigmoid } => 1.0 / (1.0 + (-sigmoid * score).exp()),
            _ => score,
        }
    }
}

impl Metric for BinaryMetric {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn higher_better(&self) -> bool {
        false
    }

    fn eval(&self, metadata: &Metadata, scores: &[Score]) -> Result<f64> {
        check_len(metadata, scores, 1)?;
        let labels = metadata.labels();
        let value = match self.kind {
            MetricKind::BinaryLogloss => weighted_mean_loss(metadata, |i| {
                let p = self.probability(scores[i]);
                if labels[i] > 0.0 {
                    -p.max(K_EPSILON).ln()
                } else {
                    -(1.0 - p).max(K_EPSILON).ln()
                }
            }),
            _ => weighted_mean_loss(metadata, |i| {
                let predicted_pos = self.probability(scores[i]) > 0.5;
                if predicted_pos == (labels[i] > 0.0) {
                    0.0
                } else {
                    1.0
                }
            }),
        };
        Ok(value)
    }

    fn box_clone(&self) -> Box<dyn Metric> {
        Box::new(self.clone())
    }
}

/// Weighted area under the ROC curve. Tied scores count half.
///
/// A dataset with only one class scores 1.
#[derive(Debug, Clone, Default)]
pub struct AucMetric;

impl AucMetric {
    pub fn new() -> Self {
        AucMetric
    }
}

impl Metric for AucMetric {
    fn name(&self) -> &str {
        "auc"
    }

    fn higher_better(&self) -> bool {
        true
    }

    fn eval(&self, metadata: &Metadata, scores: &[Score]) -> Result<f64> {
        check_len(metadata, scores, 1)?;
        let labels = metadata.labels();
        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        let mut accum = 0.0;
        let mut sum_pos = 0.0;
        let mut sum_neg = 0.0;
        let mut cur_pos = 0.0;
        let mut cur_neg = 0.0;
        let mut threshold = f64::NAN;
        for &i in &order {
            if scores[i] != threshold {
                accum += cur_neg * (cur_pos * 0.5 + sum_pos);
                sum_pos += cur_pos;
                sum_neg += cur_neg;
                cur_pos = 0.0;
                cur_neg = 0.0;
                threshold = scores[i];
            }
            let w = metadata.weight(i);
            if labels[i] > 0.0 {
                cur_pos += w;
            } else {
                cur_neg += w;
            }
        }
        accum += cur_neg * (cur_pos * 0.5 + sum_pos);
        sum_pos += cur_pos;
        sum_neg += cur_neg;

        if sum_pos <= 0.0 || sum_neg <= 0.0 {
            return Ok(1.0);
        }
        Ok(accum / (sum_pos * sum_neg))
    }

    fn box_clone(&self) -> Box<dyn Metric> {
        Box::new(self.clone())
    }
}

/// `multi_logloss` or `multi_error`.
///
/// A row counts as an error when more than `top_k` classes score at least
/// as high as the true class.
#[derive(Debug, Clone)]
pub struct MulticlassMetric {
    kind: MetricKind,
    num_class: usize,
    top_k: usize,
    transform: OutputTransform,
    name: String,
}

impl MulticlassMetric {
    pub fn new(kind: MetricKind, num_class: usize, top_k: usize, transform: OutputTransform) -> Result<Self> {
        if num_class < 2 {
            return Err(LightGBMError::metric(format!(
                "{} needs num_class >= 2, got {}",
                kind, num_class
            )));
        }
        let top_k = top_k.max(1);
        let name = if kind == MetricKind::MultiError && top_k > 1 {
            format!("multi_error@{}", top_k)
        } else {
            kind.as_str().to_string()
        };
        Ok(MulticlassMetric {
            kind,
            num_class,
            top_k,
            transform,
            name,
        })
    }
}

impl Metric for MulticlassMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn higher_better(&self) -> bool {
        false
    }

    fn eval(&self, metadata: &Metadata, scores: &[Score]) -> Result<f64> {
        check_len(metadata, scores, self.num_class)?;
        let num_data = metadata.num_data();
        let labels = metadata.labels();

        let mut probs = vec![0.0; scores.len()];
        let mut raw = vec![0.0; self.num_class];
        let mut row = vec![0.0; self.num_class];
        for i in 0..num_data {
            for k in 0..self.num_class {
                raw[k] = scores[k * num_data + i];
            }
            match self.transform {
                OutputTransform::Identity => row.copy_from_slice(&raw),
                transform => transform.apply(&raw, &mut row),
            }
            for k in 0..self.num_class {
                probs[i * self.num_class + k] = row[k];
            }
        }

        let value = weighted_mean_loss(metadata, |i| {
            let row = &probs[i * self.num_class..(i + 1) * self.num_class];
            let label = labels[i] as usize;
            let Some(&p_label) = row.get(label) else {
                return f64::NAN;
            };
            match self.kind {
                MetricKind::MultiLogloss => -p_label.max(K_EPSILON).ln(),
                _ => {
                    let num_larger = row.iter().filter(|&&p| p >= p_label).count();
                    if num_larger > self.top_k {
                        1.0
                    } else {
                        0.0
                    }
                }
            }
        });
        Ok(value)
    }

    fn box_clone(&self) -> Box<dyn Metric> {
        Box::new(self.clone())
    }
}
