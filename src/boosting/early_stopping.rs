//! Early stopping controller.
//!
//! Watches the metrics of the first validation set. Every metric keeps its
//! own best value and best round, compared in the metric's own direction.
//! Training halts once `patience` consecutive rounds pass without an
//! improvement: of the first metric when `first_metric_only` is set, of any
//! metric otherwise. The controller only signals; it never removes trees.

use crate::metrics::EvalResult;
use log::info;

/// Configuration for early stopping behavior.
#[derive(Debug, Clone)]
pub struct EarlyStoppingConfig {
    /// Rounds without improvement before stopping
    pub patience: usize,
    /// Minimum change that counts as an improvement
    pub min_delta: f64,
    /// Only the first metric can reset patience
    pub first_metric_only: bool,
}

/// Outcome of one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyStoppingDecision {
    Continue,
    /// Stop; the best round of the designated metric is given (1-based).
    Stop { best_iteration: usize },
}

/// Whether `value` improves on `best` by more than `min_delta`.
pub fn is_improvement(value: f64, best: f64, higher_better: bool, min_delta: f64) -> bool {
    if value.is_nan() {
        return false;
    }
    if best.is_nan() {
        return true;
    }
    if higher_better {
        value > best + min_delta
    } else {
        value < best - min_delta
    }
}

#[derive(Debug, Clone)]
struct MetricTrack {
    best_value: f64,
    best_iteration: usize,
}

/// Tracks validation metrics and determines when to stop training.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    config: EarlyStoppingConfig,
    tracks: Vec<MetricTrack>,
    /// Results of every metric at the best round of the first metric
    best_results: Vec<EvalResult>,
    stopped: bool,
}

impl EarlyStopping {
    pub fn new(config: EarlyStoppingConfig) -> Self {
        EarlyStopping {
            config,
            tracks: Vec::new(),
            best_results: Vec::new(),
            stopped: false,
        }
    }

    /// Feed the results of round `iteration` (1-based) for the designated
    /// evaluation set, in metric order.
    pub fn update(&mut self, iteration: usize, results: &[EvalResult]) -> EarlyStoppingDecision {
        if results.is_empty() {
            return EarlyStoppingDecision::Continue;
        }
        if self.tracks.is_empty() {
            self.tracks = results
                .iter()
                .map(|_| MetricTrack {
                    best_value: f64::NAN,
                    best_iteration: 0,
                })
                .collect();
        }

        for (i, (track, result)) in self.tracks.iter_mut().zip(results).enumerate() {
            let first_improvement = track.best_iteration == 0 && !result.value.is_nan();
            if first_improvement
                || is_improvement(result.value, track.best_value, result.higher_better, self.config.min_delta)
            {
                track.best_value = result.value;
                track.best_iteration = iteration;
                if i == 0 {
                    self.best_results = results.to_vec();
                }
            }
        }

        let last_improvement = if self.config.first_metric_only {
            self.tracks[0].best_iteration
        } else {
            self.tracks.iter().map(|t| t.best_iteration).max().unwrap_or(0)
        };

        if iteration.saturating_sub(last_improvement) >= self.config.patience {
            self.stopped = true;
            let best_iteration = self.best_iteration();
            info!(
                "Early stopping, best iteration is: [{}]\t{}",
                best_iteration,
                self.best_results
                    .iter()
                    .map(EvalResult::to_log_string)
                    .collect::<Vec<_>>()
                    .join("\t")
            );
            return EarlyStoppingDecision::Stop { best_iteration };
        }
        EarlyStoppingDecision::Continue
    }

    /// Best round of the designated (first) metric, 1-based; 0 before any
    /// finite value was seen.
    pub fn best_iteration(&self) -> usize {
        self.tracks.first().map_or(0, |t| t.best_iteration)
    }

    /// Every metric of the watched set at the best round.
    pub fn best_results(&self) -> &[EvalResult] {
        &self.best_results
    }

    pub fn should_stop(&self) -> bool {
        self.stopped
    }

    pub fn config(&self) -> &EarlyStoppingConfig {
        &self.config
    }
}
