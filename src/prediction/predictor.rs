//! Core prediction engine.
//!
//! A [`Predictor`] binds a [`Booster`] to a [`PredictConfig`] and produces
//! one of four outputs for a feature matrix:
//!
//! | mode | shape |
//! |---|---|
//! | transformed or raw scores | `n × num_class` |
//! | leaf indices | `n × (iterations · num_class)` |
//! | feature contributions | `n × ((num_features + 1) · num_class)` |
//!
//! Contribution blocks hold one column per feature followed by the expected
//! value; each block sums to the raw score of its class.

use crate::boosting::Booster;
use crate::core::error::{LightGBMError, Result};
use crate::prediction::early_stopping::{
    create_for_objective, PredictionEarlyStopConfig, PredictionEarlyStopInstance,
};
use ndarray::{Array2, ArrayView2, Zip};
use serde::{Deserialize, Serialize};

/// Configuration for prediction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictConfig {
    /// Return untransformed scores
    pub raw_score: bool,
    /// Return the leaf index reached in every tree
    pub pred_leaf: bool,
    /// Return TreeSHAP feature contributions
    pub pred_contrib: bool,
    pub start_iteration: usize,
    /// Rounds to use; `None` selects the best iteration when known
    pub num_iteration: Option<usize>,
    /// Accept feature matrices whose column count differs from training
    pub predict_disable_shape_check: bool,
    pub pred_early_stop: bool,
    pub pred_early_stop_freq: usize,
    pub pred_early_stop_margin: f64,
}

impl Default for PredictConfig {
    fn default() -> Self {
        let early_stop = PredictionEarlyStopConfig::default();
        PredictConfig {
            raw_score: false,
            pred_leaf: false,
            pred_contrib: false,
            start_iteration: 0,
            num_iteration: None,
            predict_disable_shape_check: false,
            pred_early_stop: false,
            pred_early_stop_freq: early_stop.round_period,
            pred_early_stop_margin: early_stop.margin_threshold,
        }
    }
}

impl PredictConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw_score(mut self, raw_score: bool) -> Self {
        self.raw_score = raw_score;
        self
    }

    pub fn with_pred_leaf(mut self, pred_leaf: bool) -> Self {
        self.pred_leaf = pred_leaf;
        self
    }

    pub fn with_pred_contrib(mut self, pred_contrib: bool) -> Self {
        self.pred_contrib = pred_contrib;
        self
    }

    pub fn with_iteration_range(mut self, start_iteration: usize, num_iteration: Option<usize>) -> Self {
        self.start_iteration = start_iteration;
        self.num_iteration = num_iteration;
        self
    }

    pub fn with_disable_shape_check(mut self, disable: bool) -> Self {
        self.predict_disable_shape_check = disable;
        self
    }

    pub fn with_early_stop(mut self, freq: usize, margin: f64) -> Self {
        self.pred_early_stop = true;
        self.pred_early_stop_freq = freq;
        self.pred_early_stop_margin = margin;
        self
    }
}

/// Prediction engine over one model.
#[derive(Debug)]
pub struct Predictor<'m> {
    booster: &'m Booster,
    config: PredictConfig,
    start_iteration: usize,
    end_iteration: usize,
    early_stop: Option<PredictionEarlyStopInstance>,
}

impl<'m> Predictor<'m> {
    pub fn new(booster: &'m Booster, config: PredictConfig) -> Result<Self> {
        if config.pred_leaf && config.pred_contrib {
            return Err(LightGBMError::config(
                "pred_leaf and pred_contrib cannot be requested together",
            ));
        }
        let (start_iteration, end_iteration) =
            booster.iteration_range(config.start_iteration, config.num_iteration);

        let early_stop = if config.pred_early_stop && !config.pred_leaf && !config.pred_contrib {
            let es_config = PredictionEarlyStopConfig::new()
                .with_margin_threshold(config.pred_early_stop_margin)
                .with_round_period(config.pred_early_stop_freq);
            Some(create_for_objective(booster.objective(), &es_config)?)
        } else {
            None
        };

        Ok(Predictor {
            booster,
            config,
            start_iteration,
            end_iteration,
            early_stop,
        })
    }

    pub fn config(&self) -> &PredictConfig {
        &self.config
    }

    /// Rounds `[start, end)` this predictor evaluates.
    pub fn iteration_range(&self) -> (usize, usize) {
        (self.start_iteration, self.end_iteration)
    }

    /// Check column names against the training feature names.
    pub fn check_feature_names(&self, names: &[String]) -> Result<()> {
        let expected = self.booster.feature_names();
        if names.len() != expected.len() {
            if self.config.predict_disable_shape_check {
                return Ok(());
            }
            return Err(shape_error(names.len(), expected.len()));
        }
        for (i, (want, got)) in expected.iter().zip(names).enumerate() {
            if want != got {
                return Err(LightGBMError::schema(format!(
                    "Expected '{}' at position {} but found '{}'",
                    want, i, got
                )));
            }
        }
        Ok(())
    }

    pub fn predict(&self, features: &ArrayView2<'_, f32>) -> Result<Array2<f64>> {
        let num_features = self.booster.num_features();
        if features.ncols() != num_features && !self.config.predict_disable_shape_check {
            return Err(shape_error(features.ncols(), num_features));
        }
        if self.config.pred_leaf {
            Ok(self.predict_leaf(features))
        } else if self.config.pred_contrib {
            Ok(self.predict_contrib(features))
        } else {
            Ok(self.predict_scores(features))
        }
    }

    fn predict_scores(&self, features: &ArrayView2<'_, f32>) -> Array2<f64> {
        let k = self.booster.num_tree_per_iteration();
        let transform = self.booster.output_transform();
        let rounds = self.end_iteration - self.start_iteration;
        let average = self.booster.is_average_output() && rounds > 0;
        let mut out = Array2::zeros((features.nrows(), k));

        Zip::from(out.rows_mut())
            .and(features.rows())
            .par_for_each(|mut out_row, row| {
                let mut raw = vec![0.0; k];
                for iteration in self.start_iteration..self.end_iteration {
                    for (score, tree) in raw.iter_mut().zip(self.booster.iteration_trees(iteration)) {
                        *score += tree.predict(&row);
                    }
                    if let Some(es) = &self.early_stop {
                        if es.is_check_round(iteration - self.start_iteration + 1) && es.should_stop(&raw) {
                            break;
                        }
                    }
                }
                if average {
                    for score in raw.iter_mut() {
                        *score /= rounds as f64;
                    }
                }
                if self.config.raw_score {
                    for (o, &r) in out_row.iter_mut().zip(&raw) {
                        *o = r;
                    }
                } else {
                    let mut transformed = vec![0.0; k];
                    transform.apply(&raw, &mut transformed);
                    for (o, &t) in out_row.iter_mut().zip(&transformed) {
                        *o = t;
                    }
                }
            });
        out
    }

    fn predict_leaf(&self, features: &ArrayView2<'_, f32>) -> Array2<f64> {
        let k = self.booster.num_tree_per_iteration();
        let width = (self.end_iteration - self.start_iteration) * k;
        let mut out = Array2::zeros((features.nrows(), width));

        Zip::from(out.rows_mut())
            .and(features.rows())
            .par_for_each(|mut out_row, row| {
                let trees = self.booster.trees()[self.start_iteration * k..self.end_iteration * k].iter();
                for (o, tree) in out_row.iter_mut().zip(trees) {
                    *o = tree.predict_leaf_index(&row) as f64;
                }
            });
        out
    }

    fn predict_contrib(&self, features: &ArrayView2<'_, f32>) -> Array2<f64> {
        let k = self.booster.num_tree_per_iteration();
        let block = self.booster.num_features() + 1;
        let rounds = self.end_iteration - self.start_iteration;
        let average = self.booster.is_average_output() && rounds > 0;
        let mut out = Array2::zeros((features.nrows(), block * k));

        Zip::from(out.rows_mut())
            .and(features.rows())
            .par_for_each(|mut out_row, row| {
                let mut phi = vec![0.0; block * k];
                for iteration in self.start_iteration..self.end_iteration {
                    for (class, tree) in self.booster.iteration_trees(iteration).iter().enumerate() {
                        tree.predict_contrib(&row, &mut phi[class * block..(class + 1) * block]);
                    }
                }
                if average {
                    for v in phi.iter_mut() {
                        *v /= rounds as f64;
                    }
                }
                for (o, &v) in out_row.iter_mut().zip(&phi) {
                    *o = v;
                }
            });
        out
    }
}

fn shape_error(actual: usize, expected: usize) -> LightGBMError {
    LightGBMError::schema(format!(
        "The number of features in data ({}) is not the same as it was in training data ({}). \
         Set predict_disable_shape_check=true to discard this error",
        actual, expected
    ))
}
