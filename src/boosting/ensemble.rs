//! The trained model.
//!
//! A [`Booster`] is an ordered sequence of trees, `num_tree_per_iteration`
//! per boosting round, together with everything needed to predict without
//! the training data: feature names and categories, the objective's output
//! transform, and the evaluation record of the run that produced it.

use crate::config::Config;
use crate::core::error::{LightGBMError, Result};
use crate::core::traits::OutputTransform;
use crate::core::types::{ImportanceType, ObjectiveType};
use crate::dataset::FeatureInfo;
use crate::metrics::{EvalHistory, EvalResult};
use crate::prediction::{feature_importance, PredictConfig, Predictor};
use crate::tree::Tree;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ensemble of decision trees produced by training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booster {
    pub(crate) trees: Vec<Tree>,
    pub(crate) num_tree_per_iteration: usize,
    pub(crate) num_features: usize,
    pub(crate) feature_names: Vec<String>,
    pub(crate) feature_infos: Vec<FeatureInfo>,
    pub(crate) objective: ObjectiveType,
    pub(crate) objective_name: String,
    pub(crate) output_transform: OutputTransform,
    /// Random forest models average their trees instead of summing them
    pub(crate) average_output: bool,
    /// 1-based round with the best validation score
    pub(crate) best_iteration: Option<usize>,
    pub(crate) best_score: Vec<EvalResult>,
    pub(crate) eval_history: EvalHistory,
    pub(crate) config: Config,
}

impl Booster {
    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of boosting rounds stored in the model.
    pub fn num_iterations(&self) -> usize {
        self.trees.len() / self.num_tree_per_iteration.max(1)
    }

    pub fn num_tree_per_iteration(&self) -> usize {
        self.num_tree_per_iteration
    }

    /// Number of raw score columns, one per class for multiclass models.
    pub fn num_class(&self) -> usize {
        self.num_tree_per_iteration
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn feature_infos(&self) -> &[FeatureInfo] {
        &self.feature_infos
    }

    pub fn objective(&self) -> ObjectiveType {
        self.objective
    }

    pub fn objective_name(&self) -> &str {
        &self.objective_name
    }

    pub fn output_transform(&self) -> OutputTransform {
        self.output_transform
    }

    pub fn is_average_output(&self) -> bool {
        self.average_output
    }

    pub fn best_iteration(&self) -> Option<usize> {
        self.best_iteration
    }

    /// Evaluation results at the best iteration, or of the last round when
    /// early stopping was not used.
    pub fn best_score(&self) -> &[EvalResult] {
        &self.best_score
    }

    pub fn eval_history(&self) -> &EvalHistory {
        &self.eval_history
    }

    /// Configuration the model was trained with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Trees of round `iteration`, one per class.
    pub fn iteration_trees(&self, iteration: usize) -> &[Tree] {
        let k = self.num_tree_per_iteration;
        let start = (iteration * k).min(self.trees.len());
        let end = (start + k).min(self.trees.len());
        &self.trees[start..end]
    }

    /// Rounds `[start, end)` used by a prediction.
    ///
    /// Without an explicit count the best iteration is used when prediction
    /// starts at the first round; a count of zero means every remaining
    /// round.
    pub fn iteration_range(&self, start_iteration: usize, num_iteration: Option<usize>) -> (usize, usize) {
        let total = self.num_iterations();
        let start = start_iteration.min(total);
        let count = match num_iteration {
            Some(n) => n,
            None if start_iteration == 0 => self.best_iteration.unwrap_or(0),
            None => 0,
        };
        let end = if count > 0 { (start + count).min(total) } else { total };
        (start, end)
    }

    /// Keep only the first `num_iterations` rounds.
    pub fn truncate(&mut self, num_iterations: usize) {
        let keep = num_iterations.min(self.num_iterations());
        self.trees.truncate(keep * self.num_tree_per_iteration);
        if self.best_iteration.is_some_and(|b| b > keep) {
            self.best_iteration = Some(keep);
        }
        self.eval_history.truncate(keep);
    }

    /// Transformed predictions over the default iteration range.
    pub fn predict(&self, features: &ArrayView2<'_, f32>) -> Result<Array2<f64>> {
        self.predict_with(features, &PredictConfig::default())
    }

    /// Predictions in any mode; see [`PredictConfig`].
    pub fn predict_with(&self, features: &ArrayView2<'_, f32>, config: &PredictConfig) -> Result<Array2<f64>> {
        Predictor::new(self, config.clone())?.predict(features)
    }

    /// Predictions for rows whose columns are named; columns are checked
    /// against the training feature names before anything is computed.
    pub fn predict_named(
        &self,
        features: &ArrayView2<'_, f32>,
        names: &[String],
        config: &PredictConfig,
    ) -> Result<Array2<f64>> {
        let predictor = Predictor::new(self, config.clone())?;
        predictor.check_feature_names(names)?;
        predictor.predict(features)
    }

    /// Per-feature importance, optionally over the first `num_iteration`
    /// rounds only.
    pub fn feature_importance(&self, importance_type: ImportanceType, num_iteration: Option<usize>) -> Vec<f64> {
        feature_importance::feature_importance(self, importance_type, num_iteration)
    }

    /// Save to `path`; `.json` selects the text form, anything else the
    /// binary form.
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        crate::io::save_model(self, path)
    }

    pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Booster> {
        crate::io::load_model(path)
    }

    pub fn to_json_string(&self) -> Result<String> {
        crate::io::serialization::json::to_string(self)
    }

    pub fn from_json_str(text: &str) -> Result<Booster> {
        crate::io::serialization::json::from_str(text)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        crate::io::serialization::bincode::to_bytes(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Booster> {
        crate::io::serialization::bincode::from_bytes(bytes)
    }

    /// Structural checks run after loading a model.
    pub fn validate(&self) -> Result<()> {
        if self.num_tree_per_iteration == 0 {
            return Err(LightGBMError::serialization("Model has zero trees per iteration"));
        }
        if self.trees.len() % self.num_tree_per_iteration != 0 {
            return Err(LightGBMError::serialization(format!(
                "Model holds {} trees, not a multiple of {} per iteration",
                self.trees.len(),
                self.num_tree_per_iteration
            )));
        }
        if self.feature_names.len() != self.num_features || self.feature_infos.len() != self.num_features {
            return Err(LightGBMError::serialization("Feature metadata does not match the feature count"));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate()
                .map_err(|e| LightGBMError::serialization(format!("Tree {}: {}", i, e)))?;
            if let Some(split) = tree.splits().find(|s| s.feature >= self.num_features) {
                return Err(LightGBMError::serialization(format!(
                    "Tree {} splits on feature {} of {}",
                    i, split.feature, self.num_features
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
impl Booster {
    /// Regression model over `num_features` numerical features built from
    /// ready-made trees.
    pub(crate) fn from_trees(trees: Vec<Tree>, num_tree_per_iteration: usize, num_features: usize) -> Booster {
        use crate::core::types::{FeatureType, MissingType};
        Booster {
            trees,
            num_tree_per_iteration,
            num_features,
            feature_names: (0..num_features).map(|i| format!("Column_{}", i)).collect(),
            feature_infos: (0..num_features)
                .map(|_| FeatureInfo {
                    feature_type: FeatureType::Numerical,
                    missing_type: MissingType::None,
                    num_bins: 2,
                    categories: Vec::new(),
                })
                .collect(),
            objective: ObjectiveType::Regression,
            objective_name: "regression".into(),
            output_transform: OutputTransform::Identity,
            average_output: false,
            best_iteration: None,
            best_score: Vec::new(),
            eval_history: EvalHistory::new(),
            config: Config::default(),
        }
    }
}
