//! Gradient boosting driver.
//!
//! [`GBDT`] trains one boosting round per call to
//! [`train_one_iter`](GBDT::train_one_iter):
//!
//! 1. callbacks run and may change the learning rate or stop training,
//! 2. on the first round of a fresh model the objective's initial score is
//!    added to every score buffer,
//! 3. DART removes the dropped rounds from the training scores,
//! 4. the objective computes gradients, which bagging or GOSS may subsample,
//! 5. one tree per class is grown, shrunk and added to every score buffer,
//! 6. every evaluation set is scored and early stopping is consulted.
//!
//! The driver owns the score and gradient buffers. Scores are class-major:
//! the raw score of row `i` for class `k` lives at `k * num_data + i`.

use crate::boosting::callback::{Callback, CallbackAction, CallbackEnv};
use crate::boosting::dart::Dart;
use crate::boosting::early_stopping::{EarlyStopping, EarlyStoppingConfig, EarlyStoppingDecision};
use crate::boosting::ensemble::Booster;
use crate::boosting::sample_strategy::SampleStrategy;
use crate::config::Config;
use crate::core::constants::{
    DEFAULT_BIN_CONSTRUCT_SAMPLE_CNT, DEFAULT_MAX_BIN, DEFAULT_MIN_DATA_IN_BIN, K_EPSILON,
};
use crate::core::error::{LightGBMError, Result};
use crate::core::traits::ObjectiveFunction;
use crate::core::types::{BoostingType, DataSize, Grad, ObjectiveType, Score};
use crate::dataset::Dataset;
use crate::metrics::{create_metrics, EvalHistory, EvalResult, Metric};
use crate::objective::create_objective;
use crate::tree::{SerialTreeLearner, SerialTreeLearnerConfig, Tree};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fmt;

/// Lifecycle of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingState {
    Initializing,
    RoundInProgress,
    /// A round produced no split in any tree
    StoppedConverged,
    StoppedMaxRounds,
    /// Early stopping or a callback ended training
    StoppedEarlyStop,
    StoppedError,
}

impl TrainingState {
    pub fn is_stopped(&self) -> bool {
        !matches!(self, TrainingState::Initializing | TrainingState::RoundInProgress)
    }
}

enum RoundOutcome {
    Continue,
    Stopped(TrainingState),
}

/// A dataset scored after every round.
struct EvalSet<'a> {
    name: String,
    data: &'a Dataset,
    /// Raw class-major scores; the training set reads the driver's buffer
    scores: Vec<Score>,
    metrics: Vec<Box<dyn Metric>>,
}

/// Gradient boosting decision tree trainer.
pub struct GBDT<'a> {
    config: Config,
    train_data: &'a Dataset,
    objective: Box<dyn ObjectiveFunction>,
    tree_learner: SerialTreeLearner,
    sample_strategy: SampleStrategy,
    dart: Option<Dart>,
    training_eval: Option<EvalSet<'a>>,
    valid_sets: Vec<EvalSet<'a>>,
    custom_metrics: Vec<Box<dyn Metric>>,
    callbacks: Vec<Box<dyn Callback>>,
    early_stopping: Option<EarlyStopping>,
    trees: Vec<Tree>,
    num_tree_per_iteration: usize,
    /// Rounds loaded from an existing model
    num_init_iteration: usize,
    /// Rounds trained in this run
    iter: usize,
    train_scores: Vec<Score>,
    gradients: Vec<Grad>,
    hessians: Vec<Grad>,
    /// Random forest: per-class initial scores, set once gradients are fixed
    rf_init_scores: Option<Vec<f64>>,
    learning_rate: f64,
    state: TrainingState,
    best_iteration: Option<usize>,
    best_score: Vec<EvalResult>,
    eval_history: EvalHistory,
    last_results: Vec<EvalResult>,
    pool: Option<ThreadPool>,
}

impl fmt::Debug for GBDT<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GBDT")
            .field("objective", &self.objective.name())
            .field("boosting", &self.config.boosting)
            .field("state", &self.state)
            .field("num_trees", &self.trees.len())
            .field("iteration", &self.current_iteration())
            .finish_non_exhaustive()
    }
}

impl<'a> GBDT<'a> {
    /// Trainer for the built-in objective named by the configuration.
    pub fn new(config: Config, train_data: &'a Dataset) -> Result<Self> {
        config.validate()?;
        let objective = create_objective(&config)?;
        Self::with_objective(config, train_data, objective)
    }

    /// Trainer for an explicit objective, built-in or user supplied.
    pub fn with_objective(
        config: Config,
        train_data: &'a Dataset,
        mut objective: Box<dyn ObjectiveFunction>,
    ) -> Result<Self> {
        config.validate()?;
        let num_data = train_data.num_data();
        crate::ensure!(num_data > 0, crate::dataset_error!("Training data has no rows"));
        check_dataset_config(&config, train_data)?;
        objective.init(train_data.metadata())?;

        let num_tree_per_iteration = objective.num_model_per_iteration();
        let total = num_data * num_tree_per_iteration;
        let train_scores = initial_scores(train_data, total)?;

        let pool = if config.num_threads > 0 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.num_threads)
                .build()
                .map_err(|e| LightGBMError::internal(format!("Failed to build thread pool: {}", e)))?;
            Some(pool)
        } else {
            None
        };

        let dart = match config.boosting {
            BoostingType::DART => Some(Dart::new(&config)),
            _ => None,
        };

        info!(
            "Training {} with {} rows, {} features and {} tree(s) per iteration",
            objective.name(),
            num_data,
            train_data.num_features(),
            num_tree_per_iteration
        );

        let mut gbdt = GBDT {
            tree_learner: SerialTreeLearner::new(SerialTreeLearnerConfig::from_config(&config)),
            sample_strategy: SampleStrategy::from_config(&config)?,
            dart,
            training_eval: None,
            valid_sets: Vec::new(),
            custom_metrics: Vec::new(),
            callbacks: Vec::new(),
            early_stopping: None,
            trees: Vec::new(),
            num_tree_per_iteration,
            num_init_iteration: 0,
            iter: 0,
            train_scores,
            gradients: vec![0.0; total],
            hessians: vec![0.0; total],
            rf_init_scores: None,
            learning_rate: config.learning_rate,
            state: TrainingState::Initializing,
            best_iteration: None,
            best_score: Vec::new(),
            eval_history: EvalHistory::new(),
            last_results: Vec::new(),
            pool,
            objective,
            train_data,
            config,
        };
        if gbdt.config.is_provide_training_metric {
            gbdt.training_eval = Some(gbdt.new_eval_set("training".to_string(), train_data, Vec::new())?);
        }
        Ok(gbdt)
    }

    /// Add an evaluation set. Unnamed sets are called `valid_<i>`; passing
    /// the training dataset itself reports it as `training`.
    pub fn add_valid(&mut self, data: &'a Dataset, name: Option<&str>) -> Result<()> {
        if std::ptr::eq(data, self.train_data) {
            if self.training_eval.is_none() {
                let name = name.unwrap_or("training").to_string();
                self.training_eval = Some(self.new_eval_set(name, data, Vec::new())?);
            }
            return Ok(());
        }
        if data.num_features() != self.train_data.num_features() {
            return Err(LightGBMError::dimension_mismatch(
                format!("{} features in validation data", self.train_data.num_features()),
                data.num_features().to_string(),
            ));
        }
        if !data.shares_bins_with(self.train_data) {
            warn!("Validation data was not constructed with the training data as reference");
        }

        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| format!("valid_{}", self.valid_sets.len()));
        let mut scores = initial_scores(data, data.num_data() * self.num_tree_per_iteration)?;
        self.replay_trees(data, &mut scores);
        let set = self.new_eval_set(name, data, scores)?;
        self.valid_sets.push(set);
        Ok(())
    }

    /// Add a metric evaluated on every set after the configured metrics.
    pub fn add_custom_metric<M: Metric + 'static>(&mut self, metric: M) -> Result<()> {
        let metric: Box<dyn Metric> = Box::new(metric);
        for set in self.training_eval.iter_mut().chain(self.valid_sets.iter_mut()) {
            let mut instance = metric.clone();
            instance.init(set.data.metadata())?;
            set.metrics.push(instance);
        }
        self.custom_metrics.push(metric);
        Ok(())
    }

    pub fn add_callback<C: Callback + 'static>(&mut self, callback: C) {
        self.callbacks.push(Box::new(callback));
    }

    /// Continue training from an existing model: its trees are kept and
    /// every score buffer is rebuilt by replaying them.
    pub fn init_from(&mut self, booster: &Booster) -> Result<()> {
        if !self.trees.is_empty() || self.iter > 0 {
            return Err(crate::training_error!(
                "Continued training must start before the first round"
            ));
        }
        if booster.num_tree_per_iteration() != self.num_tree_per_iteration {
            return Err(LightGBMError::config(format!(
                "Cannot continue a model with {} trees per iteration using {} trees per iteration",
                booster.num_tree_per_iteration(),
                self.num_tree_per_iteration
            )));
        }
        if booster.num_features() != self.train_data.num_features() {
            return Err(LightGBMError::dimension_mismatch(
                format!("{} features", booster.num_features()),
                self.train_data.num_features().to_string(),
            ));
        }
        if booster.is_average_output() != self.is_random_forest() {
            return Err(LightGBMError::config(
                "Random forest and boosted models cannot continue each other",
            ));
        }

        self.trees = booster.trees().to_vec();
        self.num_init_iteration = booster.num_iterations();

        let mut scores = std::mem::take(&mut self.train_scores);
        self.replay_trees(self.train_data, &mut scores);
        self.train_scores = scores;
        for i in 0..self.valid_sets.len() {
            let mut scores = std::mem::take(&mut self.valid_sets[i].scores);
            self.replay_trees(self.valid_sets[i].data, &mut scores);
            self.valid_sets[i].scores = scores;
        }
        info!("Continuing training from a model with {} iterations", self.num_init_iteration);
        Ok(())
    }

    /// Train one round. Returns `true` once training has stopped.
    pub fn train_one_iter(&mut self) -> Result<bool> {
        if self.state.is_stopped() {
            return Ok(true);
        }
        if self.iter >= self.config.num_iterations {
            self.finish(TrainingState::StoppedMaxRounds);
            return Ok(true);
        }
        if self.state == TrainingState::Initializing {
            self.prepare_run();
        }
        self.state = TrainingState::RoundInProgress;

        let result = match self.pool.take() {
            Some(pool) => {
                let result = pool.install(|| self.run_round());
                self.pool = Some(pool);
                result
            }
            None => self.run_round(),
        };

        match result {
            Ok(RoundOutcome::Stopped(state)) => {
                self.finish(state);
                Ok(true)
            }
            Ok(RoundOutcome::Continue) if self.iter >= self.config.num_iterations => {
                self.finish(TrainingState::StoppedMaxRounds);
                Ok(true)
            }
            Ok(RoundOutcome::Continue) => Ok(false),
            Err(e) => {
                self.state = TrainingState::StoppedError;
                error!("Training stopped by a {} error: {}", e.category(), e);
                Err(e)
            }
        }
    }

    /// Train until a terminal state and return the model.
    pub fn train(mut self) -> Result<Booster> {
        while !self.train_one_iter()? {}
        Ok(self.into_booster())
    }

    /// Snapshot of the model trained so far.
    pub fn booster(&self) -> Booster {
        Booster {
            trees: self.trees.clone(),
            num_tree_per_iteration: self.num_tree_per_iteration,
            num_features: self.train_data.num_features(),
            feature_names: self.train_data.feature_names().to_vec(),
            feature_infos: self.train_data.feature_infos(),
            objective: self.objective.objective_type(),
            objective_name: self.objective.name().to_string(),
            output_transform: self.objective.output_transform(),
            average_output: self.is_random_forest(),
            best_iteration: self.best_iteration,
            best_score: if self.best_score.is_empty() {
                self.last_results.clone()
            } else {
                self.best_score.clone()
            },
            eval_history: self.eval_history.clone(),
            config: self.config.clone(),
        }
    }

    pub fn into_booster(self) -> Booster {
        self.booster()
    }

    pub fn state(&self) -> TrainingState {
        self.state
    }

    /// Number of rounds in the model, including continued ones.
    pub fn current_iteration(&self) -> usize {
        self.trees.len() / self.num_tree_per_iteration
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn best_iteration(&self) -> Option<usize> {
        self.best_iteration
    }

    pub fn eval_history(&self) -> &EvalHistory {
        &self.eval_history
    }

    /// Evaluation results of the last round.
    pub fn last_results(&self) -> &[EvalResult] {
        &self.last_results
    }

    /// Raw class-major scores of the training rows.
    pub fn train_scores(&self) -> &[Score] {
        &self.train_scores
    }

    /// Raw class-major scores of the `index`-th validation set.
    pub fn valid_scores(&self, index: usize) -> Option<&[Score]> {
        self.valid_sets.get(index).map(|s| s.scores.as_slice())
    }

    fn is_random_forest(&self) -> bool {
        self.config.boosting == BoostingType::RandomForest
    }

    fn new_eval_set(&self, name: String, data: &'a Dataset, scores: Vec<Score>) -> Result<EvalSet<'a>> {
        let mut metrics = create_metrics(&self.config, self.objective.output_transform())?;
        metrics.extend(self.custom_metrics.iter().cloned());
        for metric in metrics.iter_mut() {
            metric.init(data.metadata())?;
        }
        Ok(EvalSet {
            name,
            data,
            scores,
            metrics,
        })
    }

    /// Add the current trees' outputs to class-major `scores` of `data`.
    fn replay_trees(&self, data: &Dataset, scores: &mut [Score]) {
        if self.trees.is_empty() {
            return;
        }
        let k = self.num_tree_per_iteration;
        let n = data.num_data();
        if self.is_random_forest() {
            let rounds = (self.trees.len() / k) as f64;
            scores.fill(0.0);
            for (i, tree) in self.trees.iter().enumerate() {
                let class = i % k;
                add_tree_scores(tree, data, &mut scores[class * n..(class + 1) * n], 1.0 / rounds);
            }
        } else {
            for (i, tree) in self.trees.iter().enumerate() {
                let class = i % k;
                add_tree_scores(tree, data, &mut scores[class * n..(class + 1) * n], 1.0);
            }
        }
    }

    fn prepare_run(&mut self) {
        if !self.config.is_early_stopping_enabled() {
            return;
        }
        if self.dart.is_some() {
            warn!("Early stopping is not available in dart mode");
        } else if self.valid_sets.is_empty() {
            warn!("Early stopping requires at least one validation set; it is disabled");
        } else if self.valid_sets[0].metrics.is_empty() {
            warn!("Early stopping requires at least one metric; it is disabled");
        } else {
            info!(
                "Training until validation scores don't improve for {} rounds",
                self.config.early_stopping_round
            );
            self.early_stopping = Some(EarlyStopping::new(EarlyStoppingConfig {
                patience: self.config.early_stopping_round,
                min_delta: self.config.early_stopping_min_delta,
                first_metric_only: self.config.first_metric_only,
            }));
        }
    }

    fn finish(&mut self, state: TrainingState) {
        self.state = state;
        if let Some(es) = &self.early_stopping {
            if self.best_iteration.is_none() && es.best_iteration() > 0 {
                self.best_iteration = Some(es.best_iteration());
                self.best_score = es.best_results().to_vec();
            }
        }
        info!(
            "Finished training after {} iterations ({:?})",
            self.current_iteration(),
            state
        );
    }

    fn run_round(&mut self) -> Result<RoundOutcome> {
        let round = self.num_init_iteration + self.iter;

        let mut env = CallbackEnv {
            iteration: round,
            begin_iteration: self.num_init_iteration,
            end_iteration: self.num_init_iteration + self.config.num_iterations,
            learning_rate: self.learning_rate,
            evaluation_results: &self.last_results,
        };
        for callback in self.callbacks.iter_mut() {
            let action = callback
                .before_iteration(&mut env)
                .map_err(|e| LightGBMError::user_callback(callback.name(), e))?;
            if action == CallbackAction::Stop {
                info!("Callback {} requested a stop before round {}", callback.name(), round + 1);
                return Ok(RoundOutcome::Stopped(TrainingState::StoppedEarlyStop));
            }
        }
        self.learning_rate = env.learning_rate;

        let data = self.train_data;
        let metadata = data.metadata();
        let n = data.num_data();
        let k = self.num_tree_per_iteration;
        let first_round_of_model = self.trees.is_empty();
        let is_rf = self.is_random_forest();

        let init_scores = if is_rf {
            if self.rf_init_scores.is_none() {
                self.init_random_forest()?;
            }
            self.rf_init_scores.clone().unwrap_or_else(|| vec![0.0; k])
        } else {
            self.boost_from_average(first_round_of_model)
        };

        let dropped: Vec<usize> = match self.dart.as_mut() {
            Some(dart) => dart.select_drops(self.iter, self.learning_rate).to_vec(),
            None => Vec::new(),
        };
        for &i in &dropped {
            for class in 0..k {
                let tree = &self.trees[(self.num_init_iteration + i) * k + class];
                add_tree_scores(tree, data, &mut self.train_scores[class * n..(class + 1) * n], -1.0);
            }
        }
        let shrinkage = match &self.dart {
            Some(dart) => dart.shrinkage_rate(),
            None => self.learning_rate,
        };

        if !is_rf {
            self.objective
                .get_gradients(metadata, &self.train_scores, &mut self.gradients, &mut self.hessians)?;
        }
        let bag = self
            .sample_strategy
            .sample(self.iter, n, &mut self.gradients, &mut self.hessians);

        let mut should_continue = false;
        let mut new_trees = Vec::with_capacity(k);
        for class in 0..k {
            let range = class * n..(class + 1) * n;
            let mut tree = self.tree_learner.train(
                data,
                &self.gradients[range.clone()],
                &self.hessians[range.clone()],
                bag.as_deref(),
            )?;

            if tree.num_leaves() > 1 {
                should_continue = true;
                if self.objective.is_renew_tree_output() {
                    let rf_scores;
                    let scores: &[Score] = if is_rf {
                        rf_scores = vec![init_scores[class]; n];
                        &rf_scores
                    } else {
                        &self.train_scores[range.clone()]
                    };
                    for leaf in 0..tree.num_leaves() {
                        let rows = self.tree_learner.partition().leaf_rows(leaf);
                        let output = self
                            .objective
                            .renew_tree_output(metadata, scores, rows, tree.leaf_output(leaf));
                        tree.set_leaf_output(leaf, output);
                    }
                }

                if is_rf {
                    if init_scores[class].abs() > K_EPSILON {
                        tree.add_bias(init_scores[class]);
                    }
                    let previous = round as f64;
                    average_in_tree(&tree, data, &mut self.train_scores[range.clone()], previous);
                    for set in self.valid_sets.iter_mut() {
                        let m = set.data.num_data();
                        average_in_tree(&tree, set.data, &mut set.scores[class * m..(class + 1) * m], previous);
                    }
                } else {
                    tree.shrink(shrinkage);
                    add_tree_scores(&tree, data, &mut self.train_scores[range.clone()], 1.0);
                    for set in self.valid_sets.iter_mut() {
                        let m = set.data.num_data();
                        add_tree_scores(&tree, set.data, &mut set.scores[class * m..(class + 1) * m], 1.0);
                    }
                    if init_scores[class].abs() > K_EPSILON {
                        tree.add_bias(init_scores[class]);
                    }
                }
                debug!(
                    "Trained a tree with leaves = {} and depth = {}",
                    tree.num_leaves(),
                    tree.depth()
                );
            } else if first_round_of_model {
                let output = self.first_constant_output(class, init_scores[class], is_rf);
                tree = Tree::constant(output, n as DataSize);
            } else {
                tree.set_leaf_output(0, 0.0);
            }
            new_trees.push(tree);
        }

        if !should_continue {
            warn!("Stopped training because there are no more leaves that meet the split requirements");
            for &i in &dropped {
                for class in 0..k {
                    let tree = &self.trees[(self.num_init_iteration + i) * k + class];
                    add_tree_scores(tree, data, &mut self.train_scores[class * n..(class + 1) * n], 1.0);
                }
            }
            if let Some(dart) = self.dart.as_mut() {
                dart.cancel_round();
            }
            if first_round_of_model {
                self.trees.extend(new_trees);
                self.iter += 1;
            }
            return Ok(RoundOutcome::Stopped(TrainingState::StoppedConverged));
        }

        if let Some(dart) = self.dart.as_mut() {
            if !dropped.is_empty() {
                let factor = dart.normalize_factor(self.learning_rate);
                for &i in &dropped {
                    for class in 0..k {
                        let tree = &mut self.trees[(self.num_init_iteration + i) * k + class];
                        add_tree_scores(tree, data, &mut self.train_scores[class * n..(class + 1) * n], factor);
                        for set in self.valid_sets.iter_mut() {
                            let m = set.data.num_data();
                            add_tree_scores(
                                tree,
                                set.data,
                                &mut set.scores[class * m..(class + 1) * m],
                                factor - 1.0,
                            );
                        }
                        tree.shrink(factor);
                    }
                }
            }
            dart.finish_round(self.learning_rate);
        }

        self.trees.extend(new_trees);
        self.iter += 1;

        let (results, valid_range) = self.evaluate()?;
        for result in &results {
            self.eval_history.record(result);
        }
        if !results.is_empty() {
            debug!(
                "[{}]\t{}",
                round + 1,
                results.iter().map(EvalResult::to_log_string).collect::<Vec<_>>().join("\t")
            );
        }

        let mut outcome = RoundOutcome::Continue;
        if let Some(es) = self.early_stopping.as_mut() {
            if let EarlyStoppingDecision::Stop { best_iteration } = es.update(round + 1, &results[valid_range]) {
                self.best_iteration = Some(best_iteration);
                self.best_score = es.best_results().to_vec();
                outcome = RoundOutcome::Stopped(TrainingState::StoppedEarlyStop);
            }
        }
        self.last_results = results;

        let env = CallbackEnv {
            iteration: round,
            begin_iteration: self.num_init_iteration,
            end_iteration: self.num_init_iteration + self.config.num_iterations,
            learning_rate: self.learning_rate,
            evaluation_results: &self.last_results,
        };
        for callback in self.callbacks.iter_mut() {
            let action = callback
                .after_iteration(&env)
                .map_err(|e| LightGBMError::user_callback(callback.name(), e))?;
            if action == CallbackAction::Stop {
                info!("Callback {} requested a stop after round {}", callback.name(), round + 1);
                outcome = RoundOutcome::Stopped(TrainingState::StoppedEarlyStop);
            }
        }
        Ok(outcome)
    }

    /// Add the objective's initial score to every buffer on the first round
    /// of a fresh model and return it per class.
    fn boost_from_average(&mut self, first_round_of_model: bool) -> Vec<f64> {
        let k = self.num_tree_per_iteration;
        let mut init_scores = vec![0.0; k];
        let metadata = self.train_data.metadata();
        if !first_round_of_model || metadata.init_score().is_some() {
            return init_scores;
        }
        if !self.config.boost_from_average {
            if matches!(
                self.objective.objective_type(),
                ObjectiveType::RegressionL1 | ObjectiveType::Quantile | ObjectiveType::Mape
            ) {
                warn!("Disabling boost_from_average in {} may cause slow convergence", self.objective.name());
            }
            return init_scores;
        }
        for (class, init) in init_scores.iter_mut().enumerate() {
            let score = self.objective.boost_from_score(metadata, class);
            if score.abs() > K_EPSILON {
                info!("Start training from score {:.6}", score);
                self.add_constant_everywhere(class, score);
                *init = score;
            }
        }
        init_scores
    }

    /// Output of a single-leaf tree on the first round of a fresh model.
    fn first_constant_output(&mut self, class: usize, init_score: f64, is_rf: bool) -> f64 {
        let metadata = self.train_data.metadata();
        if is_rf {
            self.add_constant_everywhere(class, init_score);
            return init_score;
        }
        if !self.config.boost_from_average
            && metadata.init_score().is_none()
            && self.objective.objective_type() != ObjectiveType::Custom
        {
            let score = self.objective.boost_from_score(metadata, class);
            self.add_constant_everywhere(class, score);
            return score;
        }
        init_score
    }

    /// Random forest trees are all fitted to the gradients at the initial
    /// scores, so those are computed once.
    fn init_random_forest(&mut self) -> Result<()> {
        let metadata = self.train_data.metadata();
        let n = self.train_data.num_data();
        let k = self.num_tree_per_iteration;
        let mut init_scores = vec![0.0; k];
        if self.trees.is_empty()
            && metadata.init_score().is_none()
            && self.config.boost_from_average
            && self.objective.objective_type() != ObjectiveType::Custom
        {
            for (class, init) in init_scores.iter_mut().enumerate() {
                *init = self.objective.boost_from_score(metadata, class);
            }
        }
        let mut scores = vec![0.0; n * k];
        for (class, &init) in init_scores.iter().enumerate() {
            scores[class * n..(class + 1) * n].fill(init);
        }
        self.objective
            .get_gradients(metadata, &scores, &mut self.gradients, &mut self.hessians)?;
        self.rf_init_scores = Some(init_scores);
        Ok(())
    }

    fn add_constant_everywhere(&mut self, class: usize, value: f64) {
        let n = self.train_data.num_data();
        add_constant(&mut self.train_scores[class * n..(class + 1) * n], value);
        for set in self.valid_sets.iter_mut() {
            let m = set.data.num_data();
            add_constant(&mut set.scores[class * m..(class + 1) * m], value);
        }
    }

    /// Results of every set, training first, and the index range of the
    /// first validation set's results.
    fn evaluate(&self) -> Result<(Vec<EvalResult>, std::ops::Range<usize>)> {
        let mut results = Vec::new();
        if let Some(set) = &self.training_eval {
            eval_set(set, &self.train_scores, &mut results)?;
        }
        let start = results.len();
        for set in &self.valid_sets {
            eval_set(set, &set.scores, &mut results)?;
        }
        let end = start + self.valid_sets.first().map_or(0, |s| s.metrics.len());
        Ok((results, start..end))
    }
}

fn eval_set(set: &EvalSet<'_>, scores: &[Score], out: &mut Vec<EvalResult>) -> Result<()> {
    for metric in &set.metrics {
        let value = metric.eval(set.data.metadata(), scores)?;
        out.push(EvalResult {
            data_name: set.name.clone(),
            metric_name: metric.name().to_string(),
            value,
            higher_better: metric.higher_better(),
        });
    }
    Ok(())
}

/// Dataset-level options only take effect when the dataset is built; a
/// configuration that contradicts the training dataset is reported here.
fn check_dataset_config(config: &Config, data: &Dataset) -> Result<()> {
    if !config.categorical_feature.is_empty() {
        let mut wanted = config.categorical_feature.clone();
        wanted.sort_unstable();
        wanted.dedup();
        let actual = data.categorical_features();
        crate::ensure!(
            wanted == actual,
            crate::config_error!(
                "categorical_feature {:?} does not match the categorical features {:?} of the training dataset; \
                 build the dataset with DatasetBuilder::config",
                wanted,
                actual
            )
        );
    }

    let binning = data.binning_params();
    let checks = [
        ("max_bin", config.max_bin, DEFAULT_MAX_BIN, binning.max_bin),
        ("min_data_in_bin", config.min_data_in_bin, DEFAULT_MIN_DATA_IN_BIN, binning.min_data_in_bin),
        (
            "bin_construct_sample_cnt",
            config.bin_construct_sample_cnt,
            DEFAULT_BIN_CONSTRUCT_SAMPLE_CNT,
            data.bin_construct_sample_cnt(),
        ),
    ];
    for (name, configured, default, used) in checks {
        if configured != default && configured != used {
            warn!(
                "{}={} is ignored, the training dataset was binned with {}={}",
                name, configured, name, used
            );
        }
    }
    if !config.use_missing && binning.use_missing {
        warn!("use_missing=false is ignored, the training dataset was binned with use_missing=true");
    }
    Ok(())
}

/// Score buffer of `total` values seeded with the dataset's initial scores.
fn initial_scores(data: &Dataset, total: usize) -> Result<Vec<Score>> {
    match data.metadata().init_score() {
        Some(init) if init.len() != total => Err(LightGBMError::dimension_mismatch(
            format!("{} initial scores", total),
            init.len().to_string(),
        )),
        Some(init) => Ok(init.to_vec()),
        None => Ok(vec![0.0; total]),
    }
}

fn add_constant(scores: &mut [Score], value: f64) {
    scores.par_iter_mut().for_each(|s| *s += value);
}

/// `scores[i] += factor * tree(row i)` over every row of `data`.
fn add_tree_scores(tree: &Tree, data: &Dataset, scores: &mut [Score], factor: f64) {
    scores
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, s)| *s += factor * tree.predict(&data.raw_row(i)));
}

/// Fold one more tree into a running mean over `previous` trees.
fn average_in_tree(tree: &Tree, data: &Dataset, scores: &mut [Score], previous: f64) {
    scores.par_iter_mut().enumerate().for_each(|(i, s)| {
        *s = (*s * previous + tree.predict(&data.raw_row(i))) / (previous + 1.0);
    });
}

/// Train a model on `train_data`, evaluating every named validation set.
///
/// ```rust
/// use lightgbm_engine::{train, ConfigBuilder, Dataset};
/// use ndarray::{Array1, Array2};
///
/// # fn main() -> lightgbm_engine::Result<()> {
/// let features = Array2::from_shape_fn((200, 2), |(i, j)| ((i * (j + 3)) % 17) as f32);
/// let labels = Array1::from_iter((0..200).map(|i| features[[i, 0]] * 2.0 + features[[i, 1]]));
/// let data = Dataset::builder().features(features).labels(labels).build()?;
/// let config = ConfigBuilder::new().num_iterations(10).build()?;
/// let booster = train(config, &data, &[])?;
/// assert_eq!(booster.num_iterations(), 10);
/// # Ok(())
/// # }
/// ```
pub fn train<'a>(config: Config, train_data: &'a Dataset, valid_sets: &[(&str, &'a Dataset)]) -> Result<Booster> {
    let mut gbdt = GBDT::new(config, train_data)?;
    for &(name, data) in valid_sets {
        gbdt.add_valid(data, Some(name))?;
    }
    gbdt.train()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boosting::callback::LearningRateSchedule;
    use crate::config::ConfigBuilder;
    use crate::core::types::MetricKind;
    use ndarray::{Array1, Array2};

    fn regression_data(n: usize, constant_label: bool) -> Dataset {
        let features = Array2::from_shape_fn((n, 2), |(i, j)| ((i * (j + 7)) % 23) as f32);
        let labels = Array1::from_iter((0..n).map(|i| {
            if constant_label {
                3.0
            } else {
                features[[i, 0]] * 0.5 - features[[i, 1]]
            }
        }));
        Dataset::builder().features(features).labels(labels).build().unwrap()
    }

    #[test]
    fn test_runs_to_max_rounds() {
        let data = regression_data(200, false);
        let config = ConfigBuilder::new().num_iterations(5).build().unwrap();
        let mut gbdt = GBDT::new(config, &data).unwrap();
        assert_eq!(gbdt.state(), TrainingState::Initializing);
        let mut rounds = 0;
        while !gbdt.train_one_iter().unwrap() {
            rounds += 1;
            assert_eq!(gbdt.state(), TrainingState::RoundInProgress);
        }
        assert_eq!(rounds, 4);
        assert_eq!(gbdt.state(), TrainingState::StoppedMaxRounds);
        assert_eq!(gbdt.current_iteration(), 5);
        assert!(gbdt.train_one_iter().unwrap());
    }

    #[test]
    fn test_constant_labels_converge_in_one_round() {
        let data = regression_data(100, true);
        let config = ConfigBuilder::new().num_iterations(20).build().unwrap();
        let mut gbdt = GBDT::new(config, &data).unwrap();
        while !gbdt.train_one_iter().unwrap() {}
        assert_eq!(gbdt.state(), TrainingState::StoppedConverged);
        let booster = gbdt.booster();
        assert_eq!(booster.num_iterations(), 1);
        assert!((booster.trees()[0].leaf_output(0) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_training_set_is_named_training() {
        let data = regression_data(100, false);
        let config = ConfigBuilder::new()
            .num_iterations(2)
            .metric(vec![MetricKind::L2])
            .build()
            .unwrap();
        let mut gbdt = GBDT::new(config, &data).unwrap();
        gbdt.add_valid(&data, None).unwrap();
        let booster = gbdt.train().unwrap();
        assert_eq!(booster.eval_history().data_names(), vec!["training"]);
        assert_eq!(booster.eval_history().get("training", "l2").unwrap().len(), 2);
    }

    #[test]
    fn test_schedule_changes_learning_rate() {
        let data = regression_data(100, false);
        let config = ConfigBuilder::new().num_iterations(3).build().unwrap();
        let mut gbdt = GBDT::new(config, &data).unwrap();
        gbdt.add_callback(LearningRateSchedule::ExponentialDecay {
            initial: 0.2,
            decay: 0.5,
        });
        while !gbdt.train_one_iter().unwrap() {}
        assert!((gbdt.learning_rate() - 0.05).abs() < 1e-12);
        // the second and third trees carry the scheduled shrinkage
        assert!((gbdt.booster().trees()[2].shrinkage() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_mismatched_init_score_is_rejected() {
        let features = Array2::from_shape_fn((10, 1), |(i, _)| i as f32);
        let data = Dataset::builder()
            .features(features)
            .labels(Array1::zeros(10))
            .init_score(vec![0.0; 3])
            .build();
        if let Ok(data) = data {
            let err = GBDT::new(Config::default(), &data).unwrap_err();
            assert!(matches!(err, LightGBMError::DimensionMismatch { .. }));
        }
    }
}
