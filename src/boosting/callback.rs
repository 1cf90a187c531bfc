//! Round-level training callbacks.
//!
//! Callbacks run before and after every boosting round. They can change the
//! learning rate of the coming round, log evaluation results, or ask the
//! driver to stop. A requested stop ends training in the early-stop state
//! after the current round is complete.

use crate::metrics::EvalResult;
use log::info;
use std::fmt;
use std::sync::Arc;

/// What the driver should do after a callback ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallbackAction {
    #[default]
    Continue,
    Stop,
}

/// Training state visible to callbacks.
#[derive(Debug, Clone)]
pub struct CallbackEnv<'a> {
    /// Index of the current round, counted from the first round of the model
    pub iteration: usize,
    /// Index of the first round trained in this run
    pub begin_iteration: usize,
    /// One past the last round this run may train
    pub end_iteration: usize,
    /// Learning rate of the current round; `before_iteration` may change it
    pub learning_rate: f64,
    /// Evaluation results of the last finished round
    pub evaluation_results: &'a [EvalResult],
}

/// A hook invoked around every boosting round.
pub trait Callback: Send {
    fn name(&self) -> &str;

    fn before_iteration(&mut self, _env: &mut CallbackEnv<'_>) -> anyhow::Result<CallbackAction> {
        Ok(CallbackAction::Continue)
    }

    fn after_iteration(&mut self, _env: &CallbackEnv<'_>) -> anyhow::Result<CallbackAction> {
        Ok(CallbackAction::Continue)
    }
}

/// Learning rate as a function of the round index within the run.
#[derive(Clone)]
pub enum LearningRateSchedule {
    Constant(f64),
    /// `initial * decay^iteration`
    ExponentialDecay { initial: f64, decay: f64 },
    /// `initial * gamma^(iteration / step_size)`
    Step {
        initial: f64,
        step_size: usize,
        gamma: f64,
    },
    Custom(Arc<dyn Fn(usize) -> f64 + Send + Sync>),
}

impl LearningRateSchedule {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(usize) -> f64 + Send + Sync + 'static,
    {
        LearningRateSchedule::Custom(Arc::new(f))
    }

    pub fn learning_rate(&self, iteration: usize) -> f64 {
        match self {
            LearningRateSchedule::Constant(rate) => *rate,
            LearningRateSchedule::ExponentialDecay { initial, decay } => {
                initial * decay.powi(iteration as i32)
            }
            LearningRateSchedule::Step {
                initial,
                step_size,
                gamma,
            } => initial * gamma.powi((iteration / (*step_size).max(1)) as i32),
            LearningRateSchedule::Custom(f) => f(iteration),
        }
    }
}

impl fmt::Debug for LearningRateSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LearningRateSchedule::Constant(rate) => f.debug_tuple("Constant").field(rate).finish(),
            LearningRateSchedule::ExponentialDecay { initial, decay } => f
                .debug_struct("ExponentialDecay")
                .field("initial", initial)
                .field("decay", decay)
                .finish(),
            LearningRateSchedule::Step {
                initial,
                step_size,
                gamma,
            } => f
                .debug_struct("Step")
                .field("initial", initial)
                .field("step_size", step_size)
                .field("gamma", gamma)
                .finish(),
            LearningRateSchedule::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Callback for LearningRateSchedule {
    fn name(&self) -> &str {
        "learning_rate_schedule"
    }

    fn before_iteration(&mut self, env: &mut CallbackEnv<'_>) -> anyhow::Result<CallbackAction> {
        let rate = self.learning_rate(env.iteration - env.begin_iteration);
        if !rate.is_finite() || rate <= 0.0 {
            anyhow::bail!("learning rate must be positive, got {} at round {}", rate, env.iteration);
        }
        env.learning_rate = rate;
        Ok(CallbackAction::Continue)
    }
}

/// Logs the evaluation results every `period` rounds and after the last one.
#[derive(Debug, Clone)]
pub struct LogEvaluation {
    pub period: usize,
}

impl LogEvaluation {
    pub fn new(period: usize) -> Self {
        LogEvaluation { period }
    }
}

impl Callback for LogEvaluation {
    fn name(&self) -> &str {
        "log_evaluation"
    }

    fn after_iteration(&mut self, env: &CallbackEnv<'_>) -> anyhow::Result<CallbackAction> {
        let round = env.iteration + 1;
        let last = round == env.end_iteration;
        if self.period > 0 && !env.evaluation_results.is_empty() && (round % self.period == 0 || last) {
            let line = env
                .evaluation_results
                .iter()
                .map(EvalResult::to_log_string)
                .collect::<Vec<_>>()
                .join("\t");
            info!("[{}]\t{}", round, line);
        }
        Ok(CallbackAction::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn env(iteration: usize, begin_iteration: usize) -> CallbackEnv<'static> {
        CallbackEnv {
            iteration,
            begin_iteration,
            end_iteration: 100,
            learning_rate: 0.1,
            evaluation_results: &[],
        }
    }

    #[test]
    fn test_schedules() {
        let exp = LearningRateSchedule::ExponentialDecay {
            initial: 0.1,
            decay: 0.5,
        };
        assert_relative_eq!(exp.learning_rate(2), 0.025);

        let step = LearningRateSchedule::Step {
            initial: 1.0,
            step_size: 10,
            gamma: 0.1,
        };
        assert_relative_eq!(step.learning_rate(9), 1.0);
        assert_relative_eq!(step.learning_rate(10), 0.1);
    }

    #[test]
    fn test_schedule_uses_run_relative_round() {
        let mut schedule = LearningRateSchedule::custom(|i| 1.0 / (i as f64 + 1.0));
        let mut e = env(12, 10);
        schedule.before_iteration(&mut e).unwrap();
        assert_relative_eq!(e.learning_rate, 1.0 / 3.0);
    }

    #[test]
    fn test_invalid_rate_is_an_error() {
        let mut schedule = LearningRateSchedule::Constant(-1.0);
        assert!(schedule.before_iteration(&mut env(0, 0)).is_err());
    }

    #[test]
    fn test_log_evaluation_continues() {
        let mut log = LogEvaluation::new(1);
        let results = [EvalResult {
            data_name: "valid_0".into(),
            metric_name: "l2".into(),
            value: 0.5,
            higher_better: false,
        }];
        let e = CallbackEnv {
            evaluation_results: &results,
            ..env(0, 0)
        };
        assert_eq!(log.after_iteration(&e).unwrap(), CallbackAction::Continue);
    }
}
