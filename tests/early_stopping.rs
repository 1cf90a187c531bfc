//! Early stopping and training state integration tests.

use lightgbm_engine::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mod common;
use common::*;

/// Metric whose value improves for `improving` evaluations and worsens
/// afterwards.
fn scripted_metric(name: &str, improving: usize) -> CustomMetric {
    let calls = Arc::new(AtomicUsize::new(0));
    CustomMetric::new(name, false, move |_: &[f64], _: &Metadata| {
        let round = calls.fetch_add(1, Ordering::SeqCst) + 1;
        let value = if round <= improving {
            10.0 - round as f64
        } else {
            10.0 - improving as f64 + (round - improving) as f64
        };
        Ok(value)
    })
}

fn regression_sets() -> (Dataset, Dataset) {
    let features = create_test_features(300, 3, 17);
    let labels = create_test_labels_regression(&features);
    let train = create_dataset(features.clone(), labels.clone());
    let valid = create_valid_dataset(features, labels, &train);
    (train, valid)
}

#[test]
fn test_patience_scenario() {
    let (train, valid) = regression_sets();
    let config = ConfigBuilder::new()
        .num_iterations(100)
        .early_stopping_round(5)
        .metric(vec![MetricKind::None])
        .build()
        .unwrap();

    let mut gbdt = GBDT::new(config, &train).unwrap();
    gbdt.add_valid(&valid, None).unwrap();
    gbdt.add_custom_metric(scripted_metric("scripted", 3)).unwrap();
    while !gbdt.train_one_iter().unwrap() {}

    assert_eq!(gbdt.state(), TrainingState::StoppedEarlyStop);
    assert_eq!(gbdt.current_iteration(), 8);
    assert_eq!(gbdt.best_iteration(), Some(3));

    let booster = gbdt.into_booster();
    // trees past the best iteration are kept
    assert_eq!(booster.num_iterations(), 8);
    assert_eq!(booster.best_iteration(), Some(3));
    assert_eq!(booster.best_score().len(), 1);
    assert_eq!(booster.best_score()[0].value, 7.0);
    assert_eq!(booster.best_score()[0].data_name, "valid_0");
    assert_eq!(booster.iteration_range(0, None), (0, 3));
}

#[test]
fn test_max_rounds_state() {
    let (train, valid) = regression_sets();
    let config = ConfigBuilder::new()
        .num_iterations(12)
        .early_stopping_round(50)
        .build()
        .unwrap();
    let mut gbdt = GBDT::new(config, &train).unwrap();
    gbdt.add_valid(&valid, Some("holdout")).unwrap();
    while !gbdt.train_one_iter().unwrap() {}

    assert_eq!(gbdt.state(), TrainingState::StoppedMaxRounds);
    assert_eq!(gbdt.current_iteration(), 12);
    let series = gbdt.eval_history().get("holdout", "l2").unwrap();
    assert_eq!(series.len(), 12);
    // validation equals training data, so the loss keeps falling
    assert_eq!(gbdt.best_iteration(), Some(12));
}

#[test]
fn test_first_metric_only() {
    let (train, valid) = regression_sets();
    let build = |first_only: bool| {
        ConfigBuilder::new()
            .num_iterations(100)
            .early_stopping_round(4)
            .first_metric_only(first_only)
            .metric(vec![MetricKind::None])
            .build()
            .unwrap()
    };

    // the second metric keeps improving; only first_metric_only stops early
    let mut gbdt = GBDT::new(build(true), &train).unwrap();
    gbdt.add_valid(&valid, None).unwrap();
    gbdt.add_custom_metric(scripted_metric("first", 2)).unwrap();
    gbdt.add_custom_metric(scripted_metric("second", 1000)).unwrap();
    while !gbdt.train_one_iter().unwrap() {}
    assert_eq!(gbdt.state(), TrainingState::StoppedEarlyStop);
    assert_eq!(gbdt.current_iteration(), 6);

    let mut gbdt = GBDT::new(build(false), &train).unwrap();
    gbdt.add_valid(&valid, None).unwrap();
    gbdt.add_custom_metric(scripted_metric("first", 2)).unwrap();
    gbdt.add_custom_metric(scripted_metric("second", 1000)).unwrap();
    for _ in 0..30 {
        assert!(!gbdt.train_one_iter().unwrap());
    }
    assert_eq!(gbdt.state(), TrainingState::RoundInProgress);
}

#[test]
fn test_training_set_does_not_drive_early_stopping() {
    let (train, _) = regression_sets();
    let config = ConfigBuilder::new()
        .num_iterations(10)
        .early_stopping_round(1)
        .is_provide_training_metric(true)
        .metric(vec![MetricKind::None])
        .build()
        .unwrap();
    let mut gbdt = GBDT::new(config, &train).unwrap();
    gbdt.add_custom_metric(scripted_metric("scripted", 0)).unwrap();
    while !gbdt.train_one_iter().unwrap() {}
    assert_eq!(gbdt.state(), TrainingState::StoppedMaxRounds);
    assert_eq!(gbdt.best_iteration(), None);
}

#[test]
fn test_callback_stop() {
    struct StopAfter(usize);

    impl Callback for StopAfter {
        fn name(&self) -> &str {
            "stop_after"
        }

        fn after_iteration(&mut self, env: &CallbackEnv<'_>) -> anyhow::Result<CallbackAction> {
            Ok(if env.iteration + 1 >= self.0 {
                CallbackAction::Stop
            } else {
                CallbackAction::Continue
            })
        }
    }

    let (train, _) = regression_sets();
    let config = ConfigBuilder::new().num_iterations(50).build().unwrap();
    let mut gbdt = GBDT::new(config, &train).unwrap();
    gbdt.add_callback(StopAfter(4));
    gbdt.add_callback(LogEvaluation::new(1));
    while !gbdt.train_one_iter().unwrap() {}
    assert_eq!(gbdt.state(), TrainingState::StoppedEarlyStop);
    assert_eq!(gbdt.current_iteration(), 4);
}

#[test]
fn test_callback_error_is_fatal() {
    struct Failing;

    impl Callback for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn before_iteration(&mut self, env: &mut CallbackEnv<'_>) -> anyhow::Result<CallbackAction> {
            if env.iteration == 2 {
                anyhow::bail!("boom");
            }
            Ok(CallbackAction::Continue)
        }
    }

    let (train, _) = regression_sets();
    let config = ConfigBuilder::new().num_iterations(10).build().unwrap();
    let mut gbdt = GBDT::new(config, &train).unwrap();
    gbdt.add_callback(Failing);
    assert!(!gbdt.train_one_iter().unwrap());
    assert!(!gbdt.train_one_iter().unwrap());
    let err = gbdt.train_one_iter().unwrap_err();
    assert!(matches!(err, LightGBMError::UserCallback { .. }));
    assert_eq!(gbdt.state(), TrainingState::StoppedError);
    assert_eq!(gbdt.current_iteration(), 2);
}
