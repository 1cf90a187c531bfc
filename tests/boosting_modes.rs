//! DART, GOSS, random forest, bagging and continued training.

use lightgbm_engine::*;
use ndarray::Array2;

mod common;
use common::*;

fn regression_data(seed: u64) -> (Array2<f32>, Dataset) {
    let features = create_test_features(400, 4, seed);
    let labels = create_test_labels_regression(&features);
    let train = create_dataset(features.clone(), labels);
    (features, train)
}

fn training_l2(booster: &Booster) -> f64 {
    last_value(booster.eval_history(), "training", "l2")
}

#[test]
fn test_dart_is_seeded() {
    let (features, train) = regression_data(1);
    let config = ConfigBuilder::new()
        .boosting_type(BoostingType::DART)
        .num_iterations(25)
        .drop_rate(0.3)
        .skip_drop(0.0)
        .seed(7)
        .is_provide_training_metric(true)
        .build()
        .unwrap();

    let first = lightgbm_engine::train(config.clone(), &train, &[]).unwrap();
    let second = lightgbm_engine::train(config, &train, &[]).unwrap();
    assert_eq!(first.num_iterations(), 25);
    assert_eq!(first.predict(&features.view()).unwrap(), second.predict(&features.view()).unwrap());

    let series = first.eval_history().get("training", "l2").unwrap();
    assert!(series[24] < series[0]);
}

#[test]
fn test_dart_training_scores_match_predictions() {
    let (features, train) = regression_data(2);
    let config = ConfigBuilder::new()
        .boosting_type(BoostingType::DART)
        .num_iterations(15)
        .drop_rate(0.5)
        .skip_drop(0.0)
        .seed(3)
        .build()
        .unwrap();
    let mut gbdt = GBDT::new(config, &train).unwrap();
    while !gbdt.train_one_iter().unwrap() {}
    let scores = gbdt.train_scores().to_vec();
    let booster = gbdt.into_booster();
    let raw = booster
        .predict_with(&features.view(), &PredictConfig::new().with_raw_score(true))
        .unwrap();
    for (i, &s) in scores.iter().enumerate() {
        approx::assert_relative_eq!(raw[[i, 0]], s, epsilon = 1e-9, max_relative = 1e-9);
    }
}

#[test]
fn test_dart_disables_early_stopping() {
    let (features, train) = regression_data(4);
    let labels = create_test_labels_regression(&features);
    let valid = create_valid_dataset(features, labels, &train);
    let config = ConfigBuilder::new()
        .boosting_type(BoostingType::DART)
        .num_iterations(10)
        .early_stopping_round(1)
        .build()
        .unwrap();
    let mut gbdt = GBDT::new(config, &train).unwrap();
    gbdt.add_valid(&valid, None).unwrap();
    while !gbdt.train_one_iter().unwrap() {}
    assert_eq!(gbdt.state(), TrainingState::StoppedMaxRounds);
    assert_eq!(gbdt.best_iteration(), None);
}

#[test]
fn test_goss_trains() {
    let (_, train) = regression_data(5);
    let config = ConfigBuilder::new()
        .data_sample_strategy(DataSampleStrategy::Goss)
        .top_rate(0.2)
        .other_rate(0.1)
        .learning_rate(0.2)
        .num_iterations(40)
        .seed(11)
        .is_provide_training_metric(true)
        .build()
        .unwrap();
    let booster = lightgbm_engine::train(config, &train, &[]).unwrap();
    let series = booster.eval_history().get("training", "l2").unwrap();
    assert!(series[39] < 0.5 * series[0]);
}

#[test]
fn test_bagging_changes_the_model() {
    let (features, train) = regression_data(6);
    let base = ConfigBuilder::new().num_iterations(10).seed(1);
    let full = lightgbm_engine::train(base.clone().build().unwrap(), &train, &[]).unwrap();
    let bagged = lightgbm_engine::train(
        base.bagging_fraction(0.5).bagging_freq(1).build().unwrap(),
        &train,
        &[],
    )
    .unwrap();
    assert_ne!(
        full.predict(&features.view()).unwrap(),
        bagged.predict(&features.view()).unwrap()
    );
}

#[test]
fn test_random_forest_averages_trees() {
    let (features, train) = regression_data(8);
    let labels = create_test_labels_regression(&features);
    let config = ConfigBuilder::new()
        .boosting_type(BoostingType::RandomForest)
        .bagging_fraction(0.6)
        .bagging_freq(1)
        .feature_fraction(0.8)
        .num_iterations(20)
        .seed(5)
        .build()
        .unwrap();
    let booster = lightgbm_engine::train(config, &train, &[]).unwrap();
    assert!(booster.is_average_output());
    assert_eq!(booster.num_iterations(), 20);

    let predictions = booster.predict(&features.view()).unwrap();
    let low = labels.iter().cloned().fold(f32::MAX, f32::min) as f64;
    let high = labels.iter().cloned().fold(f32::MIN, f32::max) as f64;
    for &p in predictions.iter() {
        assert!(p >= low - 1e-9 && p <= high + 1e-9);
    }

    // the mean of the per-tree outputs
    let leaf_sum: f64 = booster.trees().iter().map(|t| t.predict(&features.row(0))).sum();
    approx::assert_relative_eq!(predictions[[0, 0]], leaf_sum / 20.0, epsilon = 1e-9);
}

#[test]
fn test_random_forest_requires_sampling() {
    let config = ConfigBuilder::new()
        .boosting_type(BoostingType::RandomForest)
        .build();
    assert!(config.is_err());
}

#[test]
fn test_continued_training() {
    let (features, train) = regression_data(9);
    let config = ConfigBuilder::new()
        .num_iterations(10)
        .is_provide_training_metric(true)
        .build()
        .unwrap();
    let first = lightgbm_engine::train(config.clone(), &train, &[]).unwrap();

    let mut gbdt = GBDT::new(config, &train).unwrap();
    gbdt.init_from(&first).unwrap();
    // scores are rebuilt from the existing trees before training resumes
    let before = first.predict(&features.view()).unwrap();
    for (i, &s) in gbdt.train_scores().iter().enumerate() {
        approx::assert_relative_eq!(before[[i, 0]], s, epsilon = 1e-9);
    }
    let continued = gbdt.train().unwrap();

    assert_eq!(continued.num_iterations(), 20);
    assert_eq!(&continued.trees()[..10], first.trees());
    assert!(training_l2(&continued) < training_l2(&first));
}

#[test]
fn test_continued_training_rejects_other_shapes() {
    let (_, train) = regression_data(10);
    let config = ConfigBuilder::new().num_iterations(3).build().unwrap();
    let model = lightgbm_engine::train(config.clone(), &train, &[]).unwrap();

    let features = create_test_features(100, 6, 3);
    let labels = create_test_labels_regression(&features);
    let wider = create_dataset(features, labels);
    let mut gbdt = GBDT::new(config, &wider).unwrap();
    assert!(gbdt.init_from(&model).is_err());
}

#[test]
fn test_custom_objective_matches_builtin_l2() {
    let (features, train) = regression_data(12);
    let config = ConfigBuilder::new()
        .num_iterations(15)
        .boost_from_average(false)
        .build()
        .unwrap();

    let builtin = lightgbm_engine::train(config.clone(), &train, &[]).unwrap();

    let objective = CustomObjective::new("my_l2", |scores: &[f64], metadata: &Metadata| {
        let gradients = scores
            .iter()
            .zip(metadata.labels())
            .map(|(&s, &y)| s - y as f64)
            .collect();
        Ok((gradients, vec![1.0; scores.len()]))
    });
    let custom_config = ConfigBuilder::new()
        .objective(ObjectiveType::Custom)
        .num_iterations(15)
        .metric(vec![MetricKind::L2])
        .build()
        .unwrap();
    let custom = GBDT::with_objective(custom_config, &train, Box::new(objective))
        .unwrap()
        .train()
        .unwrap();

    assert_eq!(custom.objective_name(), "my_l2");
    let a = builtin.predict(&features.view()).unwrap();
    let b = custom.predict(&features.view()).unwrap();
    for (x, y) in a.iter().zip(b.iter()) {
        approx::assert_relative_eq!(x, y, epsilon = 1e-9);
    }
}

#[test]
fn test_custom_objective_wrong_length_is_fatal() {
    let (_, train) = regression_data(13);
    let objective = CustomObjective::new("short", |_: &[f64], _: &Metadata| Ok((vec![0.0; 3], vec![1.0; 3])));
    let config = ConfigBuilder::new()
        .objective(ObjectiveType::Custom)
        .num_iterations(5)
        .build()
        .unwrap();
    let mut gbdt = GBDT::with_objective(config, &train, Box::new(objective)).unwrap();
    assert!(gbdt.train_one_iter().is_err());
    assert_eq!(gbdt.state(), TrainingState::StoppedError);
}

#[test]
fn test_learning_rate_schedule() {
    let (_, train) = regression_data(14);
    let config = ConfigBuilder::new().num_iterations(6).build().unwrap();
    let mut gbdt = GBDT::new(config, &train).unwrap();
    gbdt.add_callback(LearningRateSchedule::Step {
        initial: 0.2,
        step_size: 3,
        gamma: 0.5,
    });
    let booster = gbdt.train().unwrap();
    let rates: Vec<f64> = booster.trees().iter().map(|t| t.shrinkage()).collect();
    for (i, &r) in rates.iter().enumerate() {
        let expected = if i < 3 { 0.2 } else { 0.1 };
        approx::assert_relative_eq!(r, expected, epsilon = 1e-12);
    }
}

#[test]
fn test_explicit_thread_count() {
    let (features, train) = regression_data(15);
    let config = ConfigBuilder::new().num_iterations(5).num_threads(2).build().unwrap();
    let booster = lightgbm_engine::train(config, &train, &[]).unwrap();
    assert!(booster.predict(&features.view()).unwrap().iter().all(|p| p.is_finite()));
}
