//! Common test utilities for integration tests.
#![allow(dead_code)]

use lightgbm_engine::*;
use ndarray::{Array1, Array2};
use rand::prelude::*;

/// Uniform features in `[-5, 5)`.
pub fn create_test_features(num_samples: usize, num_features: usize, seed: u64) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_simple_fn((num_samples, num_features), || rng.gen_range(-5.0..5.0))
}

/// Linear target: `sum_j x_j * 0.1 * (j + 1)`.
pub fn create_test_labels_regression(features: &Array2<f32>) -> Array1<f32> {
    Array1::from_iter(features.rows().into_iter().map(|row| {
        row.iter()
            .enumerate()
            .map(|(j, &x)| x * (j + 1) as f32 * 0.1)
            .sum::<f32>()
    }))
}

/// 1 when the alternating-sign sum of the features is positive.
pub fn create_test_labels_binary(features: &Array2<f32>) -> Array1<f32> {
    Array1::from_iter(features.rows().into_iter().map(|row| {
        let score: f32 = row
            .iter()
            .enumerate()
            .map(|(j, &x)| if j % 2 == 0 { x } else { -x })
            .sum();
        if score > 0.0 {
            1.0
        } else {
            0.0
        }
    }))
}

/// Class given by which third of `[-5, 5)` the first feature falls in.
pub fn create_test_labels_multiclass(features: &Array2<f32>) -> Array1<f32> {
    features.column(0).mapv(|x| {
        if x < -5.0 / 3.0 {
            0.0
        } else if x < 5.0 / 3.0 {
            1.0
        } else {
            2.0
        }
    })
}

/// Labels drawn independently of the features.
pub fn create_noise_labels(num_samples: usize, seed: u64) -> Array1<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array1::from_iter((0..num_samples).map(|_| rng.gen_range(-1.0..1.0)))
}

/// Ranking data: `num_queries` queries of `query_size` documents each.
/// Relevance in `0..=3` grows with the first feature.
pub fn create_test_ranking(num_queries: usize, query_size: usize, seed: u64) -> (Array2<f32>, Array1<f32>, Vec<usize>) {
    let features = create_test_features(num_queries * query_size, 3, seed);
    let labels = features.column(0).mapv(|x| ((x + 5.0) / 2.5).floor().clamp(0.0, 3.0));
    (features, labels, vec![query_size; num_queries])
}

pub fn create_dataset(features: Array2<f32>, labels: Array1<f32>) -> Dataset {
    Dataset::builder()
        .features(features)
        .labels(labels)
        .build()
        .unwrap()
}

/// Validation dataset binned with `reference`'s bin mappers.
pub fn create_valid_dataset(features: Array2<f32>, labels: Array1<f32>, reference: &Dataset) -> Dataset {
    Dataset::builder()
        .features(features)
        .labels(labels)
        .reference(reference)
        .build()
        .unwrap()
}

pub fn mean(values: &[f32]) -> f64 {
    values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64
}

/// Mean squared error of predictions against labels.
pub fn mse(predictions: &Array2<f64>, labels: &Array1<f32>) -> f64 {
    predictions
        .column(0)
        .iter()
        .zip(labels)
        .map(|(&p, &y)| (p - y as f64).powi(2))
        .sum::<f64>()
        / labels.len() as f64
}

/// Last recorded value of a metric.
pub fn last_value(history: &EvalHistory, data_name: &str, metric_name: &str) -> f64 {
    *history
        .get(data_name, metric_name)
        .and_then(|series| series.last())
        .unwrap_or_else(|| panic!("no {} history for {}", metric_name, data_name))
}
