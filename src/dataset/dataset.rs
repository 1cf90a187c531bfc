//! Core dataset structure.
//!
//! A [`Dataset`] owns the raw feature matrix, its column-major binned copy,
//! the bin mappers and the label [`Metadata`]. It is immutable once built;
//! validation datasets share the bin mappers of the training set they
//! reference so that both are discretized identically.

use crate::config::Config;
use crate::core::constants::*;
use crate::core::error::{LightGBMError, Result};
use crate::core::types::*;
use crate::dataset::binning::{construct_bin_mappers, BinMapper, BinningParams};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

/// Labels, weights, initial scores and query grouping of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    labels: Vec<Label>,
    weights: Option<Vec<Label>>,
    init_score: Option<Vec<Score>>,
    query_boundaries: Option<Vec<DataSize>>,
}

impl Metadata {
    /// Create metadata, validating every optional component against the
    /// number of labels.
    pub fn new(
        labels: Vec<Label>,
        weights: Option<Vec<Label>>,
        init_score: Option<Vec<Score>>,
        group_sizes: Option<Vec<usize>>,
    ) -> Result<Self> {
        let num_data = labels.len();

        if let Some(pos) = labels.iter().position(|l| !l.is_finite()) {
            return Err(LightGBMError::dataset(format!(
                "Label at row {} is not finite",
                pos
            )));
        }

        if let Some(weights) = &weights {
            if weights.len() != num_data {
                return Err(LightGBMError::dimension_mismatch(
                    format!("weights length: {}", num_data),
                    format!("weights length: {}", weights.len()),
                ));
            }
            if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(LightGBMError::dataset(
                    "Weights must be finite and non-negative",
                ));
            }
        }

        if let Some(init_score) = &init_score {
            if init_score.is_empty() || init_score.len() % num_data.max(1) != 0 {
                return Err(LightGBMError::dimension_mismatch(
                    format!("init_score length as a multiple of {}", num_data),
                    format!("init_score length: {}", init_score.len()),
                ));
            }
        }

        let query_boundaries = match group_sizes {
            Some(sizes) => {
                let total: usize = sizes.iter().sum();
                if total != num_data {
                    return Err(LightGBMError::dataset(format!(
                        "Sum of query group sizes ({}) does not match the number of rows ({})",
                        total, num_data
                    )));
                }
                if sizes.iter().any(|&s| s == 0) {
                    return Err(LightGBMError::dataset("Query groups must not be empty"));
                }
                let mut boundaries = Vec::with_capacity(sizes.len() + 1);
                boundaries.push(0);
                let mut acc = 0usize;
                for size in sizes {
                    acc += size;
                    boundaries.push(acc as DataSize);
                }
                Some(boundaries)
            }
            None => None,
        };

        Ok(Metadata {
            labels,
            weights,
            init_score,
            query_boundaries,
        })
    }

    pub fn num_data(&self) -> usize {
        self.labels.len()
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn weights(&self) -> Option<&[Label]> {
        self.weights.as_deref()
    }

    /// Weight of one row, 1 when the dataset is unweighted.
    #[inline]
    pub fn weight(&self, row: usize) -> f64 {
        self.weights.as_ref().map_or(1.0, |w| w[row] as f64)
    }

    /// Sum of all row weights.
    pub fn sum_weights(&self) -> f64 {
        match &self.weights {
            Some(w) => w.iter().map(|&x| x as f64).sum(),
            None => self.labels.len() as f64,
        }
    }

    /// Initial raw scores, class-major when there are several classes.
    pub fn init_score(&self) -> Option<&[Score]> {
        self.init_score.as_deref()
    }

    /// Row offsets of the queries, `num_queries + 1` entries starting at 0.
    pub fn query_boundaries(&self) -> Option<&[DataSize]> {
        self.query_boundaries.as_deref()
    }

    pub fn num_queries(&self) -> usize {
        self.query_boundaries
            .as_ref()
            .map_or(0, |b| b.len().saturating_sub(1))
    }
}

/// Per-feature information kept with a trained model.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FeatureInfo {
    pub feature_type: FeatureType,
    pub missing_type: MissingType,
    pub num_bins: usize,
    /// Category values in bin order (categorical features only)
    pub categories: Vec<i32>,
}

/// Main dataset structure for training and evaluation
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Raw feature matrix (num_data × num_features)
    raw_features: Array2<f32>,
    /// Binned features (num_features × num_data)
    binned: Array2<BinIndex>,
    bin_mappers: Arc<Vec<BinMapper>>,
    binning: BinningParams,
    bin_construct_sample_cnt: usize,
    metadata: Metadata,
    feature_names: Vec<String>,
}

impl Dataset {
    /// Create a dataset builder
    pub fn builder() -> DatasetBuilder {
        DatasetBuilder::new()
    }

    /// Get number of data points
    pub fn num_data(&self) -> usize {
        self.raw_features.nrows()
    }

    /// Get number of features
    pub fn num_features(&self) -> usize {
        self.raw_features.ncols()
    }

    /// Raw feature matrix, one row per data point
    pub fn raw_features(&self) -> ArrayView2<'_, f32> {
        self.raw_features.view()
    }

    /// Raw values of one data point
    pub fn raw_row(&self, row: usize) -> ArrayView1<'_, f32> {
        self.raw_features.row(row)
    }

    /// Bin indices of one feature for every row
    #[inline]
    pub fn feature_bins(&self, feature: FeatureIndex) -> ArrayView1<'_, BinIndex> {
        self.binned.row(feature)
    }

    pub fn bin_mappers(&self) -> &[BinMapper] {
        &self.bin_mappers
    }

    pub fn bin_mapper(&self, feature: FeatureIndex) -> &BinMapper {
        &self.bin_mappers[feature]
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn labels(&self) -> &[Label] {
        self.metadata.labels()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Parameters the bin mappers were built with
    pub fn binning_params(&self) -> BinningParams {
        self.binning
    }

    pub fn bin_construct_sample_cnt(&self) -> usize {
        self.bin_construct_sample_cnt
    }

    /// Indices of the categorical features
    pub fn categorical_features(&self) -> Vec<FeatureIndex> {
        self.bin_mappers
            .iter()
            .enumerate()
            .filter(|(_, m)| m.feature_type() == FeatureType::Categorical)
            .map(|(i, _)| i)
            .collect()
    }

    /// Type of every feature, in column order
    pub fn feature_types(&self) -> Vec<FeatureType> {
        self.bin_mappers.iter().map(|m| m.feature_type()).collect()
    }

    /// Model-level description of every feature
    pub fn feature_infos(&self) -> Vec<FeatureInfo> {
        self.bin_mappers
            .iter()
            .map(|m| FeatureInfo {
                feature_type: m.feature_type(),
                missing_type: m.missing_type(),
                num_bins: m.num_bins(),
                categories: m.categories().to_vec(),
            })
            .collect()
    }

    /// Whether `other` was discretized with the same bin mappers.
    pub fn shares_bins_with(&self, other: &Dataset) -> bool {
        Arc::ptr_eq(&self.bin_mappers, &other.bin_mappers)
            || *self.bin_mappers == *other.bin_mappers
    }
}

/// Dataset builder for constructing datasets with validation
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    features: Option<Array2<f32>>,
    labels: Option<Array1<f32>>,
    weights: Option<Array1<f32>>,
    init_score: Option<Vec<Score>>,
    group_sizes: Option<Vec<usize>>,
    feature_names: Option<Vec<String>>,
    categorical_features: Option<Vec<FeatureIndex>>,
    reference: Option<(Arc<Vec<BinMapper>>, BinningParams, usize)>,
    max_bin: Option<usize>,
    min_data_in_bin: Option<usize>,
    bin_construct_sample_cnt: Option<usize>,
    use_missing: Option<bool>,
}

impl DatasetBuilder {
    /// Create a new dataset builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set features
    pub fn features(mut self, features: Array2<f32>) -> Self {
        self.features = Some(features);
        self
    }

    /// Set labels
    pub fn labels(mut self, labels: Array1<f32>) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Set weights
    pub fn weights(mut self, weights: Array1<f32>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Set initial raw scores (`num_data × num_class`, class-major)
    pub fn init_score(mut self, init_score: Vec<Score>) -> Self {
        self.init_score = Some(init_score);
        self
    }

    /// Set query group sizes; consecutive rows form one query
    pub fn group(mut self, group_sizes: Vec<usize>) -> Self {
        self.group_sizes = Some(group_sizes);
        self
    }

    /// Set feature names
    pub fn feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    /// Set categorical feature indices
    pub fn categorical_features(mut self, features: Vec<FeatureIndex>) -> Self {
        self.categorical_features = Some(features);
        self
    }

    /// Reuse the bin mappers of a training dataset
    pub fn reference(mut self, reference: &Dataset) -> Self {
        self.reference = Some((
            Arc::clone(&reference.bin_mappers),
            reference.binning,
            reference.bin_construct_sample_cnt,
        ));
        if self.feature_names.is_none() {
            self.feature_names = Some(reference.feature_names.clone());
        }
        self
    }

    pub fn max_bin(mut self, max_bin: usize) -> Self {
        self.max_bin = Some(max_bin);
        self
    }

    pub fn min_data_in_bin(mut self, min_data: usize) -> Self {
        self.min_data_in_bin = Some(min_data);
        self
    }

    pub fn bin_construct_sample_cnt(mut self, count: usize) -> Self {
        self.bin_construct_sample_cnt = Some(count);
        self
    }

    pub fn use_missing(mut self, enabled: bool) -> Self {
        self.use_missing = Some(enabled);
        self
    }

    /// Take binning parameters and categorical columns from a training
    /// configuration, without overriding values set on the builder.
    pub fn config(mut self, config: &Config) -> Self {
        self.max_bin.get_or_insert(config.max_bin);
        self.min_data_in_bin.get_or_insert(config.min_data_in_bin);
        self.bin_construct_sample_cnt
            .get_or_insert(config.bin_construct_sample_cnt);
        self.use_missing.get_or_insert(config.use_missing);
        if self.categorical_features.is_none() && !config.categorical_feature.is_empty() {
            self.categorical_features = Some(config.categorical_feature.clone());
        }
        self
    }

    /// Build the dataset
    pub fn build(self) -> Result<Dataset> {
        let features = self
            .features
            .ok_or_else(|| crate::dataset_error!("Features are required"))?;
        let labels = self
            .labels
            .ok_or_else(|| crate::dataset_error!("Labels are required"))?;

        let num_data = features.nrows();
        let num_features = features.ncols();
        crate::ensure!(num_data > 0, crate::dataset_error!("Dataset has no rows"));
        crate::ensure!(num_features > 0, crate::dataset_error!("Dataset has no features"));
        if labels.len() != num_data {
            return Err(LightGBMError::dimension_mismatch(
                format!("labels length: {}", num_data),
                format!("labels length: {}", labels.len()),
            ));
        }

        let feature_names = match self.feature_names {
            Some(names) => {
                if names.len() != num_features {
                    return Err(LightGBMError::dimension_mismatch(
                        format!("{} feature names", num_features),
                        format!("{} feature names", names.len()),
                    ));
                }
                let unique: HashSet<&String> = names.iter().collect();
                crate::ensure!(
                    unique.len() == names.len(),
                    crate::dataset_error!("Feature names must be unique")
                );
                names
            }
            None => (0..num_features).map(default_feature_name).collect(),
        };

        let categorical = self.categorical_features.unwrap_or_default();
        if let Some(&bad) = categorical.iter().find(|&&f| f >= num_features) {
            return Err(LightGBMError::invalid_parameter(
                "categorical_feature",
                bad.to_string(),
                format!("index out of range for {} features", num_features),
            ));
        }

        let (bin_mappers, binning, bin_construct_sample_cnt) = match self.reference {
            Some((mappers, binning, sample_cnt)) => {
                if mappers.len() != num_features {
                    return Err(LightGBMError::dimension_mismatch(
                        format!("{} features as in the reference dataset", mappers.len()),
                        format!("{} features", num_features),
                    ));
                }
                (mappers, binning, sample_cnt)
            }
            None => {
                let params = BinningParams {
                    max_bin: self.max_bin.unwrap_or(DEFAULT_MAX_BIN),
                    min_data_in_bin: self.min_data_in_bin.unwrap_or(DEFAULT_MIN_DATA_IN_BIN),
                    use_missing: self.use_missing.unwrap_or(true),
                };
                let sample_cnt = self
                    .bin_construct_sample_cnt
                    .unwrap_or(DEFAULT_BIN_CONSTRUCT_SAMPLE_CNT);
                let mappers = construct_bin_mappers(
                    features.view(),
                    &categorical,
                    &params,
                    sample_cnt,
                    DEFAULT_DATA_RANDOM_SEED,
                )?;
                (Arc::new(mappers), params, sample_cnt)
            }
        };

        let mut binned = Array2::<BinIndex>::zeros((num_features, num_data));
        binned
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(feature, mut row)| {
                let mapper = &bin_mappers[feature];
                let column = features.column(feature);
                for (bin, &value) in row.iter_mut().zip(column.iter()) {
                    *bin = mapper.value_to_bin(value as f64);
                }
            });

        let metadata = Metadata::new(
            labels.to_vec(),
            self.weights.map(|w| w.to_vec()),
            self.init_score,
            self.group_sizes,
        )?;

        log::debug!(
            "Constructed dataset with {} rows and {} features",
            num_data,
            num_features
        );

        Ok(Dataset {
            raw_features: features,
            binned,
            bin_mappers,
            binning,
            bin_construct_sample_cnt,
            metadata,
            feature_names,
        })
    }
}
