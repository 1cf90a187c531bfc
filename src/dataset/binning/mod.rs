//! Feature binning.
//!
//! Bin boundaries are computed once per feature from a row sample of the
//! training matrix, in parallel across features.

pub mod mapper;

pub use mapper::{BinMapper, BinningParams};

use crate::core::error::Result;
use crate::core::types::*;
use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

/// Build one bin mapper per column of `features`.
///
/// When the matrix has more than `sample_cnt` rows, boundaries are computed
/// from a uniform row sample drawn with `seed`.
pub fn construct_bin_mappers(
    features: ArrayView2<'_, f32>,
    categorical_features: &[FeatureIndex],
    params: &BinningParams,
    sample_cnt: usize,
    seed: u64,
) -> Result<Vec<BinMapper>> {
    let num_data = features.nrows();
    let sample_rows: Option<Vec<usize>> = if sample_cnt > 0 && num_data > sample_cnt {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut rows = rand::seq::index::sample(&mut rng, num_data, sample_cnt).into_vec();
        rows.sort_unstable();
        Some(rows)
    } else {
        None
    };

    (0..features.ncols())
        .into_par_iter()
        .map(|feature| {
            let column = features.column(feature);
            let values: Vec<f32> = match &sample_rows {
                Some(rows) => rows.iter().map(|&r| column[r]).collect(),
                None => column.iter().copied().collect(),
            };
            let mapper = if categorical_features.contains(&feature) {
                BinMapper::new_categorical(&values, params)?
            } else {
                BinMapper::new_numerical(&values, params)?
            };
            if mapper.is_trivial() {
                log::debug!("Feature {} has no split candidates and is skipped", feature);
            }
            Ok(mapper)
        })
        .collect()
}
