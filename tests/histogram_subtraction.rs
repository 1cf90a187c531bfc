//! Trees grown with sibling histogram subtraction match trees grown by
//! building every histogram directly.

use lightgbm_engine::*;
use ndarray::{Array1, Array2};
use proptest::prelude::*;

fn grow(features: &Array2<f32>, labels: &Array1<f32>, subtraction: bool) -> Booster {
    let train = Dataset::builder()
        .features(features.clone())
        .labels(labels.clone())
        .build()
        .unwrap();
    let config = ConfigBuilder::new()
        .num_iterations(1)
        .num_leaves(8)
        .min_data_in_leaf(2)
        .boost_from_average(false)
        .use_histogram_subtraction(subtraction)
        .build()
        .unwrap();
    lightgbm_engine::train(config, &train, &[]).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_subtraction_matches_direct_build(
        rows in proptest::collection::vec((0u8..10, 0u8..10, 0u8..10, 0u8..5), 40..120)
    ) {
        // integer gradients keep every histogram sum exact
        let features = Array2::from_shape_fn((rows.len(), 3), |(i, j)| match j {
            0 => rows[i].0 as f32,
            1 => rows[i].1 as f32,
            _ => rows[i].2 as f32,
        });
        let labels = Array1::from_iter(rows.iter().map(|r| r.3 as f32));

        let subtracted = grow(&features, &labels, true);
        let direct = grow(&features, &labels, false);
        prop_assert_eq!(subtracted.trees(), direct.trees());
    }
}
