//! DART: dropouts meet multiple additive regression trees.
//!
//! Before each round a random subset of earlier rounds is dropped from the
//! training scores, the new trees are fitted against the remaining ensemble
//! and shrunk by `lr / (1 + k)`, and the dropped rounds are then scaled by
//! `k / (k + 1)` so that the ensemble output keeps its magnitude. With
//! `xgboost_dart_mode` the factors become `lr / (lr + k)` and `k / (k + lr)`.
//!
//! [`Dart`] only decides which rounds drop and by how much trees are scaled;
//! the driver owns the trees and the score buffers.

use crate::config::Config;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug)]
pub struct Dart {
    drop_rate: f64,
    max_drop: i32,
    skip_drop: f64,
    xgboost_mode: bool,
    uniform_drop: bool,
    rng: StdRng,
    /// Weight of every round trained in this run, used for weighted drops
    tree_weights: Vec<f64>,
    sum_weight: f64,
    /// Rounds dropped in the current round, relative to this run
    drop_index: Vec<usize>,
    shrinkage_rate: f64,
}

impl Dart {
    pub fn new(config: &Config) -> Self {
        Dart {
            drop_rate: config.drop_rate,
            max_drop: config.max_drop,
            skip_drop: config.skip_drop,
            xgboost_mode: config.xgboost_dart_mode,
            uniform_drop: config.uniform_drop,
            rng: StdRng::seed_from_u64(config.random_seeds().drop),
            tree_weights: Vec::new(),
            sum_weight: 0.0,
            drop_index: Vec::new(),
            shrinkage_rate: config.learning_rate,
        }
    }

    /// Choose the rounds to drop before the next round is trained.
    ///
    /// `num_rounds` counts rounds already trained in this run. Returns the
    /// dropped rounds relative to this run, in increasing order.
    pub fn select_drops(&mut self, num_rounds: usize, learning_rate: f64) -> &[usize] {
        self.drop_index.clear();
        let skip = self.rng.gen::<f64>() < self.skip_drop;
        if !skip && num_rounds > 0 {
            let mut drop_rate = self.drop_rate;
            if self.uniform_drop {
                if self.max_drop > 0 {
                    drop_rate = drop_rate.min(self.max_drop as f64 / num_rounds as f64);
                }
                for i in 0..num_rounds {
                    if self.rng.gen::<f64>() < drop_rate {
                        self.drop_index.push(i);
                    }
                }
            } else if self.sum_weight > 0.0 {
                let inv_average_weight = self.tree_weights.len() as f64 / self.sum_weight;
                if self.max_drop > 0 {
                    drop_rate = drop_rate.min(self.max_drop as f64 * inv_average_weight / self.sum_weight);
                }
                for i in 0..num_rounds {
                    if self.rng.gen::<f64>() < drop_rate * self.tree_weights[i] * inv_average_weight {
                        self.drop_index.push(i);
                    }
                }
            }
        }

        let k = self.drop_index.len() as f64;
        self.shrinkage_rate = if !self.xgboost_mode {
            learning_rate / (1.0 + k)
        } else if self.drop_index.is_empty() {
            learning_rate
        } else {
            learning_rate / (learning_rate + k)
        };
        if !self.drop_index.is_empty() {
            debug!("DART dropped {} of {} rounds", self.drop_index.len(), num_rounds);
        }
        &self.drop_index
    }

    pub fn dropped(&self) -> &[usize] {
        &self.drop_index
    }

    /// Shrinkage applied to the trees of the current round.
    pub fn shrinkage_rate(&self) -> f64 {
        self.shrinkage_rate
    }

    /// Factor applied to every dropped tree once the round is trained.
    pub fn normalize_factor(&self, learning_rate: f64) -> f64 {
        let k = self.drop_index.len() as f64;
        if self.xgboost_mode {
            k / (k + learning_rate)
        } else {
            k / (k + 1.0)
        }
    }

    /// Record the round's weights after the dropped trees were rescaled.
    pub fn finish_round(&mut self, learning_rate: f64) {
        if self.uniform_drop {
            return;
        }
        let factor = self.normalize_factor(learning_rate);
        let k = self.drop_index.len() as f64;
        let removed = if self.xgboost_mode {
            1.0 / (k + learning_rate)
        } else {
            1.0 / (k + 1.0)
        };
        for &i in &self.drop_index {
            self.sum_weight -= self.tree_weights[i] * removed;
            self.tree_weights[i] *= factor;
        }
        self.tree_weights.push(self.shrinkage_rate);
        self.sum_weight += self.shrinkage_rate;
    }

    /// Forget the drops of a round that produced no trees.
    pub fn cancel_round(&mut self) {
        self.drop_index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::core::types::BoostingType;
    use approx::assert_relative_eq;

    fn dart(drop_rate: f64, skip_drop: f64, uniform: bool) -> Dart {
        let mut config = ConfigBuilder::new()
            .boosting_type(BoostingType::DART)
            .drop_rate(drop_rate)
            .skip_drop(skip_drop)
            .max_drop(-1)
            .build()
            .unwrap();
        config.uniform_drop = uniform;
        Dart::new(&config)
    }

    #[test]
    fn test_first_round_drops_nothing() {
        let mut d = dart(1.0, 0.0, true);
        assert!(d.select_drops(0, 0.1).is_empty());
        assert_relative_eq!(d.shrinkage_rate(), 0.1);
    }

    #[test]
    fn test_full_drop_rate_drops_everything() {
        let mut d = dart(1.0, 0.0, true);
        let dropped = d.select_drops(4, 0.1).to_vec();
        assert_eq!(dropped, vec![0, 1, 2, 3]);
        assert_relative_eq!(d.shrinkage_rate(), 0.1 / 5.0);
        assert_relative_eq!(d.normalize_factor(0.1), 4.0 / 5.0);
    }

    #[test]
    fn test_skip_drop_one_never_drops() {
        let mut d = dart(1.0, 1.0, true);
        for round in 1..10 {
            assert!(d.select_drops(round, 0.1).is_empty());
        }
    }

    #[test]
    fn test_weighted_drop_tracks_weights() {
        let mut d = dart(1.0, 0.0, false);
        d.select_drops(0, 0.5);
        d.finish_round(0.5);
        assert_relative_eq!(d.sum_weight, 0.5);

        let dropped = d.select_drops(1, 0.5).to_vec();
        assert_eq!(dropped, vec![0]);
        d.finish_round(0.5);
        // dropped round keeps half its weight, new round weighs lr / 2
        assert_relative_eq!(d.tree_weights[0], 0.25);
        assert_relative_eq!(d.tree_weights[1], 0.25);
        assert_relative_eq!(d.sum_weight, 0.5);
    }

    #[test]
    fn test_xgboost_mode_factors() {
        let mut config = ConfigBuilder::new()
            .boosting_type(BoostingType::DART)
            .drop_rate(1.0)
            .skip_drop(0.0)
            .build()
            .unwrap();
        config.xgboost_dart_mode = true;
        config.uniform_drop = true;
        config.max_drop = -1;
        let mut d = Dart::new(&config);
        d.select_drops(2, 0.5);
        assert_relative_eq!(d.shrinkage_rate(), 0.5 / 2.5);
        assert_relative_eq!(d.normalize_factor(0.5), 2.0 / 2.5);
    }
}
