//! Objective functions.
//!
//! Every built-in loss implements [`ObjectiveFunction`]; [`create_objective`]
//! maps a configuration onto one of them. User objectives are supplied as a
//! [`CustomObjective`] next to a configuration whose objective is `custom`.

pub mod binary;
pub mod custom;
pub mod multiclass;
pub mod ranking;
pub mod regression;

pub use binary::BinaryLogloss;
pub use custom::{CustomObjective, GradientFn};
pub use multiclass::MulticlassSoftmax;
pub use ranking::LambdaRank;
pub use regression::{Huber, Mape, Quantile, RegressionL1, RegressionL2};

use crate::config::Config;
use crate::core::error::{LightGBMError, Result};
use crate::core::traits::ObjectiveFunction;
use crate::core::types::ObjectiveType;

/// Create the built-in objective named by `config.objective`.
pub fn create_objective(config: &Config) -> Result<Box<dyn ObjectiveFunction>> {
    let objective: Box<dyn ObjectiveFunction> = match config.objective {
        ObjectiveType::Regression => Box::new(RegressionL2),
        ObjectiveType::RegressionL1 => Box::new(RegressionL1),
        ObjectiveType::Huber => Box::new(Huber::new(config.alpha)),
        ObjectiveType::Quantile => Box::new(Quantile::new(config.alpha)),
        ObjectiveType::Mape => Box::new(Mape::default()),
        ObjectiveType::Binary => Box::new(BinaryLogloss::new(
            config.sigmoid,
            config.is_unbalance,
            config.scale_pos_weight,
        )?),
        ObjectiveType::Multiclass => Box::new(MulticlassSoftmax::new(config.num_class)?),
        ObjectiveType::LambdaRank => Box::new(LambdaRank::new(
            config.sigmoid,
            config.lambdarank_truncation_level,
            config.lambdarank_norm,
            config.label_gain.clone(),
        )?),
        ObjectiveType::Custom => {
            return Err(LightGBMError::config(
                "objective=custom requires a CustomObjective to be supplied for training",
            ))
        }
    };
    Ok(objective)
}
