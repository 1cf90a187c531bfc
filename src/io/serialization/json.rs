//! JSON model encoding.
//!
//! Floats are written with full round-trip precision; non-finite values
//! are stored as strings (see [`super::float_repr`]).

use crate::boosting::Booster;
use crate::core::error::Result;
use crate::io::serialization::ModelEnvelope;

/// Pretty-printed JSON document of a model.
pub fn to_string(model: &Booster) -> Result<String> {
    Ok(serde_json::to_string_pretty(&ModelEnvelope::wrap(model))?)
}

pub fn from_str(text: &str) -> Result<Booster> {
    let envelope: ModelEnvelope<Booster> = serde_json::from_str(text)?;
    envelope.unwrap_model()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::MODEL_FORMAT_VERSION;
    use crate::core::error::LightGBMError;
    use crate::tree::Tree;

    #[test]
    fn test_document_shape() {
        let model = Booster::from_trees(vec![Tree::constant(0.1, 3)], 1, 2);
        let text = to_string(&model).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["format_version"], MODEL_FORMAT_VERSION);
        assert!(value["model"]["trees"].is_array());
        assert_eq!(from_str(&text).unwrap(), model);
    }

    #[test]
    fn test_version_mismatch() {
        let model = Booster::from_trees(vec![Tree::constant(0.1, 3)], 1, 2);
        let mut value: serde_json::Value = serde_json::from_str(&to_string(&model).unwrap()).unwrap();
        value["format_version"] = serde_json::json!(MODEL_FORMAT_VERSION + 1);
        let err = from_str(&value.to_string()).unwrap_err();
        assert!(matches!(err, LightGBMError::Serialization { .. }));
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(matches!(from_str("{\"model\": 3"), Err(LightGBMError::Json { .. })));
    }
}
