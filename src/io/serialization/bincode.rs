//! Binary model encoding with bincode.

use crate::boosting::Booster;
use crate::core::error::Result;
use crate::io::serialization::ModelEnvelope;

pub fn to_bytes(model: &Booster) -> Result<Vec<u8>> {
    Ok(bincode::serialize(&ModelEnvelope::wrap(model))?)
}

pub fn from_bytes(bytes: &[u8]) -> Result<Booster> {
    let envelope: ModelEnvelope<Booster> = bincode::deserialize(bytes)?;
    envelope.unwrap_model()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;

    #[test]
    fn test_bytes_reload_exactly() {
        let model = Booster::from_trees(vec![Tree::constant(1.0 / 3.0, 3), Tree::constant(-0.25, 3)], 2, 1);
        let bytes = to_bytes(&model).unwrap();
        assert_eq!(from_bytes(&bytes).unwrap(), model);
    }

    #[test]
    fn test_truncated_input() {
        let model = Booster::from_trees(vec![Tree::constant(1.0, 3)], 1, 1);
        let bytes = to_bytes(&model).unwrap();
        assert!(from_bytes(&bytes[..bytes.len() / 2]).is_err());
    }
}
