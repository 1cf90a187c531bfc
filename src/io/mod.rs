//! Model persistence.
//!
//! The file extension picks the format: `.json` is written as JSON, any
//! other path as bincode. [`save_model_as`] and [`load_model_as`] take the
//! format explicitly.

pub mod serialization;

use crate::boosting::Booster;
use crate::core::error::Result;
use log::info;
use std::fs;
use std::path::Path;

pub use serialization::SerializationFormat;

/// Format implied by a path's extension.
pub fn format_from_path(path: &Path) -> SerializationFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => SerializationFormat::Json,
        _ => SerializationFormat::Bincode,
    }
}

pub fn save_model<P: AsRef<Path>>(model: &Booster, path: P) -> Result<()> {
    let path = path.as_ref();
    save_model_as(model, path, format_from_path(path))
}

pub fn save_model_as<P: AsRef<Path>>(model: &Booster, path: P, format: SerializationFormat) -> Result<()> {
    let path = path.as_ref();
    let bytes = match format {
        SerializationFormat::Json => serialization::json::to_string(model)?.into_bytes(),
        SerializationFormat::Bincode => serialization::bincode::to_bytes(model)?,
    };
    fs::write(path, &bytes)?;
    info!(
        "Saved model with {} trees to {} ({}, {} bytes)",
        model.num_trees(),
        path.display(),
        format,
        bytes.len()
    );
    Ok(())
}

pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Booster> {
    let path = path.as_ref();
    load_model_as(path, format_from_path(path))
}

pub fn load_model_as<P: AsRef<Path>>(path: P, format: SerializationFormat) -> Result<Booster> {
    let path = path.as_ref();
    let model = match format {
        SerializationFormat::Json => serialization::json::from_str(&fs::read_to_string(path)?)?,
        SerializationFormat::Bincode => serialization::bincode::from_bytes(&fs::read(path)?)?,
    };
    info!("Loaded model with {} trees from {}", model.num_trees(), path.display());
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::LightGBMError;
    use crate::tree::Tree;

    #[test]
    fn test_format_from_path() {
        assert_eq!(format_from_path(Path::new("model.json")), SerializationFormat::Json);
        assert_eq!(format_from_path(Path::new("model.JSON")), SerializationFormat::Json);
        assert_eq!(format_from_path(Path::new("model.bin")), SerializationFormat::Bincode);
        assert_eq!(format_from_path(Path::new("model")), SerializationFormat::Bincode);
    }

    #[test]
    fn test_save_and_load_both_formats() {
        let dir = tempfile::tempdir().unwrap();
        let model = Booster::from_trees(vec![Tree::constant(0.7, 5)], 1, 3);
        for name in ["m.json", "m.bin"] {
            let path = dir.path().join(name);
            save_model(&model, &path).unwrap();
            assert_eq!(load_model(&path).unwrap(), model);
        }
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_model(dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, LightGBMError::IO { .. }));
    }

    #[test]
    fn test_wrong_format_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.json");
        let model = Booster::from_trees(vec![Tree::constant(0.7, 5)], 1, 3);
        save_model(&model, &path).unwrap();
        assert!(load_model_as(&path, SerializationFormat::Bincode).is_err());
    }
}
