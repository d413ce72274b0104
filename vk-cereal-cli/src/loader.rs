//! Schema loading.
//!
//! Schemas are JSON documents deserialized straight into the engine's
//! [`Schema`] model and validated before they are handed to a run.

use std::path::Path;

use tracing::debug;
use vk_cereal::Schema;

use crate::error::{CliResult, LoadError};

/// Load and validate a schema file.
pub fn load_schema(path: &Path) -> CliResult<Schema> {
    if !path.exists() {
        return Err(LoadError::NotFound {
            path: path.to_path_buf(),
        }
        .into());
    }

    let content = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let schema = parse_schema(path, &content)?;
    debug!(
        path = %path.display(),
        features = schema.features.len(),
        "Schema loaded"
    );
    Ok(schema)
}

/// Parse and validate schema text read from `path`.
pub fn parse_schema(path: &Path, content: &str) -> CliResult<Schema> {
    let schema: Schema = serde_json::from_str(content).map_err(|e| LoadError::InvalidJson {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    schema.validate().map_err(|e| LoadError::Invalid {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use vk_cereal::schema::Element;

    #[test]
    fn test_parse_schema() {
        let json = r#"{
            "features": [{
                "name": "VK_VERSION_1_0",
                "require": ["vkCmdDraw"],
                "elements": [
                    {"category": "type", "name": "VkDevice", "kind": "handle"},
                    {"category": "command", "name": "vkCmdDraw"}
                ]
            }]
        }"#;

        let schema = parse_schema(Path::new("vk.json"), json).unwrap();
        assert_eq!(schema.features.len(), 1);
        assert_eq!(schema.features[0].require, vec!["vkCmdDraw"]);
        assert!(matches!(schema.features[0].elements[1], Element::Command(_)));
    }

    #[test]
    fn test_duplicate_definition_is_rejected() {
        let json = r#"{
            "features": [{
                "name": "F",
                "elements": [
                    {"category": "struct", "name": "A"},
                    {"category": "struct", "name": "A"}
                ]
            }]
        }"#;

        let err = parse_schema(Path::new("dup.json"), json).unwrap_err();
        assert!(matches!(err, CliError::Load(LoadError::Invalid { .. })));
    }

    #[test]
    fn test_malformed_json() {
        let err = parse_schema(Path::new("bad.json"), "{\"features\": [").unwrap_err();
        assert!(matches!(err, CliError::Load(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn test_missing_file() {
        let err = load_schema(Path::new("definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, CliError::Load(LoadError::NotFound { .. })));
    }
}
