//! JSON Schema validation of rule documents

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult, ValidationIssue};
use crate::loader::{parse_document, DocumentFormat};

/// Schema shipped with the crate, used when no schema path is configured
pub const BUNDLED_SCHEMA: &str = include_str!("../schema/modes.schema.json");

/// A compiled draft-07 schema
pub struct CompiledSchema {
    inner: JSONSchema,
}

impl CompiledSchema {
    /// Compile a schema document; `source` is only used in error messages
    pub fn compile(schema: &Value, source: &Path) -> ConfigResult<Self> {
        let inner = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(schema)
            .map_err(|e| ConfigError::InvalidSchema {
                path: source.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(Self { inner })
    }

    /// The schema embedded in this crate
    pub fn bundled() -> ConfigResult<Self> {
        let source = Path::new("<bundled modes.schema.json>");
        let schema = parse_document(BUNDLED_SCHEMA, DocumentFormat::Json, source)?;
        Self::compile(&schema, source)
    }

    /// Read and compile a schema file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        debug!("Loading schema: {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        let schema = parse_document(&content, DocumentFormat::from_path(path), path)?;
        Self::compile(&schema, path)
    }

    /// Check a document, collecting every violation
    pub fn validate(&self, document: &Value) -> Result<(), Vec<ValidationIssue>> {
        self.inner.validate(document).map_err(|errors| {
            errors
                .map(|e| ValidationIssue::new(e.instance_path.to_string(), e.to_string()))
                .collect()
        })
    }
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> CompiledSchema {
        CompiledSchema::bundled().unwrap()
    }

    fn paths(result: Result<(), Vec<ValidationIssue>>) -> Vec<String> {
        result.unwrap_err().into_iter().map(|i| i.path).collect()
    }

    #[test]
    fn test_bundled_schema_accepts_valid_document() {
        let doc = json!({
            "rooms": ["kuchyna", "spalna"],
            "groups": {"all": ["kuchyna", "spalna"]},
            "base_regime_by_room": {"spalna": "NOC"},
            "modes": [{
                "name": "vikend",
                "priority": 20,
                "activation": {
                    "dow": ["sat", "sun"],
                    "tod": ["07:00-22:00"],
                    "date_range": {"from": "12-24", "to": "01-06"},
                    "holiday": false,
                    "calendar_tag": "DOVOLENKA",
                    "calendar_mode": "hosty"
                },
                "room_regime": {"all": "VIKEND"}
            }]
        });
        assert!(schema().validate(&doc).is_ok());
    }

    #[test]
    fn test_missing_required_fields() {
        let doc = json!({"rooms": [], "modes": [{"name": "x"}]});
        let issues = schema().validate(&doc).unwrap_err();
        assert!(issues.iter().all(|i| i.path == "/modes/0"));
        assert!(issues.iter().any(|i| i.message.contains("priority")));
        assert!(issues.iter().any(|i| i.message.contains("room_regime")));
    }

    #[test]
    fn test_wrong_types_and_enums() {
        let doc = json!({
            "rooms": ["kuchyna"],
            "modes": [{
                "name": "x",
                "priority": "high",
                "activation": {"dow": ["monday"], "calendar_tag": "VACATION"},
                "room_regime": {"kuchyna": "PT"}
            }]
        });
        let mut found = paths(schema().validate(&doc));
        found.sort();
        assert_eq!(
            found,
            vec![
                "/modes/0/activation/calendar_tag",
                "/modes/0/activation/dow/0",
                "/modes/0/priority"
            ]
        );
    }

    #[test]
    fn test_malformed_time_and_date_strings() {
        let doc = json!({
            "rooms": ["kuchyna"],
            "modes": [{
                "name": "x",
                "priority": 1,
                "activation": {"tod": ["6:00-8:00"], "date_range": {"from": "24-12", "to": "01-06"}},
                "room_regime": {"kuchyna": "PT"}
            }]
        });
        let mut found = paths(schema().validate(&doc));
        found.sort();
        assert_eq!(
            found,
            vec![
                "/modes/0/activation/date_range/from",
                "/modes/0/activation/tod/0"
            ]
        );
    }

    #[test]
    fn test_unknown_activation_field_is_rejected() {
        let doc = json!({
            "rooms": ["kuchyna"],
            "modes": [{"name": "x", "priority": 1, "activation": {"days": ["mon"]}, "room_regime": {}}]
        });
        assert_eq!(paths(schema().validate(&doc)), vec!["/modes/0/activation"]);
    }

    #[test]
    fn test_invalid_schema_document() {
        let result = CompiledSchema::compile(&json!({"type": 12}), Path::new("bad.json"));
        assert!(matches!(result, Err(ConfigError::InvalidSchema { .. })));
    }
}
