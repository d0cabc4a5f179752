//! Rule document loader
//!
//! The rule document is YAML (`.yaml`, `.yml`, or anything else) or JSON
//! (`.json`). Either way it is parsed into a `serde_json::Value` so that the
//! schema validator sees one representation.

use serde_json::Value;
use std::path::Path;
use tracing::{debug, trace};

use crate::error::{ConfigError, ConfigResult};

/// On-disk syntax of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Pick the format from the file extension, defaulting to YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// Parse document text
pub fn parse_document(content: &str, format: DocumentFormat, source: &Path) -> ConfigResult<Value> {
    trace!(?format, source = %source.display(), "Parsing document");
    match format {
        DocumentFormat::Yaml => serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
            path: source.to_path_buf(),
            source: e,
        }),
        DocumentFormat::Json => serde_json::from_str(content).map_err(|e| ConfigError::ParseJson {
            path: source.to_path_buf(),
            source: e,
        }),
    }
}

/// Read and parse a document from disk
pub async fn load_document(path: &Path) -> ConfigResult<Value> {
    debug!("Loading document: {:?}", path);

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

    parse_document(&content, DocumentFormat::from_path(path), path)
}
