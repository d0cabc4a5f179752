//! Error types for configuration loading and validation

use hvac_core::TimeRange;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// JSON pointer into the document, empty for the document root
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur while loading or validating a rule document
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML
    #[error("failed to parse YAML in {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Failed to parse JSON
    #[error("failed to parse JSON in {path}: {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The schema document itself is unusable
    #[error("invalid schema {path}: {reason}")]
    InvalidSchema { path: PathBuf, reason: String },

    /// Structural violations reported by the schema
    #[error("schema validation failed: {}", join_issues(.issues))]
    Schema { issues: Vec<ValidationIssue> },

    /// Cross-field violations the schema cannot express
    #[error("semantic validation failed: {}", join_issues(.issues))]
    Semantic { issues: Vec<ValidationIssue> },
}

impl ConfigError {
    /// Whether the document could not be read or parsed at all
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            ConfigError::ReadFile { .. } | ConfigError::ParseYaml { .. } | ConfigError::ParseJson { .. }
        )
    }

    /// Field-level issues for validation failures, empty otherwise
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            ConfigError::Schema { issues } | ConfigError::Semantic { issues } => issues,
            _ => &[],
        }
    }
}

/// Non-fatal findings; the configuration is accepted but worth a look
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// Two modes share a priority, so which one wins a shared room is unspecified
    PriorityCollision {
        first: String,
        second: String,
        priority: i64,
    },

    /// A time range ends before it starts and can never match
    CrossMidnightRange { mode: String, range: TimeRange },

    /// A group lists a room that is not declared; it is skipped at evaluation
    UnknownGroupMember { group: String, room: String },

    /// A base regime is given for a room that is not declared
    UnknownBaseRoom { room: String },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::PriorityCollision {
                first,
                second,
                priority,
            } => write!(f, "modes '{first}' and '{second}' have the same priority {priority}"),
            ValidationWarning::CrossMidnightRange { mode, range } => write!(
                f,
                "mode '{mode}' has time range {range} crossing midnight, which never matches"
            ),
            ValidationWarning::UnknownGroupMember { group, room } => {
                write!(f, "group '{group}' lists undeclared room '{room}'")
            }
            ValidationWarning::UnknownBaseRoom { room } => {
                write!(f, "base regime given for undeclared room '{room}'")
            }
        }
    }
}
