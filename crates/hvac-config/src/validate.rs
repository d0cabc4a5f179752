//! Document validation pipeline
//!
//! A document becomes a [`Configuration`] in three steps:
//!
//! 1. **Schema** - structure, types and enumerated values ([`CompiledSchema`])
//! 2. **Typing** - deserialisation into the rule model; catches values the
//!    schema patterns let through, such as `02-30`
//! 3. **Semantics** - cross-field rules: unique mode names, every target
//!    reaching at least one declared room
//!
//! Semantic checks also produce non-fatal [`ValidationWarning`]s.

use hvac_core::Configuration;
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

use crate::error::{ConfigError, ConfigResult, ValidationIssue, ValidationWarning};
use crate::schema::CompiledSchema;

/// A configuration that passed validation, with its warnings
#[derive(Debug, Clone)]
pub struct Validated {
    pub config: Configuration,
    pub warnings: Vec<ValidationWarning>,
}

impl Validated {
    /// Emit every warning through tracing
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            warn!(%warning, "Configuration warning");
        }
    }
}

/// Run the whole pipeline on a parsed document
pub fn validate_document(schema: &CompiledSchema, document: &Value) -> ConfigResult<Validated> {
    schema
        .validate(document)
        .map_err(|issues| ConfigError::Schema { issues })?;

    let config: Configuration =
        serde_json::from_value(document.clone()).map_err(|e| ConfigError::Schema {
            issues: vec![ValidationIssue::new("", e.to_string())],
        })?;

    let warnings = validate_semantics(&config)?;
    Ok(Validated { config, warnings })
}

/// Escape one JSON pointer segment
fn pointer_segment(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// Cross-field validation of a typed configuration
pub fn validate_semantics(config: &Configuration) -> ConfigResult<Vec<ValidationWarning>> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();

    for (index, mode) in config.modes.iter().enumerate() {
        if !seen.insert(mode.name.as_str()) {
            issues.push(ValidationIssue::new(
                format!("/modes/{index}/name"),
                format!("duplicate mode name '{}'", mode.name),
            ));
        }

        for target in mode.room_regime.keys() {
            let reachable = config
                .target(target)
                .rooms()
                .into_iter()
                .any(|room| config.has_room(room));
            if !reachable {
                issues.push(ValidationIssue::new(
                    format!("/modes/{index}/room_regime/{}", pointer_segment(target)),
                    format!("target '{target}' does not resolve to any declared room"),
                ));
            }
        }
    }

    if !issues.is_empty() {
        return Err(ConfigError::Semantic { issues });
    }

    Ok(collect_warnings(config))
}

fn collect_warnings(config: &Configuration) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    for (i, first) in config.modes.iter().enumerate() {
        for second in &config.modes[i + 1..] {
            if first.priority == second.priority {
                warnings.push(ValidationWarning::PriorityCollision {
                    first: first.name.clone(),
                    second: second.name.clone(),
                    priority: first.priority,
                });
            }
        }
    }

    for mode in &config.modes {
        for range in mode.activation.tod.iter().filter(|r| r.crosses_midnight()) {
            warnings.push(ValidationWarning::CrossMidnightRange {
                mode: mode.name.clone(),
                range: *range,
            });
        }
    }

    for (group, members) in &config.groups {
        for room in members.iter().filter(|room| !config.has_room(room)) {
            warnings.push(ValidationWarning::UnknownGroupMember {
                group: group.clone(),
                room: room.clone(),
            });
        }
    }

    for room in config.base_regime_by_room.keys() {
        if !config.has_room(room) {
            warnings.push(ValidationWarning::UnknownBaseRoom { room: room.clone() });
        }
    }

    warnings
}
