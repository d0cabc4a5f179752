//! Context type for tracking what caused an evaluation

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Causality context carried by every event
///
/// An evaluation triggered by an inbound signal publishes its results with a
/// child of the signal's context, so subscribers can correlate a regime change
/// with the calendar update or reload that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Unique identifier for this context (ULID)
    pub id: String,

    /// Context of the event that caused this one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Context {
    /// Create a new root context with a fresh ULID
    pub fn new() -> Self {
        Self {
            id: Ulid::new().to_string(),
            parent_id: None,
        }
    }

    /// Create a root context with a specific ID
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
        }
    }

    /// Create a child context with this context as parent
    pub fn child(&self) -> Self {
        Self {
            id: Ulid::new().to_string(),
            parent_id: Some(self.id.clone()),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_links_to_parent() {
        let root = Context::with_id("root");
        let child = root.child();
        assert_eq!(child.parent_id.as_deref(), Some("root"));
        assert_ne!(child.id, root.id);
    }
}
