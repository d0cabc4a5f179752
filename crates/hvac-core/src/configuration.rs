//! The immutable rule set snapshot

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::mode::Mode;
use crate::WILDCARD_TARGET;

/// A validated rule set
///
/// Configurations are never mutated once built; a reload produces a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Declared room ids, in declaration order
    #[serde(default)]
    pub rooms: Vec<String>,

    /// Group id to member room ids
    #[serde(default)]
    pub groups: IndexMap<String, Vec<String>>,

    /// Regime used for a room no active mode targets
    #[serde(default)]
    pub base_regime_by_room: IndexMap<String, String>,

    /// Modes in declaration order
    #[serde(default)]
    pub modes: Vec<Mode>,
}

/// What a `room_regime` key refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// A declared group and its members
    Group(&'a [String]),
    /// Every declared room
    All(&'a [String]),
    /// A single room id
    Room(&'a str),
}

impl<'a> Target<'a> {
    /// Room ids this target names, declared or not
    pub fn rooms(&self) -> Vec<&'a str> {
        match *self {
            Target::Group(members) | Target::All(members) => {
                members.iter().map(String::as_str).collect()
            }
            Target::Room(room) => vec![room],
        }
    }
}

impl Configuration {
    pub fn mode(&self, name: &str) -> Option<&Mode> {
        self.modes.iter().find(|m| m.name == name)
    }

    pub fn has_room(&self, room: &str) -> bool {
        self.rooms.iter().any(|r| r == room)
    }

    /// Classify a target key; group names shadow the wildcard and room ids
    pub fn target<'a>(&'a self, key: &'a str) -> Target<'a> {
        if let Some(members) = self.groups.get(key) {
            Target::Group(members)
        } else if key == WILDCARD_TARGET {
            Target::All(&self.rooms)
        } else {
            Target::Room(key)
        }
    }

    pub fn base_regime(&self, room: &str) -> Option<&str> {
        self.base_regime_by_room.get(room).map(String::as_str)
    }

    /// Summarise mode changes relative to `previous`
    ///
    /// Modes are matched by name; a mode is modified when any of its fields
    /// differ. Rooms, groups and base regimes are not part of the summary.
    pub fn diff_from(&self, previous: &Configuration) -> ConfigDiff {
        let old: HashMap<&str, &Mode> = previous
            .modes
            .iter()
            .map(|m| (m.name.as_str(), m))
            .collect();

        let mut diff = ConfigDiff {
            total: self.modes.len(),
            ..ConfigDiff::default()
        };

        for mode in &self.modes {
            match old.get(mode.name.as_str()) {
                None => diff.added.push(mode.name.clone()),
                Some(prev) if *prev != mode => diff.modified.push(mode.name.clone()),
                Some(_) => {}
            }
        }

        diff.removed = previous
            .modes
            .iter()
            .filter(|m| self.mode(&m.name).is_none())
            .map(|m| m.name.clone())
            .collect();

        diff
    }
}

/// Mode-level change summary between two configurations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
    /// Number of modes in the new configuration
    pub total: usize,
}

impl ConfigDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}
