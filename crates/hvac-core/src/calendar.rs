//! Calendar signals consumed by activation rules
//!
//! Calendar events come from an external poller. Only two things matter here:
//! whether an event is active and what it says: free-text tags in the summary
//! of `calendar` events, or a mode parameter on `mode` events.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};

/// The fixed vocabulary of tags recognised in event summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CalendarTag {
    /// Household is on vacation
    #[serde(rename = "DOVOLENKA")]
    Dovolenka,
    /// Someone works from home
    #[serde(rename = "HOME_OFFICE")]
    HomeOffice,
    /// Children are home
    #[serde(rename = "DETI_DOMA")]
    DetiDoma,
}

impl CalendarTag {
    pub const ALL: [CalendarTag; 3] = [
        CalendarTag::Dovolenka,
        CalendarTag::HomeOffice,
        CalendarTag::DetiDoma,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CalendarTag::Dovolenka => "DOVOLENKA",
            CalendarTag::HomeOffice => "HOME_OFFICE",
            CalendarTag::DetiDoma => "DETI_DOMA",
        }
    }

    /// Match a single word token, ignoring case
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(token))
    }
}

impl FromStr for CalendarTag {
    type Err = ModelError;

    fn from_str(s: &str) -> ModelResult<Self> {
        Self::from_token(s).ok_or_else(|| ModelError::UnknownCalendarTag(s.to_string()))
    }
}

impl fmt::Display for CalendarTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract vocabulary tags from free text
///
/// Words are maximal runs of ASCII letters, digits and underscores, so
/// `"Dovolenka - Tatry"` yields `DOVOLENKA` while `"DOVOLENKAS"` yields nothing.
pub fn extract_tags(text: &str) -> BTreeSet<CalendarTag> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter_map(CalendarTag::from_token)
        .collect()
}

/// Kind of calendar event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarEventKind {
    /// Ordinary calendar entry, scanned for tags
    Calendar,
    /// `SMH MODE=<name>` entry requesting a mode
    Mode,
    /// Anything else the poller forwards
    #[serde(other)]
    Other,
}

/// Parameters parsed from a mode event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

/// A calendar event as delivered by the calendar poller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Whether the event is happening now
    #[serde(default)]
    pub active: bool,

    #[serde(rename = "type")]
    pub kind: CalendarEventKind,

    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub params: CalendarParams,
}

impl CalendarEvent {
    /// An ordinary calendar entry
    pub fn calendar(summary: impl Into<String>, active: bool) -> Self {
        Self {
            active,
            kind: CalendarEventKind::Calendar,
            summary: summary.into(),
            params: CalendarParams::default(),
        }
    }

    /// A mode request entry
    pub fn mode(mode: impl Into<String>, active: bool) -> Self {
        let mode = mode.into();
        Self {
            active,
            kind: CalendarEventKind::Mode,
            summary: format!("SMH MODE={mode}"),
            params: CalendarParams { mode: Some(mode) },
        }
    }

    /// Tags carried by this event; only calendar entries carry tags
    pub fn tags(&self) -> BTreeSet<CalendarTag> {
        match self.kind {
            CalendarEventKind::Calendar => extract_tags(&self.summary),
            _ => BTreeSet::new(),
        }
    }
}

/// Union of tags over all active calendar entries
pub fn active_calendar_tags(events: &[CalendarEvent]) -> BTreeSet<CalendarTag> {
    events
        .iter()
        .filter(|e| e.active)
        .flat_map(CalendarEvent::tags)
        .collect()
}

/// Mode names requested by active mode events
pub fn active_calendar_modes(events: &[CalendarEvent]) -> BTreeSet<&str> {
    events
        .iter()
        .filter(|e| e.active && e.kind == CalendarEventKind::Mode)
        .filter_map(|e| e.params.mode.as_deref())
        .collect()
}
