//! Core types for the climate mode engine
//!
//! This crate provides the fundamental types used throughout the workspace:
//! the declarative rule model (Mode, ActivationRule, Configuration), the
//! calendar signals the rules react to, and the Event/Context pair carried on
//! the event bus.

mod calendar;
mod configuration;
mod context;
mod error;
mod event;
mod mode;

pub use calendar::{
    active_calendar_modes, active_calendar_tags, extract_tags, CalendarEvent, CalendarEventKind,
    CalendarParams, CalendarTag,
};
pub use configuration::{ConfigDiff, Configuration, Target};
pub use context::Context;
pub use error::{ModelError, ModelResult};
pub use event::{Event, EventData, EventType};
pub use mode::{ActivationRule, DateRange, Mode, MonthDay, TimeRange, WeekdaySpec};

/// Regime applied to a room when neither a mode nor the base mapping names one
pub const DEFAULT_REGIME: &str = "PT";

/// Household mode label used when no mode qualifies as dominant
pub const DEFAULT_MODE: &str = "pracovny_den";

/// Target key that expands to every declared room
pub const WILDCARD_TARGET: &str = "*";

/// Standard event types and their payloads
pub mod events {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::collections::BTreeMap;

    /// Retained topic carrying the resolved per-room regimes
    pub const ACTIVE_REGIMES: &str = "virt/system/active_regimes";

    /// Retained topic carrying the dominant household mode
    pub const CURRENT_MODE: &str = "smarthome/mode/current";

    /// Fired after a configuration reload was accepted
    pub const CONFIG_RELOADED: &str = "config_reloaded";

    /// Fired by the calendar poller with the full list of known events
    pub const CALENDAR_UPDATED: &str = "calendar_updated";

    /// Fired by the holiday lookup when today's holiday flag is known
    pub const HOLIDAY_UPDATED: &str = "holiday_updated";

    /// Fired to request an immediate evaluation
    pub const EVALUATE_REQUESTED: &str = "evaluate_requested";

    impl EventData for ConfigDiff {
        fn event_type() -> &'static str {
            CONFIG_RELOADED
        }
    }

    /// Data for ACTIVE_REGIMES events
    #[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    pub struct ActiveRegimesData {
        pub status: String,
        pub regimes: BTreeMap<String, String>,
        pub timestamp: DateTime<Utc>,
    }

    impl EventData for ActiveRegimesData {
        fn event_type() -> &'static str {
            ACTIVE_REGIMES
        }
    }

    /// Data for CURRENT_MODE events
    #[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    pub struct CurrentModeData {
        pub mode: String,
        pub active_modes: Vec<String>,
        pub regimes: BTreeMap<String, String>,
        pub timestamp: DateTime<Utc>,
    }

    impl EventData for CurrentModeData {
        fn event_type() -> &'static str {
            CURRENT_MODE
        }
    }

    /// Data for CALENDAR_UPDATED events
    #[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    pub struct CalendarUpdatedData {
        #[serde(default)]
        pub events: Vec<CalendarEvent>,
    }

    impl EventData for CalendarUpdatedData {
        fn event_type() -> &'static str {
            CALENDAR_UPDATED
        }
    }

    /// Data for HOLIDAY_UPDATED events
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    pub struct HolidayUpdatedData {
        pub is_holiday: bool,
    }

    impl EventData for HolidayUpdatedData {
        fn event_type() -> &'static str {
            HOLIDAY_UPDATED
        }
    }

    /// Data for EVALUATE_REQUESTED events
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    pub struct EvaluateRequestedData {}

    impl EventData for EvaluateRequestedData {
        fn event_type() -> &'static str {
            EVALUATE_REQUESTED
        }
    }
}
