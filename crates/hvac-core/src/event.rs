//! Event types for the event bus

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::Context;

/// Trait for typed event data
///
/// Implement this trait for any data type that should be carried by events.
pub trait EventData: Clone + Send + Sync + 'static {
    /// The event type string for this data type
    fn event_type() -> &'static str;
}

/// Event type identifier (also used as the topic name of retained events)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventType(String);

impl EventType {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self(event_type.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Special event type that matches all events
    pub fn match_all() -> Self {
        Self("*".to_string())
    }

    pub fn is_match_all(&self) -> bool {
        self.0 == "*"
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EventType {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An event that can be fired on the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T = serde_json::Value> {
    /// The type of event
    pub event_type: EventType,

    /// The event data
    pub data: T,

    /// When the event was fired
    pub time_fired: DateTime<Utc>,

    /// Context tracking the origin and causality
    pub context: Context,
}

impl<T> Event<T> {
    /// Create a new event with current timestamp
    pub fn new(event_type: impl Into<EventType>, data: T, context: Context) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            time_fired: Utc::now(),
            context,
        }
    }
}

impl<T: EventData> Event<T> {
    /// Create a typed event from EventData
    pub fn typed(data: T, context: Context) -> Self {
        Self::new(T::event_type(), data, context)
    }
}

impl Event<serde_json::Value> {
    /// Decode the JSON payload into typed event data
    ///
    /// Returns `None` when the payload does not match `T`.
    pub fn decode<T: EventData + DeserializeOwned>(&self) -> Option<Event<T>> {
        let data = serde_json::from_value::<T>(self.data.clone()).ok()?;
        Some(Event {
            event_type: self.event_type.clone(),
            data,
            time_fired: self.time_fired,
            context: self.context.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::HolidayUpdatedData;
    use serde_json::json;

    #[test]
    fn test_decode_typed_payload() {
        let event = Event::new("holiday_updated", json!({"is_holiday": true}), Context::new());
        let typed = event.decode::<HolidayUpdatedData>().unwrap();
        assert!(typed.data.is_holiday);
        assert_eq!(typed.context, event.context);
    }

    #[test]
    fn test_decode_rejects_mismatched_payload() {
        let event = Event::new("holiday_updated", json!({"flag": "yes"}), Context::new());
        assert!(event.decode::<HolidayUpdatedData>().is_none());
    }
}
