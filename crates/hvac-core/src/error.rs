//! Errors raised while parsing rule model values

use thiserror::Error;

/// Result type for model parsing
pub type ModelResult<T> = Result<T, ModelError>;

/// Malformed textual model values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("invalid time range '{0}': expected HH:MM-HH:MM")]
    InvalidTimeRange(String),

    #[error("invalid month-day '{0}': expected MM-DD")]
    InvalidMonthDay(String),

    #[error("unknown calendar tag '{0}'")]
    UnknownCalendarTag(String),
}
