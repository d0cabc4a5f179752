//! Mode and activation rule types
//!
//! A mode is a named, prioritized bundle of per-room regimes that applies
//! while its activation rule holds. Rules are declarative here; they are
//! evaluated by `hvac-modes`.

use chrono::{Datelike, Weekday};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::calendar::CalendarTag;
use crate::error::{ModelError, ModelResult};

/// Weekday specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekdaySpec {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl From<WeekdaySpec> for Weekday {
    fn from(w: WeekdaySpec) -> Self {
        match w {
            WeekdaySpec::Mon => Weekday::Mon,
            WeekdaySpec::Tue => Weekday::Tue,
            WeekdaySpec::Wed => Weekday::Wed,
            WeekdaySpec::Thu => Weekday::Thu,
            WeekdaySpec::Fri => Weekday::Fri,
            WeekdaySpec::Sat => Weekday::Sat,
            WeekdaySpec::Sun => Weekday::Sun,
        }
    }
}

impl From<Weekday> for WeekdaySpec {
    fn from(w: Weekday) -> Self {
        match w {
            Weekday::Mon => WeekdaySpec::Mon,
            Weekday::Tue => WeekdaySpec::Tue,
            Weekday::Wed => WeekdaySpec::Wed,
            Weekday::Thu => WeekdaySpec::Thu,
            Weekday::Fri => WeekdaySpec::Fri,
            Weekday::Sat => WeekdaySpec::Sat,
            Weekday::Sun => WeekdaySpec::Sun,
        }
    }
}

/// Inclusive wall-clock range written `HH:MM-HH:MM`, minute precision
///
/// A range whose start is after its end never matches: ranges do not wrap
/// past midnight, "22:00-06:00" has to be written as two ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeRange {
    start: u16,
    end: u16,
}

impl TimeRange {
    pub fn start_minute(&self) -> u16 {
        self.start
    }

    pub fn end_minute(&self) -> u16 {
        self.end
    }

    /// Whether `minute_of_day` lies within the range, both ends included
    pub fn contains(&self, minute_of_day: u16) -> bool {
        self.start <= minute_of_day && minute_of_day <= self.end
    }

    pub fn crosses_midnight(&self) -> bool {
        self.start > self.end
    }
}

fn parse_clock(s: &str) -> Option<u16> {
    let (hours, minutes) = s.trim().split_once(':')?;
    let hours: u16 = hours.parse().ok()?;
    let minutes: u16 = minutes.parse().ok()?;
    (hours < 24 && minutes < 60).then_some(hours * 60 + minutes)
}

impl FromStr for TimeRange {
    type Err = ModelError;

    fn from_str(s: &str) -> ModelResult<Self> {
        let invalid = || ModelError::InvalidTimeRange(s.to_string());
        let (start, end) = s.split_once('-').ok_or_else(invalid)?;
        let start = parse_clock(start).ok_or_else(invalid)?;
        let end = parse_clock(end).ok_or_else(invalid)?;
        Ok(Self { start, end })
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}-{:02}:{:02}",
            self.start / 60,
            self.start % 60,
            self.end / 60,
            self.end % 60
        )
    }
}

impl TryFrom<String> for TimeRange {
    type Error = ModelError;

    fn try_from(value: String) -> ModelResult<Self> {
        value.parse()
    }
}

impl From<TimeRange> for String {
    fn from(range: TimeRange) -> Self {
        range.to_string()
    }
}

/// Longest length of each month, leap years included
const DAYS_IN_MONTH: [u8; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Calendar day without a year, written `MM-DD`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthDay {
    month: u8,
    day: u8,
}

impl MonthDay {
    pub fn new(month: u8, day: u8) -> ModelResult<Self> {
        let valid = (1..=12).contains(&month)
            && day >= 1
            && day <= DAYS_IN_MONTH[usize::from(month) - 1];
        if valid {
            Ok(Self { month, day })
        } else {
            Err(ModelError::InvalidMonthDay(format!("{month:02}-{day:02}")))
        }
    }

    /// Month and day of any date-like value
    pub fn of(date: &impl Datelike) -> Self {
        // chrono guarantees month in 1..=12 and day in 1..=31
        Self {
            month: date.month() as u8,
            day: date.day() as u8,
        }
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    /// Numeric ordering key, `month * 100 + day`
    pub fn key(&self) -> u16 {
        u16::from(self.month) * 100 + u16::from(self.day)
    }
}

impl FromStr for MonthDay {
    type Err = ModelError;

    fn from_str(s: &str) -> ModelResult<Self> {
        let invalid = || ModelError::InvalidMonthDay(s.to_string());
        let (month, day) = s.trim().split_once('-').ok_or_else(invalid)?;
        let month = month.parse().map_err(|_| invalid())?;
        let day = day.parse().map_err(|_| invalid())?;
        Self::new(month, day).map_err(|_| invalid())
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

impl TryFrom<String> for MonthDay {
    type Error = ModelError;

    fn try_from(value: String) -> ModelResult<Self> {
        value.parse()
    }
}

impl From<MonthDay> for String {
    fn from(day: MonthDay) -> Self {
        day.to_string()
    }
}

/// Yearless date range, both ends included
///
/// When `from` is later in the year than `to` the range spans New Year,
/// e.g. `12-24` to `01-06`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub from: MonthDay,
    pub to: MonthDay,
}

impl DateRange {
    pub fn new(from: MonthDay, to: MonthDay) -> Self {
        Self { from, to }
    }

    pub fn wraps_year(&self) -> bool {
        self.from.key() > self.to.key()
    }

    pub fn contains(&self, day: MonthDay) -> bool {
        let (current, from, to) = (day.key(), self.from.key(), self.to.key());
        if self.wraps_year() {
            current >= from || current <= to
        } else {
            current >= from && current <= to
        }
    }
}

/// Activation predicate of a mode
///
/// Every present field must hold; absent or empty fields hold vacuously.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationRule {
    /// Allowed weekdays, empty means any day
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dow: Vec<WeekdaySpec>,

    /// Time-of-day windows, empty means any time
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tod: Vec<TimeRange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,

    /// Must equal today's holiday flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holiday: Option<bool>,

    /// Tag an active calendar event must carry in its summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_tag: Option<CalendarTag>,

    /// Mode parameter an active mode event must carry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_mode: Option<String>,
}

impl ActivationRule {
    /// A rule without any predicate, which is always active
    pub fn always() -> Self {
        Self::default()
    }

    pub fn is_unconditional(&self) -> bool {
        self.dow.is_empty()
            && self.tod.is_empty()
            && self.date_range.is_none()
            && self.holiday.is_none()
            && self.calendar_tag.is_none()
            && self.calendar_mode.is_none()
    }
}

/// A named, prioritized rule bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mode {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Higher wins when several active modes target the same room
    pub priority: i64,

    #[serde(default)]
    pub activation: ActivationRule,

    /// Target (room, group or `*`) to regime
    #[serde(default)]
    pub room_regime: IndexMap<String, String>,
}

impl Mode {
    pub fn new(name: impl Into<String>, priority: i64) -> Self {
        Self {
            name: name.into(),
            description: None,
            priority,
            activation: ActivationRule::always(),
            room_regime: IndexMap::new(),
        }
    }

    pub fn with_activation(mut self, activation: ActivationRule) -> Self {
        self.activation = activation;
        self
    }

    /// Add a target → regime entry
    pub fn with_regime(mut self, target: impl Into<String>, regime: impl Into<String>) -> Self {
        self.room_regime.insert(target.into(), regime.into());
        self
    }
}
