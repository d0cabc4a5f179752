//! Activation rule evaluation
//!
//! Evaluation is a pure function of the rule, the evaluation time and the
//! external signals carried by [`EvalContext`]. Nothing here reads the clock
//! or any shared state, so the same inputs always give the same answer.

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use hvac_core::{
    active_calendar_modes, active_calendar_tags, ActivationRule, CalendarEvent, CalendarTag,
    Configuration, MonthDay, WeekdaySpec,
};
use indexmap::IndexMap;
use std::collections::BTreeSet;
use tracing::trace;

/// Inputs to one evaluation
///
/// `now` is local wall-clock time; weekday, time-of-day and date ranges are
/// all matched against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalContext {
    pub now: NaiveDateTime,

    /// Events reported by the calendar poller, active or not
    pub calendar_events: Vec<CalendarEvent>,

    /// Whether today is a public holiday
    pub is_holiday: bool,
}

impl EvalContext {
    /// Evaluate at a fixed time with no calendar events on a working day
    pub fn at(now: NaiveDateTime) -> Self {
        Self {
            now,
            calendar_events: Vec::new(),
            is_holiday: false,
        }
    }

    /// Evaluate at the current local time
    pub fn local_now() -> Self {
        Self::at(Local::now().naive_local())
    }

    pub fn with_calendar_events(mut self, events: Vec<CalendarEvent>) -> Self {
        self.calendar_events = events;
        self
    }

    /// Add a single calendar event
    pub fn with_event(mut self, event: CalendarEvent) -> Self {
        self.calendar_events.push(event);
        self
    }

    pub fn with_holiday(mut self, is_holiday: bool) -> Self {
        self.is_holiday = is_holiday;
        self
    }
}

/// Evaluates activation rules against one [`EvalContext`]
///
/// The time is split and the calendar scanned once, up front, so rules can
/// be checked cheaply for every mode.
#[derive(Debug)]
pub struct ActivationEvaluator<'a> {
    weekday: WeekdaySpec,
    minute_of_day: u16,
    day: MonthDay,
    is_holiday: bool,
    tags: BTreeSet<CalendarTag>,
    calendar_modes: BTreeSet<&'a str>,
}

impl<'a> ActivationEvaluator<'a> {
    pub fn new(ctx: &'a EvalContext) -> Self {
        let tags = active_calendar_tags(&ctx.calendar_events);
        let calendar_modes = active_calendar_modes(&ctx.calendar_events);
        // hour < 24 and minute < 60, so this fits in u16
        let minute_of_day = (ctx.now.hour() * 60 + ctx.now.minute()) as u16;

        trace!(
            now = %ctx.now,
            ?tags,
            ?calendar_modes,
            is_holiday = ctx.is_holiday,
            "Evaluation signals"
        );

        Self {
            weekday: ctx.now.weekday().into(),
            minute_of_day,
            day: MonthDay::of(&ctx.now),
            is_holiday: ctx.is_holiday,
            tags,
            calendar_modes,
        }
    }

    /// Whether every predicate of the rule holds
    pub fn is_active(&self, rule: &ActivationRule) -> bool {
        if !self.matches_weekday(rule) {
            trace!(weekday = ?self.weekday, "Weekday does not match");
            return false;
        }

        if !rule.tod.is_empty() && !rule.tod.iter().any(|r| r.contains(self.minute_of_day)) {
            trace!(minute_of_day = self.minute_of_day, "Outside every time range");
            return false;
        }

        if let Some(range) = &rule.date_range {
            if !range.contains(self.day) {
                trace!(day = %self.day, "Outside date range");
                return false;
            }
        }

        if let Some(holiday) = rule.holiday {
            if holiday != self.is_holiday {
                trace!(holiday, "Holiday flag does not match");
                return false;
            }
        }

        if let Some(tag) = rule.calendar_tag {
            if !self.tags.contains(&tag) {
                trace!(%tag, "No active calendar event carries tag");
                return false;
            }
        }

        self.matches_calendar_mode(rule)
    }

    /// The narrower check used for the household's dominant mode
    ///
    /// Only weekday and requested calendar mode are considered; time of day,
    /// date range, holiday and tag predicates are ignored.
    pub fn qualifies_for_dominant(&self, rule: &ActivationRule) -> bool {
        self.matches_weekday(rule) && self.matches_calendar_mode(rule)
    }

    /// Activation state of every mode, in declaration order
    pub fn evaluate(&self, config: &Configuration) -> IndexMap<String, bool> {
        config
            .modes
            .iter()
            .map(|mode| {
                let active = self.is_active(&mode.activation);
                trace!(mode = %mode.name, active, "Mode evaluated");
                (mode.name.clone(), active)
            })
            .collect()
    }

    /// Dominant-mode qualification of every mode, in declaration order
    pub fn evaluate_dominant(&self, config: &Configuration) -> IndexMap<String, bool> {
        config
            .modes
            .iter()
            .map(|mode| (mode.name.clone(), self.qualifies_for_dominant(&mode.activation)))
            .collect()
    }

    fn matches_weekday(&self, rule: &ActivationRule) -> bool {
        rule.dow.is_empty() || rule.dow.contains(&self.weekday)
    }

    fn matches_calendar_mode(&self, rule: &ActivationRule) -> bool {
        match &rule.calendar_mode {
            Some(mode) => self.calendar_modes.contains(mode.as_str()),
            None => true,
        }
    }
}

/// Activation state of every mode in `config` for `ctx`
pub fn evaluate_activations(config: &Configuration, ctx: &EvalContext) -> IndexMap<String, bool> {
    ActivationEvaluator::new(ctx).evaluate(config)
}
