//! End-to-end resolution tests
//!
//! Each test builds a small household, evaluates it at a fixed local time and
//! checks the resolved regimes and modes.

use chrono::{NaiveDate, NaiveDateTime};
use hvac_core::{ActivationRule, CalendarEvent, CalendarTag, Configuration, DateRange, Mode, WeekdaySpec};
use hvac_modes::{
    resolve_dominant_mode, ActivationEvaluator, EvalContext, RegimeResolver, RegimeSource,
};
use indexmap::IndexMap;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

/// 2024-03-05 is a Tuesday
fn tuesday_morning() -> EvalContext {
    EvalContext::at(at(2024, 3, 5, 9, 0))
}

fn house() -> Configuration {
    Configuration {
        rooms: vec![
            "kuchyna".into(),
            "obyvacka".into(),
            "spalna".into(),
            "detska".into(),
        ],
        groups: IndexMap::from([
            (
                "downstairs".to_string(),
                vec!["kuchyna".to_string(), "obyvacka".to_string()],
            ),
            (
                "upstairs".to_string(),
                vec!["spalna".to_string(), "detska".to_string()],
            ),
        ]),
        base_regime_by_room: IndexMap::from([("spalna".to_string(), "NOC".to_string())]),
        modes: Vec::new(),
    }
}

fn with_modes(modes: Vec<Mode>) -> Configuration {
    Configuration {
        modes,
        ..house()
    }
}

fn resolve(config: &Configuration, ctx: &EvalContext) -> hvac_modes::ResolvedState {
    RegimeResolver::default().resolve(config, ctx)
}

// ============================================================================
// Fallbacks
// ============================================================================

#[test]
fn test_no_active_modes_falls_back_to_base_then_default() {
    let config = with_modes(vec![Mode::new("vikend", 20)
        .with_activation(ActivationRule {
            dow: vec![WeekdaySpec::Sat, WeekdaySpec::Sun],
            ..Default::default()
        })
        .with_regime("*", "VIKEND")]);

    let state = resolve(&config, &tuesday_morning());

    assert_eq!(state.regime("spalna"), Some("NOC"));
    assert_eq!(state.rooms["spalna"].source, RegimeSource::Base);
    assert_eq!(state.regime("kuchyna"), Some("PT"));
    assert_eq!(state.rooms["kuchyna"].source, RegimeSource::Default);
    assert!(state.active_modes.is_empty());
    assert_eq!(state.dominant_mode, "pracovny_den");
}

#[test]
fn test_configured_defaults() {
    let config = house();
    let state = RegimeResolver::new("ECO", "idle").resolve(&config, &tuesday_morning());
    assert_eq!(state.regime("kuchyna"), Some("ECO"));
    assert_eq!(state.regime("spalna"), Some("NOC"));
    assert_eq!(state.dominant_mode, "idle");
}

#[test]
fn test_every_declared_room_is_resolved() {
    let config = with_modes(vec![Mode::new("a", 1).with_regime("kuchyna", "A")]);
    let state = resolve(&config, &tuesday_morning());
    let rooms: Vec<_> = state.rooms.keys().map(String::as_str).collect();
    assert_eq!(rooms, vec!["detska", "kuchyna", "obyvacka", "spalna"]);
}

// ============================================================================
// Priority
// ============================================================================

#[test]
fn test_higher_priority_wins() {
    let config = with_modes(vec![
        Mode::new("zaklad", 5).with_regime("kuchyna", "LOW"),
        Mode::new("komfort", 10).with_regime("kuchyna", "HIGH"),
    ]);

    let state = resolve(&config, &tuesday_morning());

    assert_eq!(state.regime("kuchyna"), Some("HIGH"));
    assert_eq!(
        state.rooms["kuchyna"].source,
        RegimeSource::Mode {
            name: "komfort".into(),
            priority: 10
        }
    );
    assert_eq!(state.active_modes, vec!["komfort", "zaklad"]);
}

#[test]
fn test_higher_priority_wins_regardless_of_order() {
    let config = with_modes(vec![
        Mode::new("komfort", 10).with_regime("kuchyna", "HIGH"),
        Mode::new("zaklad", 5).with_regime("kuchyna", "LOW"),
    ]);
    assert_eq!(resolve(&config, &tuesday_morning()).regime("kuchyna"), Some("HIGH"));
}

#[test]
fn test_equal_priority_keeps_first_declared() {
    // Tie-breaking by declaration order is current behaviour, not a guarantee
    let config = with_modes(vec![
        Mode::new("first", 7).with_regime("kuchyna", "FIRST"),
        Mode::new("second", 7).with_regime("kuchyna", "SECOND"),
    ]);
    assert_eq!(resolve(&config, &tuesday_morning()).regime("kuchyna"), Some("FIRST"));
}

#[test]
fn test_lower_priority_fills_rooms_higher_does_not_target() {
    let config = with_modes(vec![
        Mode::new("zaklad", 5).with_regime("*", "PT"),
        Mode::new("hosty", 30).with_regime("obyvacka", "KOMFORT"),
    ]);

    let state = resolve(&config, &tuesday_morning());

    assert_eq!(state.regime("obyvacka"), Some("KOMFORT"));
    assert_eq!(state.regime("kuchyna"), Some("PT"));
    assert_eq!(state.regime("spalna"), Some("PT"));
}

// ============================================================================
// Targets
// ============================================================================

#[test]
fn test_group_expands_to_members() {
    let config = with_modes(vec![Mode::new("vecer", 10).with_regime("downstairs", "VECER")]);

    let state = resolve(&config, &tuesday_morning());

    assert_eq!(state.regime("kuchyna"), Some("VECER"));
    assert_eq!(state.regime("obyvacka"), Some("VECER"));
    assert_eq!(state.regime("spalna"), Some("NOC"));
    assert_eq!(state.regime("detska"), Some("PT"));
}

#[test]
fn test_group_named_like_a_room_shadows_it() {
    let mut config = with_modes(vec![Mode::new("a", 10).with_regime("kuchyna", "A")]);
    config
        .groups
        .insert("kuchyna".to_string(), vec!["spalna".to_string()]);

    let state = resolve(&config, &tuesday_morning());

    assert_eq!(state.regime("spalna"), Some("A"));
    assert_eq!(state.regime("kuchyna"), Some("PT"));
}

#[test]
fn test_undeclared_group_member_contributes_nothing() {
    let mut config = with_modes(vec![Mode::new("a", 10).with_regime("upstairs", "A")]);
    config.groups["upstairs"].push("povala".to_string());

    let state = resolve(&config, &tuesday_morning());

    assert_eq!(state.regime("spalna"), Some("A"));
    assert_eq!(state.regime("detska"), Some("A"));
    assert!(state.regime("povala").is_none());
}

// ============================================================================
// Activation
// ============================================================================

#[test]
fn test_date_range_wraps_new_year() {
    let config = with_modes(vec![Mode::new("vianoce", 40)
        .with_activation(ActivationRule {
            date_range: Some(DateRange::new(
                "12-24".parse().unwrap(),
                "01-06".parse().unwrap(),
            )),
            ..Default::default()
        })
        .with_regime("*", "SVIATKY")]);

    for (date, expected) in [
        (at(2024, 1, 2, 12, 0), "SVIATKY"),
        (at(2024, 12, 25, 12, 0), "SVIATKY"),
        (at(2024, 6, 15, 12, 0), "PT"),
    ] {
        let state = resolve(&config, &EvalContext::at(date));
        assert_eq!(state.regime("kuchyna"), Some(expected), "{date}");
    }
}

#[test]
fn test_calendar_tag_activates_mode() {
    let config = with_modes(vec![Mode::new("dovolenka", 50)
        .with_activation(ActivationRule {
            calendar_tag: Some(CalendarTag::Dovolenka),
            ..Default::default()
        })
        .with_regime("*", "ECO")]);

    let on_vacation =
        tuesday_morning().with_event(CalendarEvent::calendar("Dovolenka - Tatry", true));
    let planned = tuesday_morning().with_event(CalendarEvent::calendar("DOVOLENKA", false));
    let untagged = tuesday_morning().with_event(CalendarEvent::calendar("Zubar", true));

    assert_eq!(resolve(&config, &on_vacation).regime("kuchyna"), Some("ECO"));
    assert_eq!(resolve(&config, &planned).regime("kuchyna"), Some("PT"));
    assert_eq!(resolve(&config, &untagged).regime("kuchyna"), Some("PT"));
}

#[test]
fn test_holiday_mode() {
    let config = with_modes(vec![
        Mode::new("pracovny_den", 10)
            .with_activation(ActivationRule {
                holiday: Some(false),
                ..Default::default()
            })
            .with_regime("*", "PT"),
        Mode::new("sviatok", 20)
            .with_activation(ActivationRule {
                holiday: Some(true),
                ..Default::default()
            })
            .with_regime("*", "DOMA"),
    ]);

    let holiday = resolve(&config, &tuesday_morning().with_holiday(true));
    assert_eq!(holiday.regime("kuchyna"), Some("DOMA"));
    assert_eq!(holiday.engaged_modes, vec!["sviatok"]);
    // The holiday flag does not narrow the published ranking
    assert_eq!(holiday.active_modes, vec!["sviatok", "pracovny_den"]);
    assert_eq!(holiday.dominant_mode, "sviatok");

    let working = resolve(&config, &tuesday_morning());
    assert_eq!(working.regime("kuchyna"), Some("PT"));
}

// ============================================================================
// Dominant mode
// ============================================================================

#[test]
fn test_dominant_mode_uses_reduced_check() {
    // Time of day and tags do not matter for the dominant mode
    let config = with_modes(vec![
        Mode::new("pracovny_den", 10)
            .with_activation(ActivationRule {
                dow: vec![
                    WeekdaySpec::Mon,
                    WeekdaySpec::Tue,
                    WeekdaySpec::Wed,
                    WeekdaySpec::Thu,
                    WeekdaySpec::Fri,
                ],
                ..Default::default()
            })
            .with_regime("*", "PT"),
        Mode::new("dovolenka", 50)
            .with_activation(ActivationRule {
                calendar_tag: Some(CalendarTag::Dovolenka),
                tod: vec!["00:00-01:00".parse().unwrap()],
                ..Default::default()
            })
            .with_regime("*", "ECO"),
    ]);

    let state = resolve(&config, &tuesday_morning());

    assert_eq!(state.engaged_modes, vec!["pracovny_den"]);
    assert_eq!(state.regime("kuchyna"), Some("PT"));
    assert_eq!(state.active_modes, vec!["dovolenka", "pracovny_den"]);
    assert_eq!(state.dominant_mode, "dovolenka");
}

#[test]
fn test_dominant_mode_heads_active_modes() {
    let config = with_modes(vec![
        Mode::new("pracovny_den", 10).with_regime("*", "PT"),
        Mode::new("dovolenka", 50)
            .with_activation(ActivationRule {
                calendar_tag: Some(CalendarTag::Dovolenka),
                ..Default::default()
            })
            .with_regime("*", "ECO"),
        Mode::new("hosty", 30)
            .with_activation(ActivationRule {
                calendar_mode: Some("hosty".into()),
                ..Default::default()
            })
            .with_regime("obyvacka", "KOMFORT"),
        Mode::new("rovnaky", 50).with_regime("detska", "X"),
    ]);

    let contexts = [
        tuesday_morning(),
        tuesday_morning().with_event(CalendarEvent::calendar("DOVOLENKA", true)),
        tuesday_morning().with_event(CalendarEvent::mode("hosty", true)),
        EvalContext::at(at(2024, 3, 9, 23, 0)).with_holiday(true),
    ];
    for ctx in &contexts {
        let state = resolve(&config, ctx);
        assert_eq!(state.active_modes[0], state.dominant_mode, "{:?}", ctx.now);
    }

    let state = resolve(&config, &tuesday_morning());
    assert_eq!(state.active_modes, vec!["dovolenka", "rovnaky", "pracovny_den"]);
    assert_eq!(state.engaged_modes, vec!["rovnaky", "pracovny_den"]);
}

#[test]
fn test_dominant_mode_follows_calendar_mode() {
    let config = with_modes(vec![
        Mode::new("pracovny_den", 10).with_regime("*", "PT"),
        Mode::new("hosty", 30)
            .with_activation(ActivationRule {
                calendar_mode: Some("hosty".into()),
                ..Default::default()
            })
            .with_regime("obyvacka", "KOMFORT"),
    ]);

    let ctx = tuesday_morning();
    let evaluator = ActivationEvaluator::new(&ctx);
    assert_eq!(resolve_dominant_mode(&config, &evaluator, "x"), "pracovny_den");

    let ctx = tuesday_morning().with_event(CalendarEvent::mode("hosty", true));
    let evaluator = ActivationEvaluator::new(&ctx);
    assert_eq!(resolve_dominant_mode(&config, &evaluator, "x"), "hosty");
}

#[test]
fn test_dominant_mode_default_when_nothing_qualifies() {
    let config = with_modes(vec![Mode::new("vikend", 20).with_activation(ActivationRule {
        dow: vec![WeekdaySpec::Sun],
        ..Default::default()
    })]);
    let ctx = tuesday_morning();
    let evaluator = ActivationEvaluator::new(&ctx);
    assert_eq!(resolve_dominant_mode(&config, &evaluator, "doma"), "doma");
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_resolution_is_deterministic() {
    let config = with_modes(vec![
        Mode::new("zaklad", 5).with_regime("*", "PT"),
        Mode::new("vecer", 10)
            .with_activation(ActivationRule {
                tod: vec!["08:00-10:00".parse().unwrap()],
                ..Default::default()
            })
            .with_regime("downstairs", "VECER"),
    ]);
    let ctx = tuesday_morning().with_event(CalendarEvent::calendar("HOME_OFFICE", true));

    let first = resolve(&config, &ctx);
    for _ in 0..10 {
        assert_eq!(resolve(&config, &ctx), first);
    }
}
