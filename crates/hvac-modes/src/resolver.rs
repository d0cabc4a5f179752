//! Per-room regime resolution
//!
//! Active modes contribute regimes to the rooms their targets expand to. For
//! each room the highest-priority contributor wins; rooms nobody targets fall
//! back to their base regime, then to the system default.
//!
//! When two contributors share a priority the one declared first wins. That
//! is how the resolver happens to behave, not a guarantee; configurations
//! should not rely on it.

use hvac_core::{Configuration, DEFAULT_MODE, DEFAULT_REGIME};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::activation::{ActivationEvaluator, EvalContext};

/// Where a room's regime came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegimeSource {
    /// Highest-priority active mode targeting the room
    Mode { name: String, priority: i64 },
    /// The room's entry in `base_regime_by_room`
    Base,
    /// System default
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRegime {
    pub regime: String,
    pub source: RegimeSource,
}

/// Winning contributor for one room
struct Contributor<'a> {
    mode: &'a str,
    priority: i64,
    regime: &'a str,
}

/// Resolve every declared room's regime from the modes marked active
pub fn resolve_room_regimes(
    config: &Configuration,
    activations: &IndexMap<String, bool>,
    default_regime: &str,
) -> BTreeMap<String, ResolvedRegime> {
    let mut winners: BTreeMap<&str, Contributor<'_>> = BTreeMap::new();

    let active = config
        .modes
        .iter()
        .filter(|mode| activations.get(&mode.name).copied().unwrap_or(false));

    for mode in active {
        for (target, regime) in &mode.room_regime {
            for room in config.target(target).rooms() {
                if !config.has_room(room) {
                    trace!(mode = %mode.name, %target, room, "Skipping undeclared room");
                    continue;
                }

                let contributor = Contributor {
                    mode: &mode.name,
                    priority: mode.priority,
                    regime,
                };
                let replaces = winners
                    .get(room)
                    .map_or(true, |current| contributor.priority > current.priority);
                if replaces {
                    winners.insert(room, contributor);
                }
            }
        }
    }

    config
        .rooms
        .iter()
        .map(|room| {
            let resolved = match winners.get(room.as_str()) {
                Some(winner) => {
                    debug!(
                        room = %room,
                        mode = winner.mode,
                        priority = winner.priority,
                        regime = winner.regime,
                        "Room resolved"
                    );
                    ResolvedRegime {
                        regime: winner.regime.to_string(),
                        source: RegimeSource::Mode {
                            name: winner.mode.to_string(),
                            priority: winner.priority,
                        },
                    }
                }
                None => match config.base_regime(room) {
                    Some(base) => ResolvedRegime {
                        regime: base.to_string(),
                        source: RegimeSource::Base,
                    },
                    None => ResolvedRegime {
                        regime: default_regime.to_string(),
                        source: RegimeSource::Default,
                    },
                },
            };
            (room.clone(), resolved)
        })
        .collect()
}

/// The household's dominant mode
///
/// The highest-priority mode passing
/// [`ActivationEvaluator::qualifies_for_dominant`], first declared among
/// equals, or `default_mode` when none qualifies.
pub fn resolve_dominant_mode(
    config: &Configuration,
    evaluator: &ActivationEvaluator<'_>,
    default_mode: &str,
) -> String {
    rank_active_modes(config, &evaluator.evaluate_dominant(config))
        .into_iter()
        .next()
        .unwrap_or_else(|| default_mode.to_string())
}

/// Active mode names, highest priority first, declaration order among equals
pub fn rank_active_modes(config: &Configuration, activations: &IndexMap<String, bool>) -> Vec<String> {
    let mut active: Vec<_> = config
        .modes
        .iter()
        .filter(|mode| activations.get(&mode.name).copied().unwrap_or(false))
        .collect();
    active.sort_by(|a, b| b.priority.cmp(&a.priority));
    active.into_iter().map(|mode| mode.name.clone()).collect()
}

/// Result of one evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedState {
    /// Declared room to its regime and provenance
    pub rooms: BTreeMap<String, ResolvedRegime>,
    /// Modes qualifying for the household mode, ranked; published
    pub active_modes: Vec<String>,
    /// Modes passing every activation predicate, ranked; these assign regimes
    pub engaged_modes: Vec<String>,
    /// `active_modes[0]`, or the default mode when none qualifies
    pub dominant_mode: String,
}

impl ResolvedState {
    /// Plain room to regime mapping
    pub fn regimes(&self) -> BTreeMap<String, String> {
        self.rooms
            .iter()
            .map(|(room, resolved)| (room.clone(), resolved.regime.clone()))
            .collect()
    }

    pub fn regime(&self, room: &str) -> Option<&str> {
        self.rooms.get(room).map(|r| r.regime.as_str())
    }
}

/// Runs evaluation and resolution with configured fallbacks
#[derive(Debug, Clone)]
pub struct RegimeResolver {
    default_regime: String,
    default_mode: String,
}

impl Default for RegimeResolver {
    fn default() -> Self {
        Self::new(DEFAULT_REGIME, DEFAULT_MODE)
    }
}

impl RegimeResolver {
    pub fn new(default_regime: impl Into<String>, default_mode: impl Into<String>) -> Self {
        Self {
            default_regime: default_regime.into(),
            default_mode: default_mode.into(),
        }
    }

    /// Evaluate `config` against `ctx`
    pub fn resolve(&self, config: &Configuration, ctx: &EvalContext) -> ResolvedState {
        let evaluator = ActivationEvaluator::new(ctx);
        let activations = evaluator.evaluate(config);

        let active_modes = rank_active_modes(config, &evaluator.evaluate_dominant(config));
        let dominant_mode = active_modes
            .first()
            .cloned()
            .unwrap_or_else(|| self.default_mode.clone());

        let state = ResolvedState {
            rooms: resolve_room_regimes(config, &activations, &self.default_regime),
            active_modes,
            engaged_modes: rank_active_modes(config, &activations),
            dominant_mode,
        };

        debug!(
            now = %ctx.now,
            dominant = %state.dominant_mode,
            active = ?state.active_modes,
            engaged = ?state.engaged_modes,
            "Resolved state"
        );
        state
    }
}
