//! Mode evaluation engine
//!
//! Turns a configuration snapshot plus the current signals into the
//! household's climate state.
//!
//! # Pipeline
//!
//! ```text
//! EvalContext ──► ActivationEvaluator ──► mode → active
//!                                             │
//! Configuration ──────────────────────────────┴──► RegimeResolver ──► ResolvedState
//! ```
//!
//! - [`EvalContext`] - time, calendar events and holiday flag
//! - [`ActivationEvaluator`] - checks each mode's activation rule
//! - [`RegimeResolver`] - expands targets, settles conflicts by priority and
//!   picks the dominant mode
//!
//! Everything here is synchronous and free of side effects; the server crate
//! decides when to evaluate and where the result goes.

pub mod activation;
pub mod resolver;

pub use activation::{evaluate_activations, ActivationEvaluator, EvalContext};
pub use resolver::{
    rank_active_modes, resolve_dominant_mode, resolve_room_regimes, RegimeResolver,
    RegimeSource, ResolvedRegime, ResolvedState,
};
