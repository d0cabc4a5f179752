//! Mode evaluation engine
//!
//! `ModeEngine` decides when the household state is evaluated and where the
//! result goes. It evaluates on a fixed tick and whenever a signal event
//! arrives on the bus (calendar update, holiday flag, explicit request,
//! configuration reload), then publishes the resolved state on the retained
//! topics.

use chrono::{Local, NaiveDateTime, Utc};
use hvac_config::ConfigStore;
use hvac_core::events::{
    ActiveRegimesData, CalendarUpdatedData, CurrentModeData, HolidayUpdatedData, CALENDAR_UPDATED,
    CONFIG_RELOADED, EVALUATE_REQUESTED, HOLIDAY_UPDATED,
};
use hvac_core::{CalendarEvent, Context, Event};
use hvac_event_bus::EventBus;
use hvac_modes::{EvalContext, RegimeResolver, RegimeSource, ResolvedState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

/// External signals the rules react to, as last reported
#[derive(Debug, Clone, Default)]
struct Signals {
    calendar_events: Vec<CalendarEvent>,
    is_holiday: bool,
}

/// Shared by the engine handle and its background task
struct Inner {
    store: Arc<ConfigStore>,
    bus: Arc<EventBus>,
    resolver: RegimeResolver,
    signals: RwLock<Signals>,
    /// Fixed evaluation time for tests
    time_override: Option<NaiveDateTime>,
}

/// Evaluates the active configuration and publishes the resolved state
pub struct ModeEngine {
    inner: Arc<Inner>,
    tick: Duration,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Shutdown signal sender
    shutdown_tx: broadcast::Sender<()>,
}

impl ModeEngine {
    pub fn new(store: Arc<ConfigStore>, bus: Arc<EventBus>, resolver: RegimeResolver) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            inner: Arc::new(Inner {
                store,
                bus,
                resolver,
                signals: RwLock::new(Signals::default()),
                time_override: None,
            }),
            tick: Duration::from_secs(60),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Set the period of scheduled evaluations; must be non-zero
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Always evaluate at `now` instead of the local clock
    ///
    /// Only takes effect before the engine is started.
    pub fn with_time(mut self, now: NaiveDateTime) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.time_override = Some(now);
        }
        self
    }

    /// Start the engine
    ///
    /// Subscribes to the bus before returning, so signals fired afterwards
    /// are never missed. The first evaluation runs immediately.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Mode engine already running");
            return;
        }

        info!(tick_secs = self.tick.as_secs(), "Starting mode engine");

        let mut event_rx = self.inner.bus.subscribe_all();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let inner = self.inner.clone();
        let running = self.running.clone();
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        trace!("Scheduled evaluation");
                        inner.evaluate(Context::new()).await;
                    }
                    event_result = event_rx.recv() => {
                        match event_result {
                            Ok(event) => inner.process_event(&event).await,
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                // Signals may have been dropped; re-evaluate with what we have
                                warn!("Mode engine lagged by {} events", n);
                                inner.evaluate(Context::new()).await;
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                info!("Event bus closed, stopping mode engine");
                                break;
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Received shutdown signal");
                        break;
                    }
                }
            }

            running.store(false, Ordering::SeqCst);
            info!("Mode engine stopped");
        });
    }

    /// Stop the engine
    pub fn stop(&self) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }

        info!("Stopping mode engine");
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Evaluate and publish right away
    pub async fn evaluate_now(&self) -> ResolvedState {
        self.inner.evaluate(Context::new()).await
    }
}

impl Inner {
    fn now(&self) -> NaiveDateTime {
        self.time_override
            .unwrap_or_else(|| Local::now().naive_local())
    }

    async fn process_event(&self, event: &Event) {
        match event.event_type.as_str() {
            CALENDAR_UPDATED => match event.decode::<CalendarUpdatedData>() {
                Some(update) => {
                    debug!(count = update.data.events.len(), "Calendar events updated");
                    self.signals.write().await.calendar_events = update.data.events;
                }
                None => {
                    warn!("Ignoring malformed {} event: {}", CALENDAR_UPDATED, event.data);
                    return;
                }
            },
            HOLIDAY_UPDATED => match event.decode::<HolidayUpdatedData>() {
                Some(update) => {
                    debug!(is_holiday = update.data.is_holiday, "Holiday flag updated");
                    self.signals.write().await.is_holiday = update.data.is_holiday;
                }
                None => {
                    warn!("Ignoring malformed {} event: {}", HOLIDAY_UPDATED, event.data);
                    return;
                }
            },
            EVALUATE_REQUESTED | CONFIG_RELOADED => {
                debug!(event_type = %event.event_type, "Evaluation requested");
            }
            _ => return,
        }

        self.evaluate(event.context.child()).await;
    }

    /// Resolve the current snapshot and publish the result
    async fn evaluate(&self, context: Context) -> ResolvedState {
        // One snapshot per evaluation, even if a reload lands meanwhile
        let config = self.store.current();
        let ctx = {
            let signals = self.signals.read().await;
            EvalContext::at(self.now())
                .with_calendar_events(signals.calendar_events.clone())
                .with_holiday(signals.is_holiday)
        };

        let state = self.resolver.resolve(&config, &ctx);

        for (room, resolved) in &state.rooms {
            match &resolved.source {
                RegimeSource::Mode { name, priority } => {
                    debug!(%room, regime = %resolved.regime, mode = %name, priority, "Regime from mode")
                }
                source => trace!(%room, regime = %resolved.regime, ?source, "Regime from fallback"),
            }
        }

        self.publish(&state, &context);
        state
    }

    fn publish(&self, state: &ResolvedState, context: &Context) {
        let timestamp = Utc::now();
        let regimes = state.regimes();

        info!(
            mode = %state.dominant_mode,
            active = ?state.active_modes,
            "Publishing resolved regimes"
        );

        self.bus.fire_typed_retained(
            ActiveRegimesData {
                status: "success".to_string(),
                regimes: regimes.clone(),
                timestamp,
            },
            context.clone(),
        );
        self.bus.fire_typed_retained(
            CurrentModeData {
                mode: state.dominant_mode.clone(),
                active_modes: state.active_modes.clone(),
                regimes,
                timestamp,
            },
            context.clone(),
        );
    }
}
