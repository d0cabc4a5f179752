//! Climate mode engine service
//!
//! Loads the rule document, keeps it hot-reloaded, and publishes the
//! resolved per-room regimes and household mode on the event bus.

mod engine;
mod settings;

use anyhow::{Context as _, Result};
use hvac_config::ConfigStore;
use hvac_core::Context;
use hvac_event_bus::EventBus;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::engine::ModeEngine;
use crate::settings::ServerSettings;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("Starting climate mode engine");

    let settings = ServerSettings::from_env()?;
    info!(
        modes = %settings.modes_path.display(),
        schema = ?settings.schema_path,
        "Settings loaded"
    );

    let bus = Arc::new(EventBus::new());

    let (store, watch) = ConfigStore::start(settings.store_settings())
        .await
        .with_context(|| format!("failed to load {}", settings.modes_path.display()))?;

    // Every accepted reload goes on the bus; the engine re-evaluates on it
    let reload_bus = bus.clone();
    store.set_listener(move |_new, _old, changes| {
        reload_bus.fire_typed(changes.clone(), Context::new());
    });

    let engine = ModeEngine::new(store, bus, settings.resolver()).with_tick(settings.tick);
    engine.start();

    info!("Climate mode engine is running");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    engine.stop();
    watch.stop();

    Ok(())
}
