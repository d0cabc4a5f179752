//! Startup parameters read from the environment

use anyhow::{bail, Context as _, Result};
use hvac_config::{StoreSettings, DEFAULT_DEBOUNCE, DEFAULT_POLL_INTERVAL, DEFAULT_STABILITY};
use hvac_core::{DEFAULT_MODE, DEFAULT_REGIME};
use hvac_modes::RegimeResolver;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MODES_PATH: &str = "config/modes.yaml";
const DEFAULT_TICK: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub modes_path: PathBuf,
    pub schema_path: Option<PathBuf>,
    pub debounce: Duration,
    pub stability: Duration,
    pub poll_interval: Duration,
    /// Period of scheduled evaluations
    pub tick: Duration,
    pub default_regime: String,
    pub default_mode: String,
}

impl ServerSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any variable source; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let millis = |name: &str, default: Duration| -> Result<Duration> {
            match var(name) {
                Some(value) => value
                    .trim()
                    .parse()
                    .map(Duration::from_millis)
                    .with_context(|| format!("{name} must be a whole number of milliseconds, got '{value}'")),
                None => Ok(default),
            }
        };

        let tick = match var("HVAC_TICK_SECS") {
            Some(value) => value
                .trim()
                .parse()
                .map(Duration::from_secs)
                .with_context(|| format!("HVAC_TICK_SECS must be a whole number of seconds, got '{value}'"))?,
            None => DEFAULT_TICK,
        };

        let settings = Self {
            modes_path: var("HVAC_MODES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODES_PATH)),
            schema_path: var("HVAC_SCHEMA_PATH").map(PathBuf::from),
            debounce: millis("HVAC_DEBOUNCE_MS", DEFAULT_DEBOUNCE)?,
            stability: millis("HVAC_STABILITY_MS", DEFAULT_STABILITY)?,
            poll_interval: millis("HVAC_POLL_MS", DEFAULT_POLL_INTERVAL)?,
            tick,
            default_regime: var("HVAC_DEFAULT_REGIME").unwrap_or_else(|| DEFAULT_REGIME.to_string()),
            default_mode: var("HVAC_DEFAULT_MODE").unwrap_or_else(|| DEFAULT_MODE.to_string()),
        };

        if settings.tick.is_zero() {
            bail!("HVAC_TICK_SECS must be greater than zero");
        }
        if settings.poll_interval.is_zero() {
            bail!("HVAC_POLL_MS must be greater than zero");
        }

        Ok(settings)
    }

    pub fn store_settings(&self) -> StoreSettings {
        let settings = StoreSettings::new(&self.modes_path)
            .with_debounce(self.debounce)
            .with_stability(self.stability)
            .with_poll_interval(self.poll_interval);
        match &self.schema_path {
            Some(schema) => settings.with_schema(schema),
            None => settings,
        }
    }

    pub fn resolver(&self) -> RegimeResolver {
        RegimeResolver::new(&self.default_regime, &self.default_mode)
    }
}
