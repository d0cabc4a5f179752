//! Hot-reloading configuration store
//!
//! The store owns the current [`Configuration`] snapshot. Readers take an
//! `Arc` to it and keep a consistent view for as long as they hold it; a
//! reload builds a complete new snapshot and swaps the pointer, so nobody
//! ever sees a half-applied document.

use hvac_core::{ConfigDiff, Configuration};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, instrument, warn};

use crate::error::ConfigResult;
use crate::loader::load_document;
use crate::schema::CompiledSchema;
use crate::validate::{validate_document, Validated};
use crate::watcher::{self, Fingerprint, WatchHandle};

/// Quiet period after the last change before a reload runs
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// How long the file size must stay put before a change counts
pub const DEFAULT_STABILITY: Duration = Duration::from_millis(500);

/// Metadata polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Called with (new, old, changes) after every accepted reload
pub type ReloadListener =
    Box<dyn Fn(&Arc<Configuration>, &Arc<Configuration>, &ConfigDiff) + Send + Sync>;

/// Where the store reads from and how it watches
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub document_path: PathBuf,
    /// Schema file; `None` uses the bundled schema
    pub schema_path: Option<PathBuf>,
    pub debounce: Duration,
    pub stability: Duration,
    pub poll_interval: Duration,
}

impl StoreSettings {
    pub fn new(document_path: impl Into<PathBuf>) -> Self {
        Self {
            document_path: document_path.into(),
            schema_path: None,
            debounce: DEFAULT_DEBOUNCE,
            stability: DEFAULT_STABILITY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_schema(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_path = Some(path.into());
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_stability(mut self, stability: Duration) -> Self {
        self.stability = stability;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Holds the active configuration and reloads it on demand or on change
pub struct ConfigStore {
    settings: StoreSettings,
    schema: CompiledSchema,
    current: RwLock<Arc<Configuration>>,
    reload_lock: Mutex<()>,
    listener: RwLock<Option<ReloadListener>>,
}

impl ConfigStore {
    /// Load and validate the initial configuration
    ///
    /// Unlike a reload, a failure here is fatal: there is no previous
    /// configuration to fall back to.
    pub async fn open(settings: StoreSettings) -> ConfigResult<Self> {
        let schema = match &settings.schema_path {
            Some(path) => CompiledSchema::from_file(path)?,
            None => CompiledSchema::bundled()?,
        };

        let mut store = Self {
            settings,
            schema,
            current: RwLock::new(Arc::new(Configuration::default())),
            reload_lock: Mutex::new(()),
            listener: RwLock::new(None),
        };

        let validated = store.load().await?;
        validated.log_warnings();
        info!(
            path = %store.settings.document_path.display(),
            rooms = validated.config.rooms.len(),
            modes = validated.config.modes.len(),
            "Configuration loaded"
        );
        store.current = RwLock::new(Arc::new(validated.config));
        Ok(store)
    }

    /// Open the store and start watching its document
    ///
    /// The document is fingerprinted before the initial load, so an edit
    /// landing while the store opens still triggers a reload.
    pub async fn start(settings: StoreSettings) -> ConfigResult<(Arc<Self>, WatchHandle)> {
        let baseline = watcher::fingerprint(&settings.document_path).await;
        let store = Arc::new(Self::open(settings).await?);
        let handle = store.watch_from(baseline);
        Ok((store, handle))
    }

    /// Spawn the watch tasks
    ///
    /// Changes made after this returns trigger a debounced reload.
    pub async fn watch(self: &Arc<Self>) -> WatchHandle {
        let baseline = watcher::fingerprint(&self.settings.document_path).await;
        self.watch_from(baseline)
    }

    /// Spawn the watch tasks, treating any difference from `baseline` as a change
    fn watch_from(self: &Arc<Self>, baseline: Option<Fingerprint>) -> WatchHandle {
        let path = self.settings.document_path.clone();
        let (tx, rx) = mpsc::unbounded_channel();

        info!(
            path = %path.display(),
            debounce_ms = self.settings.debounce.as_millis() as u64,
            "Watching configuration"
        );

        let poller = tokio::spawn(watcher::poll_changes(
            path,
            baseline,
            self.settings.poll_interval,
            self.settings.stability,
            tx,
        ));

        let store = Arc::clone(self);
        let reloader = tokio::spawn(watcher::debounce(rx, self.settings.debounce, move || {
            let store = Arc::clone(&store);
            async move {
                // Failures are logged by reload and the old snapshot stays
                let _ = store.reload().await;
            }
        }));

        WatchHandle::new(vec![poller, reloader])
    }

    /// Read the document and run it through validation without applying it
    pub async fn load(&self) -> ConfigResult<Validated> {
        let document = load_document(&self.settings.document_path).await?;
        self.validate(&document)
    }

    pub fn validate(&self, document: &Value) -> ConfigResult<Validated> {
        validate_document(&self.schema, document)
    }

    /// The active configuration snapshot
    pub fn current(&self) -> Arc<Configuration> {
        match self.current.read() {
            Ok(current) => Arc::clone(&current),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Register the reload callback, replacing any previous one
    pub fn set_listener<F>(&self, listener: F)
    where
        F: Fn(&Arc<Configuration>, &Arc<Configuration>, &ConfigDiff) + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.listener.write() {
            *slot = Some(Box::new(listener));
        }
    }

    /// Reload the document now
    ///
    /// On failure the error is logged and the active snapshot is left
    /// untouched. On success the snapshot is swapped and then the listener
    /// runs with the new and old snapshots.
    #[instrument(skip(self), fields(path = %self.settings.document_path.display()))]
    pub async fn reload(&self) -> ConfigResult<ConfigDiff> {
        let _guard = self.reload_lock.lock().await;
        info!("Reloading configuration");

        let validated = match self.load().await {
            Ok(validated) => validated,
            Err(e) => {
                error!("Configuration reload rejected, keeping previous: {}", e);
                for issue in e.issues() {
                    debug!(path = %issue.path, "{}", issue.message);
                }
                return Err(e);
            }
        };
        validated.log_warnings();

        let new = Arc::new(validated.config);
        let old = self.swap(Arc::clone(&new));
        let diff = new.diff_from(&old);

        info!(
            added = diff.added.len(),
            removed = diff.removed.len(),
            modified = diff.modified.len(),
            total = diff.total,
            "Configuration reloaded"
        );
        if !diff.is_empty() {
            debug!(added = ?diff.added, removed = ?diff.removed, modified = ?diff.modified, "Mode changes");
        }

        self.notify(&new, &old, &diff);
        Ok(diff)
    }

    fn swap(&self, new: Arc<Configuration>) -> Arc<Configuration> {
        match self.current.write() {
            Ok(mut current) => std::mem::replace(&mut *current, new),
            Err(poisoned) => {
                warn!("Configuration lock was poisoned, recovering");
                std::mem::replace(&mut *poisoned.into_inner(), new)
            }
        }
    }

    fn notify(&self, new: &Arc<Configuration>, old: &Arc<Configuration>, diff: &ConfigDiff) {
        if let Ok(listener) = self.listener.read() {
            if let Some(listener) = listener.as_ref() {
                listener(new, old, diff);
            }
        }
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("settings", &self.settings)
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = StoreSettings::new("config/modes.yaml");
        assert_eq!(settings.debounce, Duration::from_millis(1000));
        assert_eq!(settings.stability, Duration::from_millis(500));
        assert_eq!(settings.poll_interval, Duration::from_millis(100));
        assert!(settings.schema_path.is_none());
    }

    #[test]
    fn test_settings_builders() {
        let settings = StoreSettings::new("modes.json")
            .with_schema("schema.json")
            .with_debounce(Duration::from_millis(50))
            .with_stability(Duration::from_millis(20))
            .with_poll_interval(Duration::from_millis(5));
        assert_eq!(settings.schema_path, Some(PathBuf::from("schema.json")));
        assert_eq!(settings.debounce, Duration::from_millis(50));
        assert_eq!(settings.stability, Duration::from_millis(20));
        assert_eq!(settings.poll_interval, Duration::from_millis(5));
    }

    const ONE_MODE: &str = "rooms: [kuchyna]\nmodes:\n  - {name: a, priority: 1, room_regime: {kuchyna: PT}}\n";
    const TWO_MODES: &str = "rooms: [kuchyna]\nmodes:\n  - {name: a, priority: 1, room_regime: {kuchyna: PT}}\n  - {name: b, priority: 2, room_regime: {kuchyna: ECO}}\n";

    #[tokio::test]
    async fn test_edit_before_watch_is_reloaded() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("modes.yaml");
        std::fs::write(&path, ONE_MODE).unwrap();

        let settings = StoreSettings::new(&path)
            .with_debounce(Duration::from_millis(50))
            .with_stability(Duration::from_millis(50))
            .with_poll_interval(Duration::from_millis(10));
        let baseline = watcher::fingerprint(&path).await;
        let store = Arc::new(ConfigStore::open(settings).await.unwrap());

        // Edited after the initial load, before the watch starts
        std::fs::write(&path, TWO_MODES).unwrap();
        let handle = store.watch_from(baseline);

        let (tx, mut rx) = mpsc::unbounded_channel();
        store.set_listener(move |_, _, diff| {
            let _ = tx.send(diff.clone());
        });

        let diff = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("reload was not triggered")
            .unwrap();
        assert_eq!(diff.added, vec!["b"]);
        assert_eq!(store.current().modes.len(), 2);
        handle.stop();
    }
}
