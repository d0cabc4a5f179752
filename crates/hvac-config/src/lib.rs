//! Rule document loading and hot reload
//!
//! This crate turns the on-disk rule document into a validated
//! [`hvac_core::Configuration`] and keeps it current:
//!
//! - YAML or JSON documents, chosen by file extension
//! - JSON Schema (draft-07) validation, bundled or from a file
//! - Semantic checks the schema cannot express (unique mode names,
//!   reachable targets) plus non-fatal warnings
//! - A [`ConfigStore`] that watches the file, debounces bursts of writes and
//!   swaps in the new snapshot atomically
//!
//! # Example
//!
//! ```ignore
//! use hvac_config::{ConfigStore, StoreSettings};
//!
//! let (store, _watch) = ConfigStore::start(StoreSettings::new("config/modes.yaml")).await?;
//! store.set_listener(|new, _old, changes| {
//!     println!("{} modes, {} modified", new.modes.len(), changes.modified.len());
//! });
//! let snapshot = store.current();
//! ```

mod error;
mod loader;
mod schema;
mod store;
mod validate;
mod watcher;

pub use error::{ConfigError, ConfigResult, ValidationIssue, ValidationWarning};
pub use loader::{load_document, parse_document, DocumentFormat};
pub use schema::{CompiledSchema, BUNDLED_SCHEMA};
pub use store::{
    ConfigStore, ReloadListener, StoreSettings, DEFAULT_DEBOUNCE, DEFAULT_POLL_INTERVAL,
    DEFAULT_STABILITY,
};
pub use validate::{validate_document, validate_semantics, Validated};
pub use watcher::WatchHandle;
