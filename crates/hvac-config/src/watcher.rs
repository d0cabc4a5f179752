//! File change detection for hot reload
//!
//! The watcher polls the document's metadata. A change is reported only once
//! the file has stopped growing for the stability window, so a partially
//! written file is not picked up. Reported changes pass through a trailing
//! debounce before a reload is triggered.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

/// Owns the background watch tasks; dropping it stops them
#[derive(Debug)]
pub struct WatchHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl WatchHandle {
    pub(crate) fn new(tasks: Vec<JoinHandle<()>>) -> Self {
        Self { tasks }
    }

    /// Stop watching; a pending debounced reload is discarded
    pub fn stop(self) {
        drop(self);
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// What the watcher compares between polls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

pub(crate) async fn fingerprint(path: &Path) -> Option<Fingerprint> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    Some(Fingerprint {
        modified: metadata.modified().ok(),
        len: metadata.len(),
    })
}

/// Wait until the file size has not changed for `stability`
///
/// Returns the settled fingerprint, or `None` if the file disappeared.
async fn wait_until_stable(
    path: &Path,
    poll: Duration,
    stability: Duration,
) -> Option<Fingerprint> {
    let mut last = fingerprint(path).await?;
    let mut since = Instant::now();

    loop {
        time::sleep(poll).await;
        let current = fingerprint(path).await?;
        if current.len != last.len {
            since = Instant::now();
        }
        last = current;
        if since.elapsed() >= stability {
            return Some(last);
        }
    }
}

/// Poll `path` and send a notification for every settled change
pub(crate) async fn poll_changes(
    path: PathBuf,
    baseline: Option<Fingerprint>,
    poll: Duration,
    stability: Duration,
    tx: mpsc::UnboundedSender<()>,
) {
    let mut known = baseline;
    let mut ticker = time::interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let current = fingerprint(&path).await;
        if current == known {
            continue;
        }

        match current {
            None => {
                warn!("Watched document disappeared: {:?}", path);
                known = None;
            }
            Some(_) => {
                trace!("Change detected, waiting for writes to finish: {:?}", path);
                known = wait_until_stable(&path, poll, stability).await;
                if known.is_some() {
                    debug!("Document changed: {:?}", path);
                    if tx.send(()).is_err() {
                        return;
                    }
                }
            }
        }
    }
}

/// Trailing debounce: `fire` runs once `window` has passed without a new
/// notification. A closed channel discards a pending fire.
pub(crate) async fn debounce<F, Fut>(mut rx: mpsc::UnboundedReceiver<()>, window: Duration, mut fire: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    while rx.recv().await.is_some() {
        loop {
            match time::timeout(window, rx.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return,
                Err(_) => break,
            }
        }
        fire().await;
    }
}
