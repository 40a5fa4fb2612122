//! Config-entry watcher
//!
//! Each watcher long-polls one config entry in the mesh registry and emits a
//! [`ConfigEntrySnapshot`] whenever that entry changes. The poll is a
//! continuous loop that only ends when the owning [`WatcherHandle`] is
//! cancelled or dropped.

use crate::{MeshRegistry, QueryOptions, Result};
use router_api::{ConfigEntry, ConfigEntryKind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

static NEXT_WATCHER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one watcher instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WatcherId(pub(crate) u64);

impl WatcherId {
    fn next() -> Self {
        Self(NEXT_WATCHER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Watcher timing
#[derive(Clone, Debug)]
pub struct WatcherConfig {
    /// Upper bound for a single blocking query
    pub wait_time: Duration,
    /// Pause after a failed query before polling again
    pub error_delay: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            wait_time: Duration::from_secs(60),
            error_delay: Duration::from_secs(5),
        }
    }
}

/// State of a watched config entry at some registry index
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigEntrySnapshot {
    pub watcher: WatcherId,
    pub kind: ConfigEntryKind,
    pub name: String,
    /// `None` when the entry does not exist
    pub entry: Option<ConfigEntry>,
    pub index: u64,
}

/// Owner of a running watcher; cancels it on drop
#[derive(Debug)]
pub struct WatcherHandle {
    id: WatcherId,
    kind: ConfigEntryKind,
    name: String,
    cancel_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    /// Read the entry once, then keep long-polling it in the background.
    ///
    /// The first read is returned directly; later changes are sent on
    /// `snapshots`.
    pub async fn start(
        registry: Arc<dyn MeshRegistry>,
        kind: ConfigEntryKind,
        name: &str,
        config: &WatcherConfig,
        snapshots: mpsc::Sender<ConfigEntrySnapshot>,
    ) -> Result<(Self, ConfigEntrySnapshot)> {
        let (entry, meta) = registry
            .get_config_entry(kind, name, &QueryOptions::default())
            .await?;

        let id = WatcherId::next();
        let first = ConfigEntrySnapshot {
            watcher: id,
            kind,
            name: name.to_string(),
            entry,
            index: meta.last_index,
        };

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let poller = Poller {
            registry,
            id,
            kind,
            name: name.to_string(),
            config: config.clone(),
            last_index: meta.last_index.max(1),
            last_entry: first.entry.clone(),
            snapshots,
            cancel_rx,
        };
        let task = tokio::spawn(poller.run());

        debug!(watcher = id.0, %kind, %name, index = meta.last_index, "Config entry watcher started");

        Ok((
            Self {
                id,
                kind,
                name: name.to_string(),
                cancel_tx,
                task: Some(task),
            },
            first,
        ))
    }

    pub fn id(&self) -> WatcherId {
        self.id
    }

    /// Stop the watcher. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            self.cancel_tx.send_replace(true);
            task.abort();
            debug!(watcher = self.id.0, kind = %self.kind, name = %self.name, "Config entry watcher cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct Poller {
    registry: Arc<dyn MeshRegistry>,
    id: WatcherId,
    kind: ConfigEntryKind,
    name: String,
    config: WatcherConfig,
    last_index: u64,
    last_entry: Option<ConfigEntry>,
    snapshots: mpsc::Sender<ConfigEntrySnapshot>,
    cancel_rx: watch::Receiver<bool>,
}

impl Poller {
    async fn run(mut self) {
        loop {
            let options = QueryOptions::blocking(self.last_index, self.config.wait_time);
            let result = tokio::select! {
                biased;
                _ = cancelled(&mut self.cancel_rx) => return,
                result = self.registry.get_config_entry(self.kind, &self.name, &options) => result,
            };

            let (entry, meta) = match result {
                Ok(response) => response,
                Err(e) => {
                    warn!(kind = %self.kind, name = %self.name, "Config entry watch failed: {}", e);
                    tokio::select! {
                        biased;
                        _ = cancelled(&mut self.cancel_rx) => return,
                        _ = tokio::time::sleep(self.config.error_delay) => continue,
                    }
                }
            };

            if meta.last_index < self.last_index {
                // Registry index went backwards (e.g. snapshot restore)
                debug!(kind = %self.kind, name = %self.name, "Registry index reset");
                self.last_index = 0;
                continue;
            }
            if meta.last_index == self.last_index {
                continue;
            }
            self.last_index = meta.last_index;

            // The index is shared by all entries, so it also moves on unrelated writes
            if entry == self.last_entry {
                continue;
            }
            self.last_entry = entry.clone();

            let snapshot = ConfigEntrySnapshot {
                watcher: self.id,
                kind: self.kind,
                name: self.name.clone(),
                entry,
                index: meta.last_index,
            };
            debug!(kind = %self.kind, name = %self.name, index = meta.last_index, "Config entry changed");

            tokio::select! {
                biased;
                _ = cancelled(&mut self.cancel_rx) => return,
                sent = self.snapshots.send(snapshot) => {
                    if sent.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

async fn cancelled(cancel_rx: &mut watch::Receiver<bool>) {
    // A dropped sender also counts as cancellation
    let _ = cancel_rx.wait_for(|cancelled| *cancelled).await;
}
