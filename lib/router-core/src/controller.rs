//! Route controller: the control loop owning the route table
//!
//! Route operations and config-entry snapshots arrive over channels and are
//! handled one at a time, so the table needs no lock. Every change to the
//! table is followed by a full registry sync.

use crate::sync;
use crate::{
    ConfigEntrySnapshot, ControllerMetrics, MeshRegistry, Operation, Result, RouteEntry,
    RouteEventAdapter, RouteTable, WatcherConfig, WatcherHandle,
};
use router_api::{ConfigEntryKind, RouteSpec};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Route controller configuration
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Name of the service-router document the controller manages
    pub service_name: String,
    /// Kind of config entry watched per backend service
    pub watch_kind: ConfigEntryKind,
    pub watcher: WatcherConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            service_name: "prefix-router".to_string(),
            watch_kind: ConfigEntryKind::ServiceSplitter,
            watcher: WatcherConfig::default(),
        }
    }
}

pub struct RouteController {
    config: ControllerConfig,
    registry: Arc<dyn MeshRegistry>,
    metrics: ControllerMetrics,
    table: RouteTable,
    operations: mpsc::Receiver<Operation>,
    snapshots_tx: mpsc::Sender<ConfigEntrySnapshot>,
    snapshots_rx: mpsc::Receiver<ConfigEntrySnapshot>,
    /// False after a failed sync, until one succeeds
    in_sync: bool,
}

impl RouteController {
    /// Create a controller and the adapter feeding it
    pub fn new(
        registry: Arc<dyn MeshRegistry>,
        config: ControllerConfig,
        metrics: ControllerMetrics,
    ) -> (Self, RouteEventAdapter) {
        let (operations_tx, operations) = mpsc::channel(1);
        let (snapshots_tx, snapshots_rx) = mpsc::channel(1);

        let controller = Self {
            config,
            registry,
            metrics,
            table: RouteTable::new(),
            operations,
            snapshots_tx,
            snapshots_rx,
            in_sync: true,
        };

        (controller, RouteEventAdapter::new(operations_tx))
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Run until `shutdown` turns true (or every adapter is dropped).
    /// All watchers are cancelled before this returns.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(service_name = %self.config.service_name, "Starting route controller");

        loop {
            tokio::select! {
                op = self.operations.recv() => match op {
                    Some(op) => self.handle_operation(op).await,
                    None => {
                        info!("Route operations closed");
                        break;
                    }
                },
                Some(snapshot) = self.snapshots_rx.recv() => self.handle_snapshot(snapshot).await,
                _ = stopped(&mut shutdown) => break,
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Apply one operation to the table and push the result.
    ///
    /// Removing an absent prefix leaves the table alone and skips the sync,
    /// unless the previous sync failed; then it is used to retry.
    pub async fn handle_operation(&mut self, op: Operation) {
        self.metrics
            .operations_total
            .with_label_values(&[op.kind()])
            .inc();

        let changed = match op {
            Operation::Add(route) => {
                self.add_route(route).await;
                true
            }
            Operation::Remove(route) => self.remove_route(&route.prefix),
        };
        self.update_gauges();

        if changed || !self.in_sync {
            // Failures are logged by the sync; the next event retriggers it
            let _ = self.refresh_routes().await;
        }
    }

    async fn add_route(&mut self, route: RouteSpec) {
        // The old watcher must be gone before the new one starts
        if self.table.release_watcher(&route.prefix) {
            debug!(prefix = %route.prefix, "Released previous watcher");
        }

        let watcher = match WatcherHandle::start(
            self.registry.clone(),
            self.config.watch_kind,
            &route.service,
            &self.config.watcher,
            self.snapshots_tx.clone(),
        )
        .await
        {
            Ok((handle, first)) => {
                debug!(
                    service = %route.service,
                    index = first.index,
                    exists = first.entry.is_some(),
                    "Watching {}", self.config.watch_kind
                );
                Some(handle)
            }
            Err(e) => {
                warn!(service = %route.service, "Failed to watch {}: {}", self.config.watch_kind, e);
                None
            }
        };

        self.table
            .insert(route.prefix, RouteEntry::new(route.service, watcher));
    }

    fn remove_route(&mut self, prefix: &str) -> bool {
        if self.table.remove(prefix) {
            true
        } else {
            debug!(%prefix, "Route not present, nothing to remove");
            false
        }
    }

    /// React to an externally observed config entry change.
    ///
    /// The external content is not merged; a matching change only
    /// retriggers a sync from the table.
    pub async fn handle_snapshot(&mut self, snapshot: ConfigEntrySnapshot) {
        let Some(prefix) = self.table.prefix_for_watcher(snapshot.watcher) else {
            debug!(name = %snapshot.name, "Ignoring snapshot from retired watcher");
            self.count_snapshot("stale");
            return;
        };

        let expected = snapshot.entry.as_ref().is_some_and(|entry| {
            entry.kind() == Some(snapshot.kind) && entry.name() == Some(snapshot.name.as_str())
        });
        if !expected {
            debug!(%prefix, name = %snapshot.name, "Ignoring unexpected config entry");
            self.count_snapshot("ignored");
            return;
        }

        info!(%prefix, kind = %snapshot.kind, name = %snapshot.name, index = snapshot.index, "Config entry changed externally, resyncing routes");
        self.count_snapshot("resync");
        let _ = self.refresh_routes().await;
    }

    async fn refresh_routes(&mut self) -> Result<()> {
        let result = sync::sync(
            self.registry.as_ref(),
            &self.config.service_name,
            &self.table,
        )
        .await;

        self.in_sync = result.is_ok();
        let label = if self.in_sync { "success" } else { "failure" };
        self.metrics
            .registry_syncs_total
            .with_label_values(&[label])
            .inc();
        result
    }

    fn shutdown(&mut self) {
        let cancelled = self.table.drain();
        self.update_gauges();
        info!(watchers = cancelled, "Route controller stopped");
    }

    fn count_snapshot(&self, outcome: &str) {
        self.metrics
            .config_entry_events_total
            .with_label_values(&[outcome])
            .inc();
    }

    fn update_gauges(&self) {
        self.metrics.routes.set(self.table.len() as i64);
        self.metrics
            .active_watchers
            .set(self.table.watcher_count() as i64);
    }
}

async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender also stops the loop
    let _ = shutdown.wait_for(|stop| *stop).await;
}
