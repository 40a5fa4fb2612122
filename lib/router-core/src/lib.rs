//! Core route reconciliation for the prefix router
//!
//! This library provides:
//! - Route event adapter turning resource notifications into operations
//! - Route table owned by the control loop
//! - Config-entry watchers long-polling the mesh registry for drift
//! - Registry sync writing the whole routing document
//! - The control loop tying them together

pub mod adapter;
pub mod controller;
pub mod error;
pub mod metrics;
pub mod operation;
pub mod registry;
pub mod route_table;
pub mod sync;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::RouteEventAdapter;
pub use controller::{ControllerConfig, RouteController};
pub use error::{CoreError, Result};
pub use metrics::ControllerMetrics;
pub use operation::Operation;
pub use registry::{MeshRegistry, QueryMeta, QueryOptions};
pub use route_table::{RouteEntry, RouteTable};
pub use watcher::{ConfigEntrySnapshot, WatcherConfig, WatcherHandle, WatcherId};
