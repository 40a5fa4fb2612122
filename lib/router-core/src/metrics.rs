//! Prometheus metrics for the route controller

use crate::Result;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Controller metrics, cheap to clone
#[derive(Clone)]
pub struct ControllerMetrics {
    /// Routes currently in the table
    pub routes: IntGauge,
    /// Config-entry watchers currently running
    pub active_watchers: IntGauge,
    /// Registry writes by result
    pub registry_syncs_total: IntCounterVec,
    /// Route operations by kind
    pub operations_total: IntCounterVec,
    /// Config-entry snapshots by outcome
    pub config_entry_events_total: IntCounterVec,
    /// Prometheus registry for metrics
    pub registry: Arc<Registry>,
}

impl ControllerMetrics {
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let routes = IntGauge::new("prefix_router_routes", "Routes in the route table")?;
        let active_watchers = IntGauge::new(
            "prefix_router_active_watchers",
            "Running config entry watchers",
        )?;
        let registry_syncs_total = IntCounterVec::new(
            Opts::new("prefix_router_registry_syncs_total", "Registry route syncs"),
            &["result"],
        )?;
        let operations_total = IntCounterVec::new(
            Opts::new("prefix_router_operations_total", "Route operations processed"),
            &["kind"],
        )?;
        let config_entry_events_total = IntCounterVec::new(
            Opts::new(
                "prefix_router_config_entry_events_total",
                "Config entry snapshots received from watchers",
            ),
            &["outcome"],
        )?;

        registry.register(Box::new(routes.clone()))?;
        registry.register(Box::new(active_watchers.clone()))?;
        registry.register(Box::new(registry_syncs_total.clone()))?;
        registry.register(Box::new(operations_total.clone()))?;
        registry.register(Box::new(config_entry_events_total.clone()))?;

        Ok(Self {
            routes,
            active_watchers,
            registry_syncs_total,
            operations_total,
            config_entry_events_total,
            registry,
        })
    }

    /// Render all metrics in the Prometheus text format
    pub fn gather(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
