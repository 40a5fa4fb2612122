//! In-memory mesh registry and helpers for tests

use crate::{CoreError, MeshRegistry, QueryMeta, QueryOptions, Result};
use async_trait::async_trait;
use kube::api::DynamicObject;
use router_api::consul::{ServiceRouterConfigEntry, ServiceSplit, ServiceSplitterConfigEntry};
use router_api::{ConfigEntry, ConfigEntryKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// Versioned config-entry store with blocking reads.
///
/// Like Consul, a single index covers every entry.
pub(crate) struct FakeRegistry {
    state: Mutex<State>,
    changed: Notify,
    fail_gets: AtomicBool,
    failed_gets: AtomicUsize,
    fail_sets: AtomicUsize,
    reject_set: AtomicBool,
}

#[derive(Default)]
struct State {
    index: u64,
    entries: HashMap<(ConfigEntryKind, String), ConfigEntry>,
    writes: Vec<ConfigEntry>,
    polls: HashMap<String, usize>,
}

impl FakeRegistry {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State {
                index: 1,
                ..Default::default()
            }),
            changed: Notify::new(),
            fail_gets: AtomicBool::new(false),
            failed_gets: AtomicUsize::new(0),
            fail_sets: AtomicUsize::new(0),
            reject_set: AtomicBool::new(false),
        }
    }

    /// Store an entry as an out-of-band writer would
    pub(crate) fn put_entry(&self, entry: ConfigEntry) {
        self.store(entry);
    }

    pub(crate) fn entry(&self, kind: ConfigEntryKind, name: &str) -> Option<ConfigEntry> {
        let state = self.state.lock().unwrap();
        state.entries.get(&(kind, name.to_string())).cloned()
    }

    pub(crate) fn router(&self, name: &str) -> Option<ServiceRouterConfigEntry> {
        match self.entry(ConfigEntryKind::ServiceRouter, name) {
            Some(ConfigEntry::ServiceRouter(router)) => Some(router),
            _ => None,
        }
    }

    pub(crate) fn index(&self) -> u64 {
        self.state.lock().unwrap().index
    }

    /// Documents accepted by `set_config_entry`, as submitted
    pub(crate) fn writes(&self) -> Vec<ConfigEntry> {
        self.state.lock().unwrap().writes.clone()
    }

    /// Blocking reads currently in flight
    pub(crate) fn active_polls(&self) -> usize {
        self.state.lock().unwrap().polls.values().sum()
    }

    pub(crate) fn polls_for(&self, name: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.polls.get(name).copied().unwrap_or(0)
    }

    pub(crate) fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn failed_gets(&self) -> usize {
        self.failed_gets.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_next_sets(&self, count: usize) {
        self.fail_sets.store(count, Ordering::SeqCst);
    }

    pub(crate) fn reject_next_set(&self) {
        self.reject_set.store(true, Ordering::SeqCst);
    }

    fn store(&self, mut entry: ConfigEntry) {
        let mut state = self.state.lock().unwrap();
        state.index += 1;
        let index = state.index;
        match &mut entry {
            ConfigEntry::ServiceRouter(router) => router.modify_index = index,
            ConfigEntry::ServiceSplitter(splitter) => splitter.modify_index = index,
            ConfigEntry::Unknown => {}
        }
        let key = entry.kind().zip(entry.name().map(str::to_string));
        if let Some(key) = key {
            state.entries.insert(key, entry);
        }
        drop(state);
        self.changed.notify_waiters();
    }

    fn read(&self, kind: ConfigEntryKind, name: &str) -> (Option<ConfigEntry>, QueryMeta) {
        let state = self.state.lock().unwrap();
        let entry = state.entries.get(&(kind, name.to_string())).cloned();
        (entry, QueryMeta { last_index: state.index })
    }

    async fn wait_past(&self, wait_index: u64) {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.index() > wait_index {
                return;
            }
            notified.await;
        }
    }
}

struct PollGuard<'a> {
    registry: &'a FakeRegistry,
    name: String,
}

impl<'a> PollGuard<'a> {
    fn new(registry: &'a FakeRegistry, name: &str) -> Self {
        let mut state = registry.state.lock().unwrap();
        *state.polls.entry(name.to_string()).or_default() += 1;
        Self {
            registry,
            name: name.to_string(),
        }
    }
}

impl Drop for PollGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.registry.state.lock().unwrap();
        if let Some(count) = state.polls.get_mut(&self.name) {
            *count -= 1;
        }
    }
}

#[async_trait]
impl MeshRegistry for FakeRegistry {
    async fn get_config_entry(
        &self,
        kind: ConfigEntryKind,
        name: &str,
        options: &QueryOptions,
    ) -> Result<(Option<ConfigEntry>, QueryMeta)> {
        if self.fail_gets.load(Ordering::SeqCst) {
            self.failed_gets.fetch_add(1, Ordering::SeqCst);
            return Err(CoreError::Registry("connection refused".to_string()));
        }

        if let Some(wait_index) = options.wait_index {
            let _guard = PollGuard::new(self, name);
            let wait_time = options.wait_time.unwrap_or(Duration::from_secs(300));
            let _ = tokio::time::timeout(wait_time, self.wait_past(wait_index)).await;
        }

        Ok(self.read(kind, name))
    }

    async fn set_config_entry(&self, entry: &ConfigEntry) -> Result<bool> {
        let remaining = self.fail_sets.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_sets.store(remaining - 1, Ordering::SeqCst);
            return Err(CoreError::Registry("connection reset".to_string()));
        }
        if self.reject_set.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }

        self.state.lock().unwrap().writes.push(entry.clone());
        self.store(entry.clone());
        Ok(true)
    }
}

pub(crate) fn splitter(service: &str, weight: f32) -> ConfigEntry {
    ConfigEntry::ServiceSplitter(ServiceSplitterConfigEntry {
        name: service.to_string(),
        splits: vec![
            ServiceSplit {
                weight,
                service_subset: Some("v1".to_string()),
                ..Default::default()
            },
            ServiceSplit {
                weight: 100.0 - weight,
                service_subset: Some("v2".to_string()),
                ..Default::default()
            },
        ],
        ..Default::default()
    })
}

pub(crate) fn route_object(prefix: &str, service: &str) -> DynamicObject {
    serde_json::from_value(serde_json::json!({
        "apiVersion": "prefixrouter.io/v1beta1",
        "kind": "Route",
        "metadata": { "name": "route", "namespace": "default" },
        "spec": { "prefix": prefix, "service": service }
    }))
    .unwrap()
}

/// Wait (bounded) for a condition driven by background tasks
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
