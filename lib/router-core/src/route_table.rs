//! Route table owned by the control loop
//!
//! Each prefix owns its watcher. Prefixes routed to the same service each
//! watch that service's config entry, so one external edit resyncs once per
//! prefix; the sync writes the same document every time.

use crate::{WatcherHandle, WatcherId};
use std::cmp::Reverse;
use std::collections::HashMap;
use tracing::debug;

/// Routing target for one prefix
#[derive(Debug)]
pub struct RouteEntry {
    pub service: String,
    watcher: Option<WatcherHandle>,
}

impl RouteEntry {
    pub fn new(service: impl Into<String>, watcher: Option<WatcherHandle>) -> Self {
        Self {
            service: service.into(),
            watcher,
        }
    }

    pub fn watcher_id(&self) -> Option<WatcherId> {
        self.watcher.as_ref().map(WatcherHandle::id)
    }

    fn release(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            watcher.cancel();
        }
    }
}

/// Map from path prefix to routing target.
///
/// Every path that removes or replaces an entry cancels its watcher.
#[derive(Debug, Default)]
pub struct RouteTable {
    entries: HashMap<String, RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, prefix: &str) -> Option<&RouteEntry> {
        self.entries.get(prefix)
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.entries.contains_key(prefix)
    }

    /// Cancel the watcher of `prefix` while keeping its entry.
    /// Returns true if a watcher was running.
    pub fn release_watcher(&mut self, prefix: &str) -> bool {
        match self.entries.get_mut(prefix) {
            Some(entry) if entry.watcher.is_some() => {
                entry.release();
                true
            }
            _ => false,
        }
    }

    /// Insert or replace the entry for `prefix`
    pub fn insert(&mut self, prefix: impl Into<String>, entry: RouteEntry) {
        let prefix = prefix.into();
        if let Some(mut previous) = self.entries.insert(prefix.clone(), entry) {
            previous.release();
            debug!(%prefix, previous = %previous.service, "Replaced route entry");
        }
    }

    /// Remove the entry for `prefix`. Returns false if there was none.
    pub fn remove(&mut self, prefix: &str) -> bool {
        match self.entries.remove(prefix) {
            Some(mut entry) => {
                entry.release();
                true
            }
            None => false,
        }
    }

    /// Remove every entry, cancelling all watchers. Returns how many watchers were cancelled.
    pub fn drain(&mut self) -> usize {
        let mut cancelled = 0;
        for (_, mut entry) in self.entries.drain() {
            if entry.watcher.is_some() {
                cancelled += 1;
            }
            entry.release();
        }
        cancelled
    }

    /// Prefix whose entry owns the given watcher
    pub fn prefix_for_watcher(&self, id: WatcherId) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.watcher_id() == Some(id))
            .map(|(prefix, _)| prefix.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn watcher_count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.watcher.is_some())
            .count()
    }

    /// `(prefix, service)` pairs, longest prefix first, then by prefix
    pub fn rules(&self) -> Vec<(&str, &str)> {
        let mut rules: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|(prefix, entry)| (prefix.as_str(), entry.service.as_str()))
            .collect();
        rules.sort_by_key(|(prefix, _)| (Reverse(prefix.len()), *prefix));
        rules
    }
}
