//! Mesh registry seam used by the watchers and the registry sync

use crate::Result;
use async_trait::async_trait;
use router_api::{ConfigEntry, ConfigEntryKind};
use std::time::Duration;

/// Options for reading a config entry
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Block until the registry index moves past this value
    pub wait_index: Option<u64>,
    /// Upper bound on how long a blocking read may stall
    pub wait_time: Option<Duration>,
}

impl QueryOptions {
    /// Blocking query waiting for a change after `index`
    pub fn blocking(index: u64, wait_time: Duration) -> Self {
        Self {
            wait_index: Some(index),
            wait_time: Some(wait_time),
        }
    }
}

/// Metadata returned alongside a read
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryMeta {
    /// Registry version index at the time of the response
    pub last_index: u64,
}

/// Config-entry store of the service mesh
///
/// A read of an entry that does not exist yields `Ok((None, meta))`.
/// Blocking reads are cancelled by dropping the returned future.
#[async_trait]
pub trait MeshRegistry: Send + Sync {
    /// Read one config entry, optionally blocking until the index advances
    async fn get_config_entry(
        &self,
        kind: ConfigEntryKind,
        name: &str,
        options: &QueryOptions,
    ) -> Result<(Option<ConfigEntry>, QueryMeta)>;

    /// Replace a whole config entry; returns whether the registry applied it
    async fn set_config_entry(&self, entry: &ConfigEntry) -> Result<bool>;
}
