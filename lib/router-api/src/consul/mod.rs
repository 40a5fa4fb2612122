//! Config entry types from the Consul mesh registry

pub mod config_entry;

pub use config_entry::{
    ConfigEntry, ConfigEntryKind, ServiceRoute, ServiceRouteDestination, ServiceRouteHttpMatch,
    ServiceRouteMatch, ServiceRouterConfigEntry, ServiceSplit, ServiceSplitterConfigEntry,
};
