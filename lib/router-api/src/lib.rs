//! Prefix Router API types
//!
//! This library defines the types the router controller speaks:
//! - Route: custom resource mapping a URL path prefix to a backend service
//! - Consul config entries: service-router and service-splitter documents
//!   held by the mesh registry

pub mod v1beta1;
pub mod consul;

pub use v1beta1::{Route, RouteSpec};
pub use consul::{ConfigEntry, ConfigEntryKind};
