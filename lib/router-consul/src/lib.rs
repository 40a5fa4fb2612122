//! Consul integration: the mesh registry behind the route controller
pub mod client;
pub mod config;
pub mod error;

pub use client::ConsulClient;
pub use config::ConsulConfig;
pub use error::ConsulError;
