//! Command-line flags for the router controller

use clap::{Parser, ValueEnum};
use router_consul::ConsulConfig;
use router_core::{ControllerConfig, WatcherConfig};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Parser, Debug)]
#[command(name = "router-controller", about = "Syncs Route resources into the Consul service router")]
pub struct Cli {
    /// Name of the service-router config entry managed by this controller
    #[arg(long, default_value = "prefix-router")]
    pub service_name: String,

    /// Namespace to watch for Routes (all namespaces when unset)
    #[arg(long)]
    pub namespace: Option<String>,

    /// Port for the /healthz and /metrics endpoint
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Seconds to wait for the HTTP server to drain on shutdown
    #[arg(long, default_value_t = 5)]
    pub shutdown_timeout: u64,

    /// Log level: trace, debug, info, warn, error (RUST_LOG takes precedence)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log encoding
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// Consul HTTP address, e.g. 127.0.0.1:8500 or https://consul:8501
    #[arg(long, env = "CONSUL_HTTP_ADDR")]
    pub consul_addr: Option<String>,

    /// Consul ACL token
    #[arg(long, env = "CONSUL_HTTP_TOKEN", hide_env_values = true)]
    pub consul_token: Option<String>,

    /// Consul datacenter
    #[arg(long)]
    pub consul_datacenter: Option<String>,

    /// Maximum seconds a config entry long poll may block
    #[arg(long, default_value_t = 60)]
    pub consul_wait: u64,

    /// Skip CRD, Kubernetes version and Consul checks at startup
    #[arg(long)]
    pub skip_verify: bool,

    /// Print the Route CRD manifest and exit
    #[arg(long)]
    pub print_crd: bool,
}

impl Cli {
    pub fn consul_config(&self) -> ConsulConfig {
        let mut config = ConsulConfig::from_env();
        if let Some(address) = &self.consul_addr {
            config = config.with_address(address);
        }
        if let Some(token) = &self.consul_token {
            config.token = Some(token.clone());
        }
        if let Some(datacenter) = &self.consul_datacenter {
            config.datacenter = Some(datacenter.clone());
        }
        config
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            service_name: self.service_name.clone(),
            watcher: WatcherConfig {
                wait_time: Duration::from_secs(self.consul_wait),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        ([0, 0, 0, 0], self.port).into()
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}
