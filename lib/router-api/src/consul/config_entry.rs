use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kinds of config entries the router reads or writes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConfigEntryKind {
    /// Path-based routing rules for a service
    ServiceRouter,
    /// Weighted traffic split for a service
    ServiceSplitter,
}

impl ConfigEntryKind {
    /// Wire name used by the registry's HTTP API
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigEntryKind::ServiceRouter => "service-router",
            ConfigEntryKind::ServiceSplitter => "service-splitter",
        }
    }
}

impl fmt::Display for ConfigEntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A versioned configuration document held by the registry,
/// identified by its kind and name
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Kind")]
pub enum ConfigEntry {
    #[serde(rename = "service-router")]
    ServiceRouter(ServiceRouterConfigEntry),
    #[serde(rename = "service-splitter")]
    ServiceSplitter(ServiceSplitterConfigEntry),
    /// Any other kind (service-defaults, proxy-defaults, ...)
    #[serde(other)]
    Unknown,
}

impl ConfigEntry {
    pub fn kind(&self) -> Option<ConfigEntryKind> {
        match self {
            ConfigEntry::ServiceRouter(_) => Some(ConfigEntryKind::ServiceRouter),
            ConfigEntry::ServiceSplitter(_) => Some(ConfigEntryKind::ServiceSplitter),
            ConfigEntry::Unknown => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            ConfigEntry::ServiceRouter(entry) => Some(&entry.name),
            ConfigEntry::ServiceSplitter(entry) => Some(&entry.name),
            ConfigEntry::Unknown => None,
        }
    }
}

/// service-router config entry
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceRouterConfigEntry {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Rules evaluated in order; the first match wins
    #[serde(default)]
    pub routes: Vec<ServiceRoute>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub create_index: u64,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub modify_index: u64,
}

/// A single routing rule
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceRoute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#match: Option<ServiceRouteMatch>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<ServiceRouteDestination>,
}

impl ServiceRoute {
    /// Rule sending every path under `prefix` to `service`
    pub fn path_prefix(prefix: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            r#match: Some(ServiceRouteMatch {
                http: Some(ServiceRouteHttpMatch {
                    path_prefix: Some(prefix.into()),
                    ..Default::default()
                }),
            }),
            destination: Some(ServiceRouteDestination {
                service: service.into(),
                ..Default::default()
            }),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceRouteMatch {
    #[serde(rename = "HTTP", default, skip_serializing_if = "Option::is_none")]
    pub http: Option<ServiceRouteHttpMatch>,
}

/// HTTP match conditions of a routing rule
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceRouteHttpMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_exact: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_regex: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
}

/// Where matched traffic is sent
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceRouteDestination {
    #[serde(default)]
    pub service: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_subset: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_rewrite: Option<String>,
}

/// service-splitter config entry
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceSplitterConfigEntry {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default)]
    pub splits: Vec<ServiceSplit>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub create_index: u64,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub modify_index: u64,
}

/// Share of traffic sent to one service (or subset)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceSplit {
    /// Percentage of traffic (0-100)
    pub weight: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_subset: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

fn is_zero(index: &u64) -> bool {
    *index == 0
}
