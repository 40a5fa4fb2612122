//! Startup checks against the cluster and the registry

use anyhow::{anyhow, bail, Context, Result};
use kube::api::ListParams;
use kube::{Api, Client};
use router_api::Route;
use router_consul::ConsulClient;
use semver::{Version, VersionReq};
use tracing::info;

/// Oldest Kubernetes release the controller supports
const KUBERNETES_VERSION_CONSTRAINT: &str = "^1.11.0";

/// The Route CRD must be installed
pub async fn verify_crds(client: &Client, namespace: Option<&str>) -> Result<()> {
    let routes: Api<Route> = match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };

    routes
        .list(&ListParams::default().limit(1))
        .await
        .context("Route CRD is not registered")?;

    info!("Route CRD is registered");
    Ok(())
}

pub async fn verify_kubernetes_version(client: &Client) -> Result<()> {
    let info = client
        .apiserver_version()
        .await
        .context("Error calling Kubernetes API")?;

    let version = check_kubernetes_version(&info.git_version)?;
    info!("Connected to Kubernetes API {}", version);
    Ok(())
}

pub async fn verify_consul(consul: &ConsulClient) -> Result<()> {
    let leader = consul
        .leader()
        .await
        .with_context(|| format!("Error calling Consul API at {}", consul.config().base_url()))?;

    info!(%leader, "Connected to Consul");
    Ok(())
}

/// Parse a server git version ("v1.12.6-eks-d69f1b") and check the constraint.
///
/// Pre-release and build suffixes from managed distributions are ignored.
pub fn check_kubernetes_version(git_version: &str) -> Result<Version> {
    let version = Version::parse(git_version.trim_start_matches('v')).map_err(|e| {
        anyhow!(
            "Error parsing kubernetes version {:?} as a semantic version: {}",
            git_version,
            e
        )
    })?;
    let release = Version::new(version.major, version.minor, version.patch);

    let constraint = VersionReq::parse(KUBERNETES_VERSION_CONSTRAINT)?;
    if !constraint.matches(&release) {
        bail!(
            "Unsupported version of kubernetes detected. Expected {}, got {}",
            KUBERNETES_VERSION_CONSTRAINT,
            git_version
        );
    }

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_versions() {
        assert!(check_kubernetes_version("v1.31.0").is_ok());
        assert!(check_kubernetes_version("v1.11.0").is_ok());
        assert!(check_kubernetes_version("v1.12.6-eks-d69f1b").is_ok());
        assert!(check_kubernetes_version("v1.28.3+k3s1").is_ok());
    }

    #[test]
    fn test_unsupported_versions() {
        assert!(check_kubernetes_version("v1.10.13").is_err());
        assert!(check_kubernetes_version("v2.0.0").is_err());
    }

    #[test]
    fn test_unparseable_version() {
        assert!(check_kubernetes_version("v1.28").is_err());
        assert!(check_kubernetes_version("").is_err());
    }
}
