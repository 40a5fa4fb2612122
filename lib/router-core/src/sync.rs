//! Registry sync: route table -> service-router document -> one write

use crate::{CoreError, MeshRegistry, Result, RouteTable};
use router_api::consul::{ServiceRoute, ServiceRouterConfigEntry};
use router_api::ConfigEntry;
use tracing::{debug, error};

/// Build the complete routing document for the current table
pub fn routing_document(router_name: &str, table: &RouteTable) -> ConfigEntry {
    let routes = table
        .rules()
        .into_iter()
        .map(|(prefix, service)| ServiceRoute::path_prefix(prefix, service))
        .collect();

    ConfigEntry::ServiceRouter(ServiceRouterConfigEntry {
        name: router_name.to_string(),
        routes,
        ..Default::default()
    })
}

/// Replace the routing document in the registry with the table's content.
///
/// Always writes the whole document, so repeating it with an unchanged
/// table converges to the same registry state.
pub async fn sync(registry: &dyn MeshRegistry, router_name: &str, table: &RouteTable) -> Result<()> {
    let document = routing_document(router_name, table);

    match registry.set_config_entry(&document).await {
        Ok(true) => {
            debug!(router = %router_name, routes = table.len(), "Registry routes updated");
            Ok(())
        }
        Ok(false) => {
            error!(router = %router_name, "Failed to reconfigure registry: write was not applied");
            Err(CoreError::SyncRejected(router_name.to_string()))
        }
        Err(e) => {
            error!(router = %router_name, "Failed to reconfigure registry: {}", e);
            Err(e)
        }
    }
}
