use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Route sends every request whose path starts with `prefix`
/// to the backend service named by `service`.
///
/// The prefix is the identity of a route: two Routes in the watched
/// scope must never claim the same prefix.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "prefixrouter.io",
    version = "v1beta1",
    kind = "Route",
    plural = "routes",
    namespaced,
    derive = "Default",
    printcolumn = r#"{"name":"Prefix","type":"string","jsonPath":".spec.prefix"}"#,
    printcolumn = r#"{"name":"Service","type":"string","jsonPath":".spec.service"}"#,
)]
pub struct RouteSpec {
    /// HTTP path prefix to match (e.g., "/api")
    pub prefix: String,

    /// Name of the mesh service receiving matched traffic
    pub service: String,
}

impl Route {
    /// Path prefix claimed by this route
    pub fn prefix(&self) -> &str {
        &self.spec.prefix
    }

    /// Backend service this route points to
    pub fn service(&self) -> &str {
        &self.spec.service
    }
}
