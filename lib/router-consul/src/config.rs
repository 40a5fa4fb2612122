//! Consul client configuration

use std::env;

const DEFAULT_ADDRESS: &str = "127.0.0.1:8500";

/// Where and how to reach the Consul HTTP API
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsulConfig {
    /// host:port of the agent
    pub address: String,
    /// "http" or "https"
    pub scheme: String,
    /// ACL token sent as X-Consul-Token
    pub token: Option<String>,
    /// Datacenter to query (agent's own when unset)
    pub datacenter: Option<String>,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            scheme: "http".to_string(),
            token: None,
            datacenter: None,
        }
    }
}

impl ConsulConfig {
    /// Defaults overridden by CONSUL_HTTP_ADDR, CONSUL_HTTP_TOKEN and CONSUL_HTTP_SSL
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(address) = lookup("CONSUL_HTTP_ADDR").filter(|a| !a.is_empty()) {
            config = config.with_address(&address);
        }
        if let Some(token) = lookup("CONSUL_HTTP_TOKEN").filter(|t| !t.is_empty()) {
            config.token = Some(token);
        }
        if let Some(ssl) = lookup("CONSUL_HTTP_SSL") {
            if matches!(ssl.to_ascii_lowercase().as_str(), "1" | "true") {
                config.scheme = "https".to_string();
            }
        }

        config
    }

    /// Set the address; a scheme prefix ("https://...") also sets the scheme
    pub fn with_address(mut self, address: &str) -> Self {
        match address.split_once("://") {
            Some((scheme, rest)) => {
                self.scheme = scheme.to_string();
                self.address = rest.trim_end_matches('/').to_string();
            }
            None => self.address = address.trim_end_matches('/').to_string(),
        }
        self
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ConsulConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ConsulConfig::default());
        assert_eq!(config.base_url(), "http://127.0.0.1:8500");
    }

    #[test]
    fn test_env_overrides() {
        let config = ConsulConfig::from_lookup(lookup(&[
            ("CONSUL_HTTP_ADDR", "consul.service:8500"),
            ("CONSUL_HTTP_TOKEN", "secret"),
            ("CONSUL_HTTP_SSL", "true"),
        ]));

        assert_eq!(config.base_url(), "https://consul.service:8500");
        assert_eq!(config.token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_address_with_scheme() {
        let config = ConsulConfig::default().with_address("https://10.0.0.5:8501/");
        assert_eq!(config.scheme, "https");
        assert_eq!(config.address, "10.0.0.5:8501");
    }
}
