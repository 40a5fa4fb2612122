//! Consul HTTP client for config entries

use crate::{ConsulConfig, ConsulError};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use router_api::{ConfigEntry, ConfigEntryKind};
use router_core::{MeshRegistry, QueryMeta, QueryOptions};
use std::time::Duration;
use tracing::debug;

const INDEX_HEADER: &str = "X-Consul-Index";
const TOKEN_HEADER: &str = "X-Consul-Token";

/// Connect timeout for every request
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout for reads that do not block
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// ConsulClient talks to the Consul agent's HTTP API
#[derive(Clone, Debug)]
pub struct ConsulClient {
    http: reqwest::Client,
    config: ConsulConfig,
    base_url: String,
}

impl ConsulClient {
    pub fn new(config: ConsulConfig) -> Result<Self, ConsulError> {
        if config.address.is_empty() {
            return Err(ConsulError::InvalidConfiguration("empty address".to_string()));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        let base_url = config.base_url();

        Ok(Self {
            http,
            config,
            base_url,
        })
    }

    pub fn config(&self) -> &ConsulConfig {
        &self.config
    }

    /// Address of the current Raft leader
    pub async fn leader(&self) -> Result<String, ConsulError> {
        let response = self
            .request(Method::GET, "/v1/status/leader")
            .timeout(READ_TIMEOUT)
            .send()
            .await?;
        let leader: String = check_status(response).await?.json().await?;

        if leader.is_empty() {
            return Err(ConsulError::NoLeader);
        }
        Ok(leader)
    }

    /// GET /v1/config/:kind/:name, blocking when a wait index is given
    pub async fn read_entry(
        &self,
        kind: ConfigEntryKind,
        name: &str,
        options: &QueryOptions,
    ) -> Result<(Option<ConfigEntry>, QueryMeta), ConsulError> {
        let mut request = self.request(Method::GET, &format!("/v1/config/{}/{}", kind, name));

        let mut timeout = READ_TIMEOUT;
        if let Some(index) = options.wait_index {
            request = request.query(&[("index", index.to_string())]);
            if let Some(wait) = options.wait_time {
                request = request.query(&[("wait", wait_param(wait))]);
                timeout = blocking_timeout(wait);
            }
        }

        debug!(%kind, %name, index = ?options.wait_index, "Reading config entry");
        let response = request.timeout(timeout).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            let meta = query_meta(response.headers())?;
            return Ok((None, meta));
        }

        let response = check_status(response).await?;
        let meta = query_meta(response.headers())?;
        let entry: ConfigEntry = response.json().await?;
        Ok((Some(entry), meta))
    }

    /// PUT /v1/config with the whole entry
    pub async fn write_entry(&self, entry: &ConfigEntry) -> Result<bool, ConsulError> {
        debug!(kind = ?entry.kind(), name = ?entry.name(), "Writing config entry");
        let response = self
            .request(Method::PUT, "/v1/config")
            .json(entry)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.config.token {
            request = request.header(TOKEN_HEADER, token);
        }
        if let Some(datacenter) = &self.config.datacenter {
            request = request.query(&[("dc", datacenter)]);
        }
        request
    }
}

#[async_trait]
impl MeshRegistry for ConsulClient {
    async fn get_config_entry(
        &self,
        kind: ConfigEntryKind,
        name: &str,
        options: &QueryOptions,
    ) -> router_core::Result<(Option<ConfigEntry>, QueryMeta)> {
        Ok(self.read_entry(kind, name, options).await?)
    }

    async fn set_config_entry(&self, entry: &ConfigEntry) -> router_core::Result<bool> {
        Ok(self.write_entry(entry).await?)
    }
}

async fn check_status(response: Response) -> Result<Response, ConsulError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ConsulError::UnexpectedStatus {
        status: status.as_u16(),
        body: body.trim().to_string(),
    })
}

fn query_meta(headers: &HeaderMap) -> Result<QueryMeta, ConsulError> {
    let value = headers.get(INDEX_HEADER).ok_or(ConsulError::MissingIndex)?;
    let text = value
        .to_str()
        .map_err(|_| ConsulError::InvalidIndex(format!("{:?}", value)))?;
    let last_index = text
        .parse()
        .map_err(|_| ConsulError::InvalidIndex(text.to_string()))?;

    Ok(QueryMeta { last_index })
}

/// Consul duration syntax for the `wait` parameter
fn wait_param(wait: Duration) -> String {
    format!("{}ms", wait.as_millis())
}

// Consul adds up to wait/16 of jitter to a blocking query
fn blocking_timeout(wait: Duration) -> Duration {
    wait + wait / 16 + Duration::from_secs(5)
}
