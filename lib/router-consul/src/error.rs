use router_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsulError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response code: {status} ({body})")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Missing X-Consul-Index header")]
    MissingIndex,

    #[error("Invalid X-Consul-Index header: {0}")]
    InvalidIndex(String),

    #[error("No cluster leader")]
    NoLeader,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<ConsulError> for CoreError {
    fn from(e: ConsulError) -> Self {
        CoreError::Registry(e.to_string())
    }
}
