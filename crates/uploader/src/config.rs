//! Tunables for the upload pipeline.
//!
//! Every field has a default, so a partial (or empty) config file is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use zww_oss::{AuthorizerConfig, DEFAULT_METADATA_ENDPOINT};

/// Uploader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploaderConfig {
    /// Metadata endpoint that signs uploads.
    #[serde(default = "default_metadata_endpoint")]
    pub metadata_endpoint: String,

    /// Scheme of destination URLs.
    #[serde(default = "default_destination_scheme")]
    pub destination_scheme: String,

    /// Read size for hashing and streaming (0 = 64 KiB).
    #[serde(default)]
    pub chunk_size: usize,

    /// How long a transfer may take to start sending.
    #[serde(default = "default_stall_timeout_ms")]
    pub stall_timeout_ms: u64,

    #[serde(default = "default_authorization_timeout_ms")]
    pub authorization_timeout_ms: u64,

    /// Pause before retrying a failed authorization request.
    #[serde(default)]
    pub authorization_retry_delay_ms: u64,

    /// Assumed validity of an authorization without an explicit expiry.
    #[serde(default = "default_authorization_validity_secs")]
    pub authorization_validity_secs: u64,

    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

fn default_metadata_endpoint() -> String {
    DEFAULT_METADATA_ENDPOINT.into()
}

fn default_destination_scheme() -> String {
    "https".into()
}

fn default_stall_timeout_ms() -> u64 {
    zww_oss::DEFAULT_STALL_TIMEOUT.as_millis() as u64
}

fn default_authorization_timeout_ms() -> u64 {
    zww_oss::DEFAULT_AUTHORIZATION_TIMEOUT.as_millis() as u64
}

fn default_authorization_validity_secs() -> u64 {
    zww_oss::DEFAULT_AUTHORIZATION_VALIDITY.as_secs()
}

fn default_probe_timeout_ms() -> u64 {
    zww_oss::DEFAULT_PROBE_TIMEOUT.as_millis() as u64
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            metadata_endpoint: default_metadata_endpoint(),
            destination_scheme: default_destination_scheme(),
            chunk_size: 0,
            stall_timeout_ms: default_stall_timeout_ms(),
            authorization_timeout_ms: default_authorization_timeout_ms(),
            authorization_retry_delay_ms: 0,
            authorization_validity_secs: default_authorization_validity_secs(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl UploaderConfig {
    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Effective chunk size.
    pub fn chunk_size(&self) -> usize {
        if self.chunk_size == 0 {
            zww_transfer::DEFAULT_CHUNK_SIZE
        } else {
            self.chunk_size
        }
    }

    pub fn authorizer_config(&self) -> AuthorizerConfig {
        AuthorizerConfig {
            endpoint: self.metadata_endpoint.clone(),
            destination_scheme: self.destination_scheme.clone(),
            request_timeout: Duration::from_millis(self.authorization_timeout_ms),
            retry_delay: Duration::from_millis(self.authorization_retry_delay_ms),
            validity: Duration::from_secs(self.authorization_validity_secs),
        }
    }
}
