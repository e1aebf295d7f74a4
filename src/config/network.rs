use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// HTTP client parameters for peer-to-peer RPCs.
///
/// Election traffic is low bandwidth but latency sensitive: a vote request
/// that has not been answered within the request timeout counts as a
/// non-response, never as a retry.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NetworkConfig {
    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_in_ms: u64,

    /// Per-request completion timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_ms: u64,

    /// Timeout for peer status probes (`GET /raft/status` fan-out) in milliseconds
    #[serde(default = "default_status_probe_timeout")]
    pub status_probe_timeout_in_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_in_ms: default_connect_timeout(),
            request_timeout_in_ms: default_request_timeout(),
            status_probe_timeout_in_ms: default_status_probe_timeout(),
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "connect_timeout_in_ms must be > 0".into(),
            )));
        }

        if self.request_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "request_timeout_in_ms must be > 0".into(),
            )));
        }

        if self.status_probe_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "status_probe_timeout_in_ms must be > 0".into(),
            )));
        }

        Ok(())
    }
}

fn default_connect_timeout() -> u64 {
    50
}
fn default_request_timeout() -> u64 {
    100
}
fn default_status_probe_timeout() -> u64 {
    300
}
