use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Configuration parameters for the election algorithm.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RaftConfig {
    /// Leader election timing parameters
    #[serde(default)]
    pub election: ElectionConfig,

    /// Fixed heartbeat broadcast period for leaders, in milliseconds.
    /// Must be substantially shorter than the election timeout minimum so
    /// followers keep seeing heartbeats before their timers fire.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_in_ms: u64,

    /// Timeout applied while the engine answers a locally submitted RPC event,
    /// in milliseconds.
    #[serde(default = "default_rpc_handling_timeout")]
    pub rpc_handling_timeout_in_ms: u64,
}

impl Default for RaftConfig {
    fn default() -> Self {
        Self {
            election: ElectionConfig::default(),
            heartbeat_interval_in_ms: default_heartbeat_interval(),
            rpc_handling_timeout_in_ms: default_rpc_handling_timeout(),
        }
    }
}

impl RaftConfig {
    pub fn validate(&self) -> Result<()> {
        self.election.validate()?;

        if self.heartbeat_interval_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "heartbeat_interval_in_ms cannot be 0".into(),
            )));
        }

        if self.heartbeat_interval_in_ms >= self.election.election_timeout_min {
            return Err(Error::Config(ConfigError::Message(format!(
                "heartbeat_interval_in_ms ({}) must be below election_timeout_min ({})",
                self.heartbeat_interval_in_ms, self.election.election_timeout_min
            ))));
        }

        if self.rpc_handling_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "rpc_handling_timeout_in_ms cannot be 0".into(),
            )));
        }

        Ok(())
    }
}

/// Randomized election timeout window.
///
/// Every follower and candidate samples a fresh timeout uniformly from
/// `[election_timeout_min, election_timeout_max)` each time the timer is
/// armed, which keeps simultaneous candidacies (split votes) unlikely.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ElectionConfig {
    /// Lower bound of the election timeout in milliseconds (inclusive)
    #[serde(default = "default_election_timeout_min")]
    pub election_timeout_min: u64,

    /// Upper bound of the election timeout in milliseconds (exclusive)
    #[serde(default = "default_election_timeout_max")]
    pub election_timeout_max: u64,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            election_timeout_min: default_election_timeout_min(),
            election_timeout_max: default_election_timeout_max(),
        }
    }
}

impl ElectionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.election_timeout_min == 0 {
            return Err(Error::Config(ConfigError::Message(
                "election_timeout_min cannot be 0".into(),
            )));
        }

        if self.election_timeout_min >= self.election_timeout_max {
            return Err(Error::Config(ConfigError::Message(format!(
                "election_timeout_min ({}) must be below election_timeout_max ({})",
                self.election_timeout_min, self.election_timeout_max
            ))));
        }

        Ok(())
    }
}

fn default_election_timeout_min() -> u64 {
    500
}
fn default_election_timeout_max() -> u64 {
    1000
}
fn default_heartbeat_interval() -> u64 {
    100
}
fn default_rpc_handling_timeout() -> u64 {
    500
}
