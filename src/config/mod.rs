//! Configuration management for the election node.
//!
//! Provides hierarchical configuration loading from multiple sources with priority:
//! 1. Default values (hardcoded)
//! 2. Node config file
//! 3. `CONFIG_PATH` override file
//! 4. Environment variables (highest priority)

mod cluster;
mod network;
mod raft;
pub use cluster::*;
pub use network::*;
pub use raft::*;

#[cfg(test)]
mod config_test;

//---
use std::env;
use std::path::Path;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RaftNodeConfig {
    /// Cluster topology and node identity
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Core election algorithm parameters
    #[serde(default)]
    pub raft: RaftConfig,

    /// Peer communication parameters
    #[serde(default)]
    pub network: NetworkConfig,
}

impl RaftNodeConfig {
    /// Load configuration from multiple sources with priority:
    /// 1. Node config file (`config/node.toml` unless overridden)
    /// 2. `CONFIG_PATH` environment override file
    /// 3. Environment variables (`RAFT__` prefix, `__` separator)
    ///
    /// # Arguments
    /// * `node_path` - Optional path to a node-specific configuration file
    pub fn load(node_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        match node_path {
            Some(p) => {
                builder = builder.add_source(File::from(Path::new(p)).required(true));
            }
            None => {
                builder = builder.add_source(File::with_name("config/node").required(false));
            }
        }

        if let Ok(path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::from(Path::new(&path)).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("RAFT")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings: RaftNodeConfig = builder.build()?.try_deserialize()?;
        settings.validate()?;

        Ok(settings)
    }

    /// Validates every configuration section.
    pub fn validate(&self) -> Result<()> {
        self.cluster.validate()?;
        self.raft.validate()?;
        self.network.validate()?;

        Ok(())
    }
}
