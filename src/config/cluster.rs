use std::net::SocketAddr;
use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Static metadata of a single cluster member.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NodeMeta {
    /// Unique node identifier, e.g. `"node-1"`
    pub id: String,

    /// HTTP address of the node's RPC endpoint, `host:port`
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClusterConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,

    #[serde(default = "default_listen_addr")]
    pub listen_address: SocketAddr,

    /// Full cluster membership, including this node itself.
    #[serde(default = "default_initial_cluster")]
    pub initial_cluster: Vec<NodeMeta>,

    #[serde(default = "default_db_dir")]
    pub db_root_dir: PathBuf,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}
impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            listen_address: default_listen_addr(),
            initial_cluster: default_initial_cluster(),
            db_root_dir: default_db_dir(),
            log_dir: default_log_dir(),
        }
    }
}

impl ClusterConfig {
    /// Validates cluster configuration consistency
    pub fn validate(&self) -> Result<()> {
        // Validate node identity
        if self.node_id.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "node_id cannot be empty".into(),
            )));
        }

        // Validate cluster membership
        if self.initial_cluster.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "initial_cluster must contain at least one node".into(),
            )));
        }

        // Check node existence in cluster
        let self_in_cluster = self.initial_cluster.iter().any(|n| n.id == self.node_id);
        if !self_in_cluster {
            return Err(Error::Config(ConfigError::Message(format!(
                "Current node {} not found in initial_cluster",
                self.node_id
            ))));
        }

        // Check unique node IDs
        let mut ids = std::collections::HashSet::new();
        for node in &self.initial_cluster {
            if !ids.insert(node.id.as_str()) {
                return Err(Error::Config(ConfigError::Message(format!(
                    "Duplicate node_id {} in initial_cluster",
                    node.id
                ))));
            }
            if node.address.is_empty() {
                return Err(Error::Config(ConfigError::Message(format!(
                    "Node {} has an empty address",
                    node.id
                ))));
            }
        }

        // Validate network configuration
        if self.listen_address.port() == 0 {
            return Err(Error::Config(ConfigError::Message(
                "listen_address must specify a non-zero port".into(),
            )));
        }

        // Validate storage paths
        self.validate_directory(&self.db_root_dir, "db_root_dir")?;
        self.validate_directory(&self.log_dir, "log_dir")?;

        Ok(())
    }

    /// Ensures directory path is valid and writable
    fn validate_directory(
        &self,
        path: &PathBuf,
        name: &str,
    ) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(Error::Config(ConfigError::Message(format!(
                "{} path cannot be empty",
                name
            ))));
        }

        #[cfg(not(test))]
        {
            use std::fs;
            if !path.exists() {
                fs::create_dir_all(path).map_err(|e| {
                    Error::Config(ConfigError::Message(format!(
                        "Failed to create {} directory at {}: {}",
                        name,
                        path.display(),
                        e
                    )))
                })?;
            }

            let test_file = path.join(".permission_test");
            fs::write(&test_file, b"test").map_err(|e| {
                Error::Config(ConfigError::Message(format!(
                    "No write permission in {} directory {}: {}",
                    name,
                    path.display(),
                    e
                )))
            })?;
            fs::remove_file(&test_file).ok();
        }

        Ok(())
    }
}

fn default_node_id() -> String {
    "node-1".to_string()
}
fn default_initial_cluster() -> Vec<NodeMeta> {
    vec![NodeMeta {
        id: default_node_id(),
        address: "127.0.0.1:9081".to_string(),
    }]
}
fn default_listen_addr() -> SocketAddr {
    "127.0.0.1:9081".parse().expect("valid default listen address")
}
fn default_db_dir() -> PathBuf {
    PathBuf::from("/tmp/raft-elect/db")
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("/tmp/raft-elect/logs")
}
