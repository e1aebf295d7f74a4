//! Durable node state.
//!
//! The whole persistent footprint of an election participant is one record:
//! `{node_id, current_term, voted_for, state, is_stopped}`. The record is
//! written before any externally observable effect (vote reply, leadership
//! claim, stop/resume acknowledgement), so a crash can lose liveness but
//! never a promise.

mod sled_adapter;
pub use sled_adapter::*;

#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;

use crate::NodeState;
use crate::Result;

/// The durable record for this node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeRecord {
    pub node_id: String,

    /// Latest term this node has seen. Increases monotonically; never reset
    /// by a restart.
    pub current_term: u64,

    /// Candidate granted this node's vote in `current_term`, if any.
    pub voted_for: Option<String>,

    /// Role at the time of the last save. Restart demotes LEADER/CANDIDATE
    /// back to FOLLOWER; the field is kept for diagnostics.
    pub state: NodeState,

    /// Administrative fault-injection flag. A node restored with
    /// `is_stopped = true` boots directly into DOWN.
    pub is_stopped: bool,
}

impl NodeRecord {
    /// Fresh record for a node booting for the first time.
    pub fn initial(node_id: String) -> Self {
        Self {
            node_id,
            current_term: 0,
            voted_for: None,
            state: NodeState::Follower,
            is_stopped: false,
        }
    }
}

#[cfg_attr(test, automock)]
pub trait StateStorage: Send + Sync + 'static {
    fn load_node_record(&self) -> Result<Option<NodeRecord>>;

    /// Persists the record durably. Returning `Ok` means the record has been
    /// flushed; callers rely on this before replying to RPCs.
    fn save_node_record(
        &self,
        record: &NodeRecord,
    ) -> Result<()>;

    fn flush(&self) -> Result<usize>;
}
