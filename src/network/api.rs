//! Wire types for the HTTP RPC surface.
//!
//! All bodies are JSON with camelCase field names, shared verbatim by the
//! server filters and the outbound client.

use serde::Deserialize;
use serde::Serialize;

use crate::NodeState;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    /// Candidate's term
    pub term: u64,
    /// Candidate requesting the vote
    pub candidate_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub granted: bool,
    /// Responder's current term, so a stale candidate can self-correct
    pub responder_term: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    /// Leader's term
    pub term: u64,
    pub leader_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatResponse {
    pub accepted: bool,
    pub responder_term: u64,
}

/// Diagnostic snapshot served by `GET /raft/status` and aggregated by the
/// cluster-status fan-out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    pub node_id: String,
    pub state: NodeState,
    pub current_term: u64,
    pub voted_for: Option<String>,
    pub is_stopped: bool,
}

impl NodeStatus {
    /// Entry synthesized for a peer that did not answer its status probe.
    pub fn unreachable(node_id: String) -> Self {
        Self {
            node_id,
            state: NodeState::Down,
            current_term: 0,
            voted_for: None,
            is_stopped: true,
        }
    }
}
