mod api;
pub mod http;
pub use api::*;
pub use http::*;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::NetworkConfig;
use crate::NodeMeta;
use crate::Result;

/// Outcome of a vote-request fan-out: one entry per contacted peer.
/// Transport-level failures (timeout, refused connection) appear as `Err`
/// entries and count as non-responses during vote tallying.
#[derive(Debug)]
pub struct VoteResult {
    pub responses: Vec<(String, Result<VoteResponse>)>,
}

/// Outcome of a heartbeat fan-out, shaped like [`VoteResult`].
#[derive(Debug)]
pub struct HeartbeatResult {
    pub responses: Vec<(String, Result<HeartbeatResponse>)>,
}

/// Outbound RPC boundary towards the rest of the cluster.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends `RequestVote` to every peer in parallel and collects all replies.
    async fn send_vote_requests(
        &self,
        peers: Vec<NodeMeta>,
        request: VoteRequest,
        network: &NetworkConfig,
    ) -> Result<VoteResult>;

    /// Broadcasts a heartbeat to every peer in parallel.
    async fn send_heartbeats(
        &self,
        peers: Vec<NodeMeta>,
        request: HeartbeatRequest,
        network: &NetworkConfig,
    ) -> Result<HeartbeatResult>;

    /// Probes a single peer's status endpoint.
    async fn fetch_status(
        &self,
        peer: &NodeMeta,
        network: &NetworkConfig,
    ) -> Result<NodeStatus>;
}
