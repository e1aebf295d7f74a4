mod election_handler;
pub use election_handler::*;


use std::sync::Arc;

use async_trait::async_trait;

use crate::alias::TROF;
use crate::NodeMeta;
use crate::RaftNodeConfig;
use crate::Result;
use crate::TypeConfig;
use crate::VoteRequest;

/// State changes a vote request asks the receiver to apply.
///
/// The vote is granted iff `new_voted_for` is set. Both fields must be
/// persisted before the reply leaves the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateUpdate {
    pub new_voted_for: Option<String>,
    pub term_update: Option<u64>,
}

impl StateUpdate {
    pub fn none() -> Self {
        Self {
            new_voted_for: None,
            term_update: None,
        }
    }

    pub fn grants(&self) -> bool {
        self.new_voted_for.is_some()
    }

    pub fn requires_persist(&self) -> bool {
        self.new_voted_for.is_some() || self.term_update.is_some()
    }
}

#[async_trait]
pub trait ElectionCore<T: TypeConfig>: Send + Sync + 'static {
    /// Fans a vote request out to all peers and tallies the replies.
    ///
    /// Returns `Ok(())` when a majority of the full cluster (self vote
    /// included) granted the request, `ElectionError::HigherTerm` when any
    /// responder reported a newer term, and `ElectionError::QuorumFailure`
    /// otherwise. Duplicate replies from the same peer count once.
    async fn broadcast_vote_requests(
        &self,
        term: u64,
        peers: Vec<NodeMeta>,
        transport: &Arc<TROF<T>>,
        settings: &Arc<RaftNodeConfig>,
    ) -> Result<()>;

    /// Applies the vote-granting rules to an inbound request.
    fn evaluate_vote_request(
        &self,
        request: &VoteRequest,
        current_term: u64,
        voted_for: Option<&str>,
    ) -> StateUpdate;
}
