use std::collections::HashSet;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use tracing::error;
use tracing::warn;

use super::ElectionCore;
use super::StateUpdate;
use crate::alias::TROF;
use crate::is_majority;
use crate::ElectionError;
use crate::NodeMeta;
use crate::RaftNodeConfig;
use crate::Result;
use crate::Transport;
use crate::TypeConfig;
use crate::VoteRequest;

#[derive(Clone)]
pub struct ElectionHandler<T: TypeConfig> {
    pub(crate) my_id: String,
    _phantom: PhantomData<T>,
}

#[async_trait]
impl<T> ElectionCore<T> for ElectionHandler<T>
where T: TypeConfig
{
    async fn broadcast_vote_requests(
        &self,
        term: u64,
        peers: Vec<NodeMeta>,
        transport: &Arc<TROF<T>>,
        settings: &Arc<RaftNodeConfig>,
    ) -> Result<()> {
        debug!("broadcast_vote_requests...");

        if peers.is_empty() {
            error!("my(id={}) peers is empty.", self.my_id);
            return Err(ElectionError::NoVotingMemberFound {
                candidate_id: self.my_id.clone(),
            }
            .into());
        }

        let request = VoteRequest {
            term,
            candidate_id: self.my_id.clone(),
        };

        let total = peers.len() + 1;
        let vote_result = transport.send_vote_requests(peers, request, &settings.network).await?;

        // Idempotent tally: a responder is counted at most once, however
        // many replies it produced.
        let mut granted: HashSet<String> = HashSet::new();
        for (peer_id, response) in vote_result.responses {
            match response {
                Ok(vote_response) => {
                    if vote_response.granted {
                        debug!("vote granted by {}", peer_id);
                        granted.insert(peer_id);
                    } else if vote_response.responder_term > term {
                        warn!(
                            "Higher term {} found during election phase.",
                            vote_response.responder_term
                        );
                        return Err(ElectionError::HigherTerm(vote_response.responder_term).into());
                    } else {
                        debug!("vote rejected by {}", peer_id);
                    }
                }
                Err(e) => {
                    // Non-response: neither a grant nor a rejection.
                    debug!("no vote response from {}: {}", peer_id, e);
                }
            }
        }

        let succeed = granted.len() + 1; // self vote
        debug!("vote tally for term {}: {}/{}", term, succeed, total);

        if is_majority(succeed, total) {
            debug!("send_vote_requests receives majority.");
            Ok(())
        } else {
            debug!("failed to receive majority votes.");
            Err(ElectionError::QuorumFailure {
                required: total / 2 + 1,
                succeed,
            }
            .into())
        }
    }

    /// Vote-granting rules:
    /// 1. a request with a stale term is rejected outright
    /// 2. a higher term is adopted first, which voids any earlier vote
    /// 3. the vote is granted iff no vote has been cast in the effective
    ///    term, or it was already cast for this same candidate (re-granting
    ///    is idempotent)
    fn evaluate_vote_request(
        &self,
        request: &VoteRequest,
        current_term: u64,
        voted_for: Option<&str>,
    ) -> StateUpdate {
        if request.term < current_term {
            debug!(
                "current_term({}) > request.term({}): rejecting",
                current_term, request.term
            );
            return StateUpdate::none();
        }

        let (term_update, effective_voted_for) = if request.term > current_term {
            (Some(request.term), None)
        } else {
            (None, voted_for)
        };

        let grant = match effective_voted_for {
            None => true,
            Some(candidate) => candidate == request.candidate_id,
        };

        debug!(
            "evaluate_vote_request from {} at term {}: grant={}",
            request.candidate_id, request.term, grant
        );

        StateUpdate {
            new_voted_for: grant.then(|| request.candidate_id.clone()),
            term_update,
        }
    }
}

impl<T> ElectionHandler<T>
where T: TypeConfig
{
    pub fn new(my_id: String) -> Self {
        Self {
            my_id,
            _phantom: PhantomData,
        }
    }
}

impl<T: TypeConfig> Debug for ElectionHandler<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ElectionHandler").field("my_id", &self.my_id).finish()
    }
}
