use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::follower_state::FollowerState;
use super::role_state::RaftRoleState;
use super::send_response;
use super::step_down_and_reprocess;
use super::NodeState;
use super::RaftRole;
use super::SharedState;
use crate::ConsensusError;
use crate::ElectionCore;
use crate::ElectionError;
use crate::ElectionTimer;
use crate::Error;
use crate::HeartbeatResponse;
use crate::NodeRecord;
use crate::RaftContext;
use crate::RaftEvent;
use crate::RaftNodeConfig;
use crate::Result;
use crate::StateStorage;
use crate::RoleEvent;
use crate::TypeConfig;
use crate::VoteResponse;

/// CANDIDATE: actively campaigning for leadership.
///
/// Every tick opens a fresh election round: increment the term, vote for
/// self, persist, then fan the vote request out in the background. The
/// randomized timer doubles as the split-vote retry clock.
pub struct CandidateState<T: TypeConfig> {
    pub shared_state: SharedState,

    pub(super) node_config: Arc<RaftNodeConfig>,

    pub(super) timer: ElectionTimer,

    _marker: PhantomData<T>,
}

#[async_trait]
impl<T: TypeConfig> RaftRoleState for CandidateState<T> {
    type T = T;

    fn shared_state(&self) -> &SharedState {
        &self.shared_state
    }

    fn shared_state_mut(&mut self) -> &mut SharedState {
        &mut self.shared_state
    }

    fn node_state(&self) -> NodeState {
        NodeState::Candidate
    }

    fn is_candidate(&self) -> bool {
        true
    }

    fn become_leader(&self) -> Result<RaftRole<T>> {
        info!(
            "[{}<{}>] >>> switch to Leader now.",
            self.node_id(),
            self.current_term(),
        );
        Ok(RaftRole::Leader(self.into()))
    }

    fn become_candidate(&self) -> Result<RaftRole<T>> {
        warn!("I am candidate already");
        Err(crate::StateTransitionError::InvalidTransition.into())
    }

    fn become_follower(&self) -> Result<RaftRole<T>> {
        info!(
            "[{}<{}>] >>> switch to Follower now.",
            self.node_id(),
            self.current_term(),
        );
        Ok(RaftRole::Follower(self.into()))
    }

    fn become_down(&self) -> Result<RaftRole<T>> {
        info!(
            "[{}<{}>] >>> switch to Down now.",
            self.node_id(),
            self.current_term(),
        );
        Ok(RaftRole::Down(self.into()))
    }

    //--- Timer related ---
    fn is_timer_expired(&self) -> bool {
        self.timer.is_expired()
    }
    fn reset_timer(&mut self) {
        self.timer.reset()
    }
    fn next_deadline(&self) -> Instant {
        self.timer.next_deadline()
    }

    /// Opens a new election round.
    ///
    /// The `{term, votedFor}` pair is persisted before any vote request
    /// leaves this node; the fan-out itself runs in a background task so
    /// slow peers never stall the event loop.
    async fn tick(
        &mut self,
        role_tx: &mpsc::UnboundedSender<RoleEvent>,
        ctx: &RaftContext<T>,
    ) -> Result<()> {
        self.timer.reset();

        let my_id = self.node_id().to_string();
        let new_term = self.current_term() + 1;

        let record = NodeRecord {
            node_id: my_id.clone(),
            current_term: new_term,
            voted_for: Some(my_id.clone()),
            state: NodeState::Candidate,
            is_stopped: false,
        };
        ctx.state_storage().save_node_record(&record)?;

        self.update_current_term(new_term);
        self.update_voted_for(Some(my_id.clone()));

        info!("[{}] starting election for term {}", my_id, new_term);

        let handler = ctx.election_handler().clone();
        let transport = ctx.transport().clone();
        let peers = ctx.cluster().peers().to_vec();
        let settings = ctx.settings().clone();
        let role_tx = role_tx.clone();

        tokio::spawn(async move {
            match handler
                .broadcast_vote_requests(new_term, peers, &transport, &settings)
                .await
            {
                Ok(()) => {
                    debug!("majority reached for term {}", new_term);
                    if let Err(e) = role_tx.send(RoleEvent::ElectionWon { term: new_term }) {
                        error!("role_tx.send(RoleEvent::ElectionWon): {:?}", e);
                    }
                }
                Err(Error::Consensus(ConsensusError::Election(ElectionError::HigherTerm(
                    higher_term,
                )))) => {
                    warn!(
                        "higher term {} observed during election for term {}",
                        higher_term, new_term
                    );
                    if let Err(e) = role_tx.send(RoleEvent::StepDown {
                        new_term: Some(higher_term),
                    }) {
                        error!("role_tx.send(RoleEvent::StepDown): {:?}", e);
                    }
                }
                Err(e) => {
                    // Quorum failure or transport trouble: stay candidate and
                    // let the timer retry with a fresh term.
                    warn!("election for term {} failed: {:?}", new_term, e);
                }
            }
        });

        Ok(())
    }

    async fn handle_raft_event(
        &mut self,
        raft_event: RaftEvent,
        _ctx: &RaftContext<T>,
        role_tx: mpsc::UnboundedSender<RoleEvent>,
    ) -> Result<()> {
        match raft_event {
            RaftEvent::VoteRequest(vote_request, sender) => {
                if vote_request.term > self.current_term() {
                    // Term adoption happens on the replay path, where the
                    // follower persists it before any reply leaves the node.
                    step_down_and_reprocess(&role_tx, RaftEvent::VoteRequest(vote_request, sender))?;
                } else {
                    // Equal or lower term: this node already voted for itself.
                    send_response(
                        sender,
                        Ok(VoteResponse {
                            granted: false,
                            responder_term: self.current_term(),
                        }),
                    )?;
                }
            }

            RaftEvent::Heartbeat(heartbeat_request, sender) => {
                if heartbeat_request.term >= self.current_term() {
                    // A legitimate leader exists for this (or a newer) term.
                    step_down_and_reprocess(&role_tx, RaftEvent::Heartbeat(heartbeat_request, sender))?;
                } else {
                    send_response(
                        sender,
                        Ok(HeartbeatResponse {
                            accepted: false,
                            responder_term: self.current_term(),
                        }),
                    )?;
                }
            }

            RaftEvent::StartElection(sender) => {
                info!("[{}] manual election trigger accepted", self.node_id());
                self.timer.fire_now();
                send_response(sender, Ok(()))?;
            }

            RaftEvent::AdminStop(_) | RaftEvent::AdminResume(_) | RaftEvent::QueryStatus(_) => {
                // Handled by the engine loop before role dispatch.
                warn!("administrative event reached the candidate state handler");
            }
        }

        Ok(())
    }
}

impl<T: TypeConfig> From<&FollowerState<T>> for CandidateState<T> {
    fn from(follower_state: &FollowerState<T>) -> Self {
        Self {
            shared_state: follower_state.shared_state.clone(),
            timer: ElectionTimer::new((
                follower_state.node_config.raft.election.election_timeout_min,
                follower_state.node_config.raft.election.election_timeout_max,
            )),
            node_config: follower_state.node_config.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: TypeConfig> Debug for CandidateState<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("CandidateState")
            .field("shared_state", &self.shared_state)
            .finish()
    }
}
