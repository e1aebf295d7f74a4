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

use super::candidate_state::CandidateState;
use super::down_state::DownState;
use super::leader_state::LeaderState;
use super::role_state::RaftRoleState;
use super::send_response;
use super::NodeState;
use super::RaftRole;
use super::SharedState;
use crate::ElectionCore;
use crate::ElectionTimer;
use crate::HeartbeatResponse;
use crate::NetworkError;
use crate::NodeRecord;
use crate::RaftContext;
use crate::RaftEvent;
use crate::RaftNodeConfig;
use crate::Result;
use crate::RoleEvent;
use crate::StateStorage;
use crate::TypeConfig;
use crate::VoteResponse;

/// FOLLOWER: the passive role.
///
/// Answers vote requests and heartbeats, and promotes itself to CANDIDATE
/// when the election timer fires without leader contact.
pub struct FollowerState<T: TypeConfig> {
    pub shared_state: SharedState,

    pub(super) node_config: Arc<RaftNodeConfig>,

    /// Leader liveness detector. Every accepted heartbeat and every granted
    /// vote re-arms it.
    pub(super) timer: ElectionTimer,

    _marker: PhantomData<T>,
}

#[async_trait]
impl<T: TypeConfig> RaftRoleState for FollowerState<T> {
    type T = T;

    fn shared_state(&self) -> &SharedState {
        &self.shared_state
    }

    fn shared_state_mut(&mut self) -> &mut SharedState {
        &mut self.shared_state
    }

    fn node_state(&self) -> NodeState {
        NodeState::Follower
    }

    fn is_follower(&self) -> bool {
        true
    }

    fn become_candidate(&self) -> Result<RaftRole<T>> {
        info!(
            "[{}<{}>] >>> switch to Candidate now.",
            self.node_id(),
            self.current_term(),
        );
        Ok(RaftRole::Candidate(self.into()))
    }

    fn become_follower(&self) -> Result<RaftRole<T>> {
        warn!("I am follower already");
        Err(crate::StateTransitionError::InvalidTransition.into())
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

    /// Election timeout: no leader contact inside the randomized window, so
    /// step up as candidate.
    async fn tick(
        &mut self,
        role_tx: &mpsc::UnboundedSender<RoleEvent>,
        _ctx: &RaftContext<T>,
    ) -> Result<()> {
        debug!("reset timer");
        self.timer.reset();

        debug!("follower::start_election...");

        role_tx.send(RoleEvent::BecomeCandidate).map_err(|e| {
            let error_str = format!("{e:?}");
            error!("Failed to send: {}", error_str);
            NetworkError::SignalSendFailed(error_str)
        })?;

        Ok(())
    }

    async fn handle_raft_event(
        &mut self,
        raft_event: RaftEvent,
        ctx: &RaftContext<T>,
        _role_tx: mpsc::UnboundedSender<RoleEvent>,
    ) -> Result<()> {
        match raft_event {
            RaftEvent::VoteRequest(vote_request, sender) => {
                let my_term = self.current_term();
                let voted_for = self.voted_for();
                let state_update = ctx.election_handler().evaluate_vote_request(
                    &vote_request,
                    my_term,
                    voted_for.as_deref(),
                );

                if state_update.requires_persist() {
                    let mut hard_state = self.shared_state().hard_state.clone();
                    if let Some(new_term) = state_update.term_update {
                        hard_state.current_term = new_term;
                        hard_state.voted_for = None;
                    }
                    if let Some(candidate_id) = &state_update.new_voted_for {
                        hard_state.voted_for = Some(candidate_id.clone());
                    }

                    let record = NodeRecord {
                        node_id: self.node_id().to_string(),
                        current_term: hard_state.current_term,
                        voted_for: hard_state.voted_for.clone(),
                        state: NodeState::Follower,
                        is_stopped: false,
                    };

                    // The grant is a durable promise: it must hit disk before
                    // the reply leaves this node.
                    if let Err(e) = ctx.state_storage().save_node_record(&record) {
                        error!("save_node_record before vote reply: {:?}", e);
                        return send_response(sender, Err(e));
                    }

                    self.shared_state_mut().hard_state = hard_state;
                }

                let granted = state_update.grants();
                if granted {
                    // Granting a vote counts as hearing from a viable
                    // candidate, so the election window restarts.
                    self.timer.reset();
                }

                let response = VoteResponse {
                    granted,
                    responder_term: self.current_term(),
                };
                debug!(
                    "Response candidate {} with response: {:?}",
                    vote_request.candidate_id, response
                );
                send_response(sender, Ok(response))?;
            }

            RaftEvent::Heartbeat(heartbeat_request, sender) => {
                let my_term = self.current_term();

                if heartbeat_request.term < my_term {
                    debug!(
                        "stale heartbeat from {} (term {} < {})",
                        heartbeat_request.leader_id, heartbeat_request.term, my_term
                    );
                    return send_response(
                        sender,
                        Ok(HeartbeatResponse {
                            accepted: false,
                            responder_term: my_term,
                        }),
                    );
                }

                if heartbeat_request.term > my_term {
                    let record = NodeRecord {
                        node_id: self.node_id().to_string(),
                        current_term: heartbeat_request.term,
                        voted_for: None,
                        state: NodeState::Follower,
                        is_stopped: false,
                    };
                    if let Err(e) = ctx.state_storage().save_node_record(&record) {
                        error!("save_node_record before heartbeat reply: {:?}", e);
                        return send_response(sender, Err(e));
                    }
                    self.update_current_term(heartbeat_request.term);
                }

                self.timer.reset();

                send_response(
                    sender,
                    Ok(HeartbeatResponse {
                        accepted: true,
                        responder_term: self.current_term(),
                    }),
                )?;
            }

            RaftEvent::StartElection(sender) => {
                info!("[{}] manual election trigger accepted", self.node_id());
                self.timer.fire_now();
                send_response(sender, Ok(()))?;
            }

            RaftEvent::AdminStop(_) | RaftEvent::AdminResume(_) | RaftEvent::QueryStatus(_) => {
                // Handled by the engine loop before role dispatch.
                warn!("administrative event reached the follower state handler");
            }
        }

        Ok(())
    }
}

impl<T: TypeConfig> FollowerState<T> {
    pub fn new(
        node_id: String,
        node_config: Arc<RaftNodeConfig>,
        record: &NodeRecord,
    ) -> Self {
        Self {
            shared_state: SharedState::new(node_id, record),
            timer: ElectionTimer::new((
                node_config.raft.election.election_timeout_min,
                node_config.raft.election.election_timeout_max,
            )),
            node_config,
            _marker: PhantomData,
        }
    }
}

impl<T: TypeConfig> From<&CandidateState<T>> for FollowerState<T> {
    fn from(candidate_state: &CandidateState<T>) -> Self {
        Self {
            shared_state: candidate_state.shared_state.clone(),
            timer: ElectionTimer::new((
                candidate_state.node_config.raft.election.election_timeout_min,
                candidate_state.node_config.raft.election.election_timeout_max,
            )),
            node_config: candidate_state.node_config.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: TypeConfig> From<&LeaderState<T>> for FollowerState<T> {
    fn from(leader_state: &LeaderState<T>) -> Self {
        Self {
            shared_state: leader_state.shared_state.clone(),
            timer: ElectionTimer::new((
                leader_state.node_config.raft.election.election_timeout_min,
                leader_state.node_config.raft.election.election_timeout_max,
            )),
            node_config: leader_state.node_config.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: TypeConfig> From<&DownState<T>> for FollowerState<T> {
    fn from(down_state: &DownState<T>) -> Self {
        Self {
            shared_state: down_state.shared_state.clone(),
            timer: ElectionTimer::new((
                down_state.node_config.raft.election.election_timeout_min,
                down_state.node_config.raft.election.election_timeout_max,
            )),
            node_config: down_state.node_config.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: TypeConfig> Debug for FollowerState<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("FollowerState")
            .field("shared_state", &self.shared_state)
            .finish()
    }
}
