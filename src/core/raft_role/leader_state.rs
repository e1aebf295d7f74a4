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
use super::role_state::RaftRoleState;
use super::send_response;
use super::step_down_and_reprocess;
use super::NodeState;
use super::RaftRole;
use super::SharedState;
use crate::ConsensusError;
use crate::HeartbeatRequest;
use crate::HeartbeatResponse;
use crate::HeartbeatTimer;
use crate::RaftContext;
use crate::RaftEvent;
use crate::RaftNodeConfig;
use crate::Result;
use crate::RoleEvent;
use crate::Transport;
use crate::TypeConfig;
use crate::VoteResponse;

/// LEADER: asserts authority with a fixed-period heartbeat broadcast.
///
/// The heartbeat timer's first deadline is immediate, so a fresh leader
/// announces itself before any follower can time out. A heartbeat rejection
/// carrying a newer term demotes the leader at once.
pub struct LeaderState<T: TypeConfig> {
    pub shared_state: SharedState,

    pub(super) node_config: Arc<RaftNodeConfig>,

    pub(super) timer: HeartbeatTimer,

    _marker: PhantomData<T>,
}

#[async_trait]
impl<T: TypeConfig> RaftRoleState for LeaderState<T> {
    type T = T;

    fn shared_state(&self) -> &SharedState {
        &self.shared_state
    }

    fn shared_state_mut(&mut self) -> &mut SharedState {
        &mut self.shared_state
    }

    fn node_state(&self) -> NodeState {
        NodeState::Leader
    }

    fn is_leader(&self) -> bool {
        true
    }

    fn become_leader(&self) -> Result<RaftRole<T>> {
        warn!("I am leader already");
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

    /// Heartbeat interval elapsed: broadcast to every peer in the background
    /// and watch the replies for a newer term.
    async fn tick(
        &mut self,
        role_tx: &mpsc::UnboundedSender<RoleEvent>,
        ctx: &RaftContext<T>,
    ) -> Result<()> {
        self.timer.reset();

        let peers = ctx.cluster().peers().to_vec();
        if peers.is_empty() {
            debug!("single-node cluster, no heartbeats to send");
            return Ok(());
        }

        let my_term = self.current_term();
        let request = HeartbeatRequest {
            term: my_term,
            leader_id: self.node_id().to_string(),
        };

        let transport = ctx.transport().clone();
        let settings = ctx.settings().clone();
        let role_tx = role_tx.clone();

        tokio::spawn(async move {
            match transport.send_heartbeats(peers, request, &settings.network).await {
                Ok(heartbeat_result) => {
                    let mut highest_term = my_term;
                    for (peer_id, response) in heartbeat_result.responses {
                        match response {
                            Ok(r) => {
                                if !r.accepted && r.responder_term > highest_term {
                                    warn!(
                                        "peer {} rejected heartbeat with higher term {}",
                                        peer_id, r.responder_term
                                    );
                                    highest_term = r.responder_term;
                                }
                            }
                            Err(e) => {
                                debug!("no heartbeat response from {}: {}", peer_id, e);
                            }
                        }
                    }

                    if highest_term > my_term {
                        if let Err(e) = role_tx.send(RoleEvent::StepDown {
                            new_term: Some(highest_term),
                        }) {
                            error!("role_tx.send(RoleEvent::StepDown): {:?}", e);
                        }
                    }
                }
                Err(e) => {
                    warn!("heartbeat broadcast failed: {:?}", e);
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
                    // Another leader holds an equal or newer term; yield.
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
                warn!("[{}] manual election trigger rejected: already leader", self.node_id());
                send_response(
                    sender,
                    Err(ConsensusError::RoleViolation {
                        current_role: "LEADER",
                        required_role: "FOLLOWER",
                        context: "an active leader cannot start an election".to_string(),
                    }
                    .into()),
                )?;
            }

            RaftEvent::AdminStop(_) | RaftEvent::AdminResume(_) | RaftEvent::QueryStatus(_) => {
                // Handled by the engine loop before role dispatch.
                warn!("administrative event reached the leader state handler");
            }
        }

        Ok(())
    }
}

impl<T: TypeConfig> From<&CandidateState<T>> for LeaderState<T> {
    fn from(candidate_state: &CandidateState<T>) -> Self {
        Self {
            shared_state: candidate_state.shared_state.clone(),
            // First deadline is now: heartbeat immediately after winning.
            timer: HeartbeatTimer::new(candidate_state.node_config.raft.heartbeat_interval_in_ms),
            node_config: candidate_state.node_config.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: TypeConfig> Debug for LeaderState<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("LeaderState")
            .field("shared_state", &self.shared_state)
            .finish()
    }
}
