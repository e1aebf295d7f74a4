use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::candidate_state::CandidateState;
use super::follower_state::FollowerState;
use super::leader_state::LeaderState;
use super::role_state::RaftRoleState;
use super::send_response;
use super::NodeState;
use super::RaftRole;
use super::SharedState;
use crate::constants::DOWN_PARK_INTERVAL_IN_MS;
use crate::NodeRecord;
use crate::RaftContext;
use crate::RaftEvent;
use crate::RaftNodeConfig;
use crate::Result;
use crate::RoleEvent;
use crate::SystemError;
use crate::TypeConfig;

/// DOWN: administratively stopped.
///
/// The node keeps serving its admin and status endpoints but refuses every
/// protocol RPC, never times out, and never campaigns. Only a resume (or a
/// restart with `is_stopped = false`) brings it back as FOLLOWER.
pub struct DownState<T: TypeConfig> {
    pub shared_state: SharedState,

    pub(super) node_config: Arc<RaftNodeConfig>,

    /// Far-future deadline that keeps the event loop's sleep armed without
    /// ever driving a transition.
    parked_until: Instant,

    _marker: PhantomData<T>,
}

#[async_trait]
impl<T: TypeConfig> RaftRoleState for DownState<T> {
    type T = T;

    fn shared_state(&self) -> &SharedState {
        &self.shared_state
    }

    fn shared_state_mut(&mut self) -> &mut SharedState {
        &mut self.shared_state
    }

    fn node_state(&self) -> NodeState {
        NodeState::Down
    }

    fn is_down(&self) -> bool {
        true
    }

    fn become_follower(&self) -> Result<RaftRole<T>> {
        info!(
            "[{}<{}>] >>> switch to Follower now.",
            self.node_id(),
            self.current_term(),
        );
        Ok(RaftRole::Follower(self.into()))
    }

    //--- Timer related ---
    fn is_timer_expired(&self) -> bool {
        self.parked_until <= Instant::now()
    }
    fn reset_timer(&mut self) {
        self.parked_until = Instant::now() + Duration::from_millis(DOWN_PARK_INTERVAL_IN_MS);
    }
    fn next_deadline(&self) -> Instant {
        self.parked_until
    }

    /// A stopped node never acts on timeouts; just re-arm the parked sleep.
    async fn tick(
        &mut self,
        _role_tx: &mpsc::UnboundedSender<RoleEvent>,
        _ctx: &RaftContext<T>,
    ) -> Result<()> {
        debug!("[{}] parked while stopped", self.node_id());
        self.reset_timer();
        Ok(())
    }

    async fn handle_raft_event(
        &mut self,
        raft_event: RaftEvent,
        _ctx: &RaftContext<T>,
        _role_tx: mpsc::UnboundedSender<RoleEvent>,
    ) -> Result<()> {
        match raft_event {
            RaftEvent::VoteRequest(_, sender) => {
                send_response(sender, Err(SystemError::NodeStopped.into()))?;
            }
            RaftEvent::Heartbeat(_, sender) => {
                send_response(sender, Err(SystemError::NodeStopped.into()))?;
            }
            RaftEvent::StartElection(sender) => {
                send_response(sender, Err(SystemError::NodeStopped.into()))?;
            }
            RaftEvent::AdminStop(_) | RaftEvent::AdminResume(_) | RaftEvent::QueryStatus(_) => {
                // Handled by the engine loop before role dispatch.
                warn!("administrative event reached the down state handler");
            }
        }

        Ok(())
    }
}

impl<T: TypeConfig> DownState<T> {
    /// Boot path for a node whose record was saved with `is_stopped = true`.
    pub fn new(
        node_id: String,
        node_config: Arc<RaftNodeConfig>,
        record: &NodeRecord,
    ) -> Self {
        Self {
            shared_state: SharedState::new(node_id, record),
            parked_until: Instant::now() + Duration::from_millis(DOWN_PARK_INTERVAL_IN_MS),
            node_config,
            _marker: PhantomData,
        }
    }
}

impl<T: TypeConfig> From<&FollowerState<T>> for DownState<T> {
    fn from(follower_state: &FollowerState<T>) -> Self {
        Self {
            shared_state: follower_state.shared_state.clone(),
            parked_until: Instant::now() + Duration::from_millis(DOWN_PARK_INTERVAL_IN_MS),
            node_config: follower_state.node_config.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: TypeConfig> From<&CandidateState<T>> for DownState<T> {
    fn from(candidate_state: &CandidateState<T>) -> Self {
        Self {
            shared_state: candidate_state.shared_state.clone(),
            parked_until: Instant::now() + Duration::from_millis(DOWN_PARK_INTERVAL_IN_MS),
            node_config: candidate_state.node_config.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: TypeConfig> From<&LeaderState<T>> for DownState<T> {
    fn from(leader_state: &LeaderState<T>) -> Self {
        Self {
            shared_state: leader_state.shared_state.clone(),
            parked_until: Instant::now() + Duration::from_millis(DOWN_PARK_INTERVAL_IN_MS),
            node_config: leader_state.node_config.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: TypeConfig> Debug for DownState<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("DownState")
            .field("shared_state", &self.shared_state)
            .finish()
    }
}
