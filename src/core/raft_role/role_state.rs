use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::error;
use tracing::warn;

use super::NodeState;
use super::RaftRole;
use super::SharedState;
use crate::RaftContext;
use crate::RaftEvent;
use crate::Result;
use crate::RoleEvent;
use crate::StateTransitionError;
use crate::TypeConfig;

/// Behavior shared by all role states.
///
/// A role state owns only its own logic; persistence and networking go
/// through the [`RaftContext`] handles.
#[async_trait]
pub trait RaftRoleState: Send + Sync + 'static {
    type T: TypeConfig;

    //--- For sharing state behaviors
    fn shared_state(&self) -> &SharedState;
    fn shared_state_mut(&mut self) -> &mut SharedState;

    fn node_id(&self) -> &str {
        &self.shared_state().node_id
    }

    fn node_state(&self) -> NodeState;

    fn is_follower(&self) -> bool {
        false
    }
    fn is_candidate(&self) -> bool {
        false
    }
    fn is_leader(&self) -> bool {
        false
    }
    fn is_down(&self) -> bool {
        false
    }

    fn become_leader(&self) -> Result<RaftRole<Self::T>> {
        error!("become_leader: invalid transition from {}", self.node_state());
        Err(StateTransitionError::InvalidTransition.into())
    }
    fn become_candidate(&self) -> Result<RaftRole<Self::T>> {
        error!("become_candidate: invalid transition from {}", self.node_state());
        Err(StateTransitionError::InvalidTransition.into())
    }
    fn become_follower(&self) -> Result<RaftRole<Self::T>> {
        error!("become_follower: invalid transition from {}", self.node_state());
        Err(StateTransitionError::InvalidTransition.into())
    }
    fn become_down(&self) -> Result<RaftRole<Self::T>> {
        warn!("become_down: invalid transition from {}", self.node_state());
        Err(StateTransitionError::InvalidTransition.into())
    }

    //--- Shared States
    fn current_term(&self) -> u64 {
        self.shared_state().current_term()
    }
    fn update_current_term(
        &mut self,
        term: u64,
    ) {
        self.shared_state_mut().update_current_term(term)
    }

    fn voted_for(&self) -> Option<String> {
        self.shared_state().voted_for().map(str::to_string)
    }
    fn update_voted_for(
        &mut self,
        voted_for: Option<String>,
    ) {
        self.shared_state_mut().update_voted_for(voted_for)
    }

    //--- Timer related ---
    fn next_deadline(&self) -> Instant;
    fn is_timer_expired(&self) -> bool;

    fn reset_timer(&mut self);

    /// Reacts to this role's timer firing: followers start a candidacy,
    /// candidates open a new election round, leaders broadcast heartbeats,
    /// stopped nodes do nothing.
    async fn tick(
        &mut self,
        role_tx: &mpsc::UnboundedSender<RoleEvent>,
        ctx: &RaftContext<Self::T>,
    ) -> Result<()>;

    async fn handle_raft_event(
        &mut self,
        raft_event: RaftEvent,
        ctx: &RaftContext<Self::T>,
        role_tx: mpsc::UnboundedSender<RoleEvent>,
    ) -> Result<()>;
}
