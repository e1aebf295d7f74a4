pub mod candidate_state;
pub mod down_state;
pub mod follower_state;
pub mod leader_state;
pub mod role_state;

#[cfg(test)]
mod follower_state_test;

use std::fmt::Debug;

use candidate_state::CandidateState;
use down_state::DownState;
use follower_state::FollowerState;
use leader_state::LeaderState;
use role_state::RaftRoleState;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::error;
use tracing::trace;

use super::RaftContext;
use super::RaftEvent;
use super::RoleEvent;
use crate::Error;
use crate::NetworkError;
use crate::NodeRecord;
use crate::Result;
use crate::TypeConfig;

/// The four externally visible roles of an election participant.
///
/// Serialized in uppercase on the wire (`"FOLLOWER"`, `"CANDIDATE"`,
/// `"LEADER"`, `"DOWN"`) and in the durable node record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeState {
    Follower,
    Candidate,
    Leader,
    Down,
}

impl NodeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeState::Follower => "FOLLOWER",
            NodeState::Candidate => "CANDIDATE",
            NodeState::Leader => "LEADER",
            NodeState::Down => "DOWN",
        }
    }
}

impl std::fmt::Display for NodeState {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persistent state on all servers, updated on stable storage before
/// responding to RPCs: the latest term this server has seen and the
/// candidate granted its vote in that term, if any.
#[derive(Clone, Debug)]
pub struct HardState {
    pub current_term: u64,
    pub voted_for: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SharedState {
    pub node_id: String,

    pub hard_state: HardState,
}

impl SharedState {
    pub fn new(
        node_id: String,
        record: &NodeRecord,
    ) -> Self {
        Self {
            node_id,
            hard_state: HardState {
                current_term: record.current_term,
                voted_for: record.voted_for.clone(),
            },
        }
    }

    pub fn current_term(&self) -> u64 {
        self.hard_state.current_term
    }

    /// Adopts a higher term. Moving to a new term voids any vote cast in an
    /// earlier one; the term itself never decreases.
    pub fn update_current_term(
        &mut self,
        term: u64,
    ) {
        if term > self.hard_state.current_term {
            self.hard_state.current_term = term;
            self.hard_state.voted_for = None;
        }
    }

    pub fn voted_for(&self) -> Option<&str> {
        self.hard_state.voted_for.as_deref()
    }

    pub fn update_voted_for(
        &mut self,
        voted_for: Option<String>,
    ) {
        self.hard_state.voted_for = voted_for;
    }

    /// Builds the durable record that captures this state under the given
    /// role and stop flag.
    pub fn to_record(
        &self,
        state: NodeState,
        is_stopped: bool,
    ) -> NodeRecord {
        NodeRecord {
            node_id: self.node_id.clone(),
            current_term: self.hard_state.current_term,
            voted_for: self.hard_state.voted_for.clone(),
            state,
            is_stopped,
        }
    }
}

#[derive(Debug)]
pub enum RaftRole<T: TypeConfig> {
    Follower(FollowerState<T>),
    Candidate(CandidateState<T>),
    Leader(LeaderState<T>),
    Down(DownState<T>),
}

impl<T: TypeConfig> RaftRole<T> {
    pub fn state(&self) -> &dyn RaftRoleState<T = T> {
        match self {
            RaftRole::Follower(state) => state,
            RaftRole::Candidate(state) => state,
            RaftRole::Leader(state) => state,
            RaftRole::Down(state) => state,
        }
    }

    pub fn state_mut(&mut self) -> &mut dyn RaftRoleState<T = T> {
        match self {
            RaftRole::Follower(state) => state,
            RaftRole::Candidate(state) => state,
            RaftRole::Leader(state) => state,
            RaftRole::Down(state) => state,
        }
    }

    pub fn node_state(&self) -> NodeState {
        self.state().node_state()
    }

    pub(crate) fn is_timer_expired(&self) -> bool {
        self.state().is_timer_expired()
    }

    pub(crate) fn reset_timer(&mut self) {
        self.state_mut().reset_timer()
    }

    pub fn next_deadline(&self) -> Instant {
        self.state().next_deadline()
    }

    pub fn become_leader(&self) -> Result<RaftRole<T>> {
        self.state().become_leader()
    }
    pub fn become_candidate(&self) -> Result<RaftRole<T>> {
        self.state().become_candidate()
    }
    pub fn become_follower(&self) -> Result<RaftRole<T>> {
        self.state().become_follower()
    }
    pub fn become_down(&self) -> Result<RaftRole<T>> {
        self.state().become_down()
    }

    pub fn is_follower(&self) -> bool {
        self.state().is_follower()
    }
    pub fn is_candidate(&self) -> bool {
        self.state().is_candidate()
    }
    pub fn is_leader(&self) -> bool {
        self.state().is_leader()
    }
    pub fn is_down(&self) -> bool {
        self.state().is_down()
    }

    pub fn current_term(&self) -> u64 {
        self.state().current_term()
    }

    pub fn voted_for(&self) -> Option<String> {
        self.state().voted_for()
    }

    pub(crate) fn update_term(
        &mut self,
        new_term: u64,
    ) {
        self.state_mut().update_current_term(new_term);
    }

    pub fn to_record(
        &self,
        state: NodeState,
        is_stopped: bool,
    ) -> NodeRecord {
        self.state().shared_state().to_record(state, is_stopped)
    }

    pub async fn tick(
        &mut self,
        role_tx: &mpsc::UnboundedSender<RoleEvent>,
        ctx: &RaftContext<T>,
    ) -> Result<()> {
        trace!("raft_role:tick");
        self.state_mut().tick(role_tx, ctx).await
    }

    pub async fn handle_raft_event(
        &mut self,
        raft_event: RaftEvent,
        ctx: &RaftContext<T>,
        role_tx: mpsc::UnboundedSender<RoleEvent>,
    ) -> Result<()> {
        self.state_mut().handle_raft_event(raft_event, ctx, role_tx).await
    }
}

/// Replies on a oneshot responder, mapping a dropped receiver to a signal
/// failure.
pub(crate) fn send_response<V: Debug>(
    sender: oneshot::Sender<V>,
    value: V,
) -> Result<()> {
    sender.send(value).map_err(|e| {
        let error_str = format!("{e:?}");
        error!("Failed to send: {}", error_str);
        Error::from(NetworkError::SignalSendFailed(error_str))
    })
}

/// Signals a step-down to FOLLOWER and queues the triggering event for
/// replay once the transition has happened.
pub(crate) fn step_down_and_reprocess(
    role_tx: &mpsc::UnboundedSender<RoleEvent>,
    raft_event: RaftEvent,
) -> Result<()> {
    role_tx.send(RoleEvent::StepDown { new_term: None }).map_err(|e| {
        let error_str = format!("{e:?}");
        error!("Failed to send: {}", error_str);
        Error::from(NetworkError::SignalSendFailed(error_str))
    })?;

    role_tx.send(RoleEvent::ReprocessEvent(Box::new(raft_event))).map_err(|e| {
        let error_str = format!("{e:?}");
        error!("Failed to send: {}", error_str);
        Error::from(NetworkError::SignalSendFailed(error_str))
    })?;

    Ok(())
}
