use tokio::sync::oneshot;

use crate::HeartbeatRequest;
use crate::HeartbeatResponse;
use crate::NodeStatus;
use crate::Result;
use crate::VoteRequest;
use crate::VoteResponse;

/// Role transitions and engine-internal signals, delivered on the unbounded
/// role channel so they are never blocked behind RPC traffic.
#[derive(Debug)]
pub enum RoleEvent {
    /// Election timeout fired while FOLLOWER
    BecomeCandidate,

    /// The vote fan-out for `term` collected a majority. Discarded unless the
    /// node is still CANDIDATE at exactly that term.
    ElectionWon { term: u64 },

    /// Revert to FOLLOWER, adopting `new_term` first when it is higher than
    /// the current one.
    StepDown { new_term: Option<u64> },

    /// Replay the raft event after a step-down changed the role
    ReprocessEvent(Box<RaftEvent>),
}

/// Inbound RPC and administrative events, each carrying a oneshot responder.
#[derive(Debug)]
pub enum RaftEvent {
    VoteRequest(VoteRequest, oneshot::Sender<Result<VoteResponse>>),

    Heartbeat(HeartbeatRequest, oneshot::Sender<Result<HeartbeatResponse>>),

    /// Manual election trigger (`POST /raft/start-election`)
    StartElection(oneshot::Sender<Result<()>>),

    /// Fault injection: suspend protocol participation
    AdminStop(oneshot::Sender<Result<()>>),

    /// Fault injection: revive as FOLLOWER
    AdminResume(oneshot::Sender<Result<()>>),

    /// Diagnostic snapshot for the status endpoints
    QueryStatus(oneshot::Sender<NodeStatus>),
}
