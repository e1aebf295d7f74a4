use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::oneshot;

use super::follower_state::FollowerState;
use super::role_state::RaftRoleState;
use super::NodeState;
use crate::test_utils;
use crate::test_utils::MockTypeConfig;
use crate::test_utils::MOCK_NODE_ID;
use crate::Error;
use crate::HeartbeatRequest;
use crate::MockStateStorage;
use crate::MockTransport;
use crate::RaftEvent;
use crate::RaftNodeConfig;
use crate::RoleEvent;
use crate::StorageError;
use crate::VoteRequest;

fn follower(
    settings: &Arc<RaftNodeConfig>,
    current_term: u64,
    voted_for: Option<&str>,
) -> FollowerState<MockTypeConfig> {
    let record = test_utils::node_record(current_term, voted_for, NodeState::Follower, false);
    FollowerState::new(MOCK_NODE_ID.to_string(), settings.clone(), &record)
}

/// # Case 1: election timeout promotes the follower to candidate
///
/// ## Validation criterias:
/// 1. tick sends RoleEvent::BecomeCandidate
#[tokio::test]
async fn test_tick_case1() {
    let settings = test_utils::settings();
    let ctx = test_utils::mock_context(MockTransport::new(), MockStateStorage::new(), 2, settings.clone());
    let (role_tx, mut role_rx) = mpsc::unbounded_channel();

    let mut state = follower(&settings, 1, None);
    state.tick(&role_tx, &ctx).await.expect("tick should succeed");

    assert!(matches!(role_rx.try_recv(), Ok(RoleEvent::BecomeCandidate)));
}

/// # Case 1: first vote of the term is persisted before the reply
///
/// ## Validation criterias:
/// 1. the record hits storage with the granted vote
/// 2. the reply carries granted = true
/// 3. in-memory voted_for reflects the grant
#[tokio::test]
async fn test_handle_vote_request_case1() {
    let settings = test_utils::settings();
    let mut storage = MockStateStorage::new();
    storage
        .expect_save_node_record()
        .times(1)
        .withf(|record| {
            record.current_term == 5
                && record.voted_for.as_deref() == Some("n2")
                && record.state == NodeState::Follower
                && !record.is_stopped
        })
        .returning(|_| Ok(()));
    let ctx = test_utils::mock_context(MockTransport::new(), storage, 2, settings.clone());
    let (role_tx, _role_rx) = mpsc::unbounded_channel();
    let (resp_tx, resp_rx) = oneshot::channel();

    let mut state = follower(&settings, 5, None);
    state
        .handle_raft_event(
            RaftEvent::VoteRequest(
                VoteRequest {
                    term: 5,
                    candidate_id: "n2".to_string(),
                },
                resp_tx,
            ),
            &ctx,
            role_tx,
        )
        .await
        .expect("handle_raft_event should succeed");

    let response = resp_rx.await.expect("responder dropped").expect("vote reply");
    assert!(response.granted);
    assert_eq!(response.responder_term, 5);
    assert_eq!(state.voted_for().as_deref(), Some("n2"));
}

/// # Case 2: a second candidate in the same term is rejected without touching
/// storage
#[tokio::test]
async fn test_handle_vote_request_case2() {
    let settings = test_utils::settings();
    let ctx = test_utils::mock_context(MockTransport::new(), MockStateStorage::new(), 2, settings.clone());
    let (role_tx, _role_rx) = mpsc::unbounded_channel();
    let (resp_tx, resp_rx) = oneshot::channel();

    let mut state = follower(&settings, 5, Some("n2"));
    state
        .handle_raft_event(
            RaftEvent::VoteRequest(
                VoteRequest {
                    term: 5,
                    candidate_id: "n3".to_string(),
                },
                resp_tx,
            ),
            &ctx,
            role_tx,
        )
        .await
        .expect("handle_raft_event should succeed");

    let response = resp_rx.await.expect("responder dropped").expect("vote reply");
    assert!(!response.granted);
    assert_eq!(state.voted_for().as_deref(), Some("n2"));
}

/// # Case 3: a higher-term request voids the earlier vote
///
/// ## Validation criterias:
/// 1. persisted record carries term 7 and the new candidate
/// 2. in-memory term adopts 7
#[tokio::test]
async fn test_handle_vote_request_case3() {
    let settings = test_utils::settings();
    let mut storage = MockStateStorage::new();
    storage
        .expect_save_node_record()
        .times(1)
        .withf(|record| record.current_term == 7 && record.voted_for.as_deref() == Some("n3"))
        .returning(|_| Ok(()));
    let ctx = test_utils::mock_context(MockTransport::new(), storage, 2, settings.clone());
    let (role_tx, _role_rx) = mpsc::unbounded_channel();
    let (resp_tx, resp_rx) = oneshot::channel();

    let mut state = follower(&settings, 5, Some("n2"));
    state
        .handle_raft_event(
            RaftEvent::VoteRequest(
                VoteRequest {
                    term: 7,
                    candidate_id: "n3".to_string(),
                },
                resp_tx,
            ),
            &ctx,
            role_tx,
        )
        .await
        .expect("handle_raft_event should succeed");

    let response = resp_rx.await.expect("responder dropped").expect("vote reply");
    assert!(response.granted);
    assert_eq!(response.responder_term, 7);
    assert_eq!(state.current_term(), 7);
    assert_eq!(state.voted_for().as_deref(), Some("n3"));
}

/// # Case 4: a failed save leaves the prior state intact and reports the error
///
/// ## Validation criterias:
/// 1. the reply is an error, not a grant
/// 2. in-memory voted_for is unchanged
#[tokio::test]
async fn test_handle_vote_request_case4() {
    let settings = test_utils::settings();
    let mut storage = MockStateStorage::new();
    storage
        .expect_save_node_record()
        .times(1)
        .returning(|_| Err(StorageError::DbError("disk full".to_string()).into()));
    let ctx = test_utils::mock_context(MockTransport::new(), storage, 2, settings.clone());
    let (role_tx, _role_rx) = mpsc::unbounded_channel();
    let (resp_tx, resp_rx) = oneshot::channel();

    let mut state = follower(&settings, 5, None);
    state
        .handle_raft_event(
            RaftEvent::VoteRequest(
                VoteRequest {
                    term: 5,
                    candidate_id: "n2".to_string(),
                },
                resp_tx,
            ),
            &ctx,
            role_tx,
        )
        .await
        .expect("handle_raft_event should succeed");

    let response = resp_rx.await.expect("responder dropped");
    assert!(matches!(response, Err(Error::System(_))));
    assert_eq!(state.voted_for(), None);
    assert_eq!(state.current_term(), 5);
}

/// # Case 1: a stale heartbeat is refused with the current term
#[tokio::test]
async fn test_handle_heartbeat_case1() {
    let settings = test_utils::settings();
    let ctx = test_utils::mock_context(MockTransport::new(), MockStateStorage::new(), 2, settings.clone());
    let (role_tx, _role_rx) = mpsc::unbounded_channel();
    let (resp_tx, resp_rx) = oneshot::channel();

    let mut state = follower(&settings, 5, None);
    state
        .handle_raft_event(
            RaftEvent::Heartbeat(
                HeartbeatRequest {
                    term: 3,
                    leader_id: "n2".to_string(),
                },
                resp_tx,
            ),
            &ctx,
            role_tx,
        )
        .await
        .expect("handle_raft_event should succeed");

    let response = resp_rx.await.expect("responder dropped").expect("heartbeat reply");
    assert!(!response.accepted);
    assert_eq!(response.responder_term, 5);
    assert_eq!(state.current_term(), 5);
}

/// # Case 2: a higher-term heartbeat is persisted, adopted and accepted
#[tokio::test]
async fn test_handle_heartbeat_case2() {
    let settings = test_utils::settings();
    let mut storage = MockStateStorage::new();
    storage
        .expect_save_node_record()
        .times(1)
        .withf(|record| record.current_term == 9 && record.voted_for.is_none())
        .returning(|_| Ok(()));
    let ctx = test_utils::mock_context(MockTransport::new(), storage, 2, settings.clone());
    let (role_tx, _role_rx) = mpsc::unbounded_channel();
    let (resp_tx, resp_rx) = oneshot::channel();

    let mut state = follower(&settings, 5, Some("n3"));
    state
        .handle_raft_event(
            RaftEvent::Heartbeat(
                HeartbeatRequest {
                    term: 9,
                    leader_id: "n2".to_string(),
                },
                resp_tx,
            ),
            &ctx,
            role_tx,
        )
        .await
        .expect("handle_raft_event should succeed");

    let response = resp_rx.await.expect("responder dropped").expect("heartbeat reply");
    assert!(response.accepted);
    assert_eq!(response.responder_term, 9);
    assert_eq!(state.current_term(), 9);
    assert_eq!(state.voted_for(), None);
}

/// # Case 3: an equal-term heartbeat is accepted without touching storage
#[tokio::test]
async fn test_handle_heartbeat_case3() {
    let settings = test_utils::settings();
    let ctx = test_utils::mock_context(MockTransport::new(), MockStateStorage::new(), 2, settings.clone());
    let (role_tx, _role_rx) = mpsc::unbounded_channel();
    let (resp_tx, resp_rx) = oneshot::channel();

    let mut state = follower(&settings, 5, Some("n2"));
    state
        .handle_raft_event(
            RaftEvent::Heartbeat(
                HeartbeatRequest {
                    term: 5,
                    leader_id: "n2".to_string(),
                },
                resp_tx,
            ),
            &ctx,
            role_tx,
        )
        .await
        .expect("handle_raft_event should succeed");

    let response = resp_rx.await.expect("responder dropped").expect("heartbeat reply");
    assert!(response.accepted);
    assert_eq!(state.voted_for().as_deref(), Some("n2"));
}

/// # Case 1: the manual trigger expires the election timer at once
#[tokio::test]
async fn test_handle_start_election_case1() {
    let settings = test_utils::settings();
    let ctx = test_utils::mock_context(MockTransport::new(), MockStateStorage::new(), 2, settings.clone());
    let (role_tx, _role_rx) = mpsc::unbounded_channel();
    let (resp_tx, resp_rx) = oneshot::channel();

    let mut state = follower(&settings, 1, None);
    assert!(!state.is_timer_expired());

    state
        .handle_raft_event(RaftEvent::StartElection(resp_tx), &ctx, role_tx)
        .await
        .expect("handle_raft_event should succeed");

    assert!(resp_rx.await.expect("responder dropped").is_ok());
    assert!(state.is_timer_expired());
}

/// # Case 1: valid transitions out of FOLLOWER
#[test]
fn test_transitions_case1() {
    let settings = test_utils::settings();
    let state = follower(&settings, 3, Some("n2"));

    let candidate = state.become_candidate().expect("follower may campaign");
    assert!(candidate.is_candidate());
    assert_eq!(candidate.current_term(), 3);

    let down = state.become_down().expect("follower may be stopped");
    assert!(down.is_down());

    assert!(state.become_leader().is_err());
    assert!(state.become_follower().is_err());
}
