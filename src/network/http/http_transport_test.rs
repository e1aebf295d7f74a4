use std::net::SocketAddr;

use warp::Filter;

use super::HttpTransport;
use crate::Error;
use crate::HeartbeatRequest;
use crate::HeartbeatResponse;
use crate::NetworkConfig;
use crate::NetworkError;
use crate::NodeMeta;
use crate::NodeState;
use crate::NodeStatus;
use crate::SystemError;
use crate::Transport;
use crate::VoteRequest;
use crate::VoteResponse;

/// Stub peer: grants every vote, accepts every heartbeat, reports itself
/// as an established leader.
async fn spawn_stub_peer() -> SocketAddr {
    let vote = warp::path!("raft" / "request-vote")
        .and(warp::post())
        .and(warp::body::json())
        .map(|request: VoteRequest| {
            warp::reply::json(&VoteResponse {
                granted: true,
                responder_term: request.term,
            })
        });
    let heartbeat = warp::path!("raft" / "heartbeat")
        .and(warp::post())
        .and(warp::body::json())
        .map(|request: HeartbeatRequest| {
            warp::reply::json(&HeartbeatResponse {
                accepted: true,
                responder_term: request.term,
            })
        });
    let status = warp::path!("raft" / "status").and(warp::get()).map(|| {
        warp::reply::json(&NodeStatus {
            node_id: "n2".to_string(),
            state: NodeState::Leader,
            current_term: 4,
            voted_for: Some("n2".to_string()),
            is_stopped: false,
        })
    });

    let (addr, server) = warp::serve(vote.or(heartbeat).or(status)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    addr
}

fn peer(
    id: &str,
    addr: SocketAddr,
) -> NodeMeta {
    NodeMeta {
        id: id.to_string(),
        address: addr.to_string(),
    }
}

fn unreachable_peer(id: &str) -> NodeMeta {
    NodeMeta {
        id: id.to_string(),
        // Reserved port; connection is refused immediately.
        address: "127.0.0.1:1".to_string(),
    }
}

/// # Case 1: reachable peers answer, unreachable peers yield Err entries
#[tokio::test]
async fn test_send_vote_requests_case1() {
    let addr = spawn_stub_peer().await;
    let transport = HttpTransport::new("n1".to_string(), &NetworkConfig::default()).expect("transport");

    let result = transport
        .send_vote_requests(
            vec![peer("n2", addr), unreachable_peer("n3")],
            VoteRequest {
                term: 7,
                candidate_id: "n1".to_string(),
            },
            &NetworkConfig::default(),
        )
        .await
        .expect("fan-out should succeed");

    assert_eq!(result.responses.len(), 2);

    let (peer_id, reply) = &result.responses[0];
    assert_eq!(peer_id, "n2");
    assert_eq!(
        reply.as_ref().expect("n2 should answer"),
        &VoteResponse {
            granted: true,
            responder_term: 7,
        }
    );

    let (peer_id, reply) = &result.responses[1];
    assert_eq!(peer_id, "n3");
    assert!(reply.is_err());
}

/// # Case 2: an empty peer list is refused before any I/O
#[tokio::test]
async fn test_send_vote_requests_case2() {
    let transport = HttpTransport::new("n1".to_string(), &NetworkConfig::default()).expect("transport");

    let result = transport
        .send_vote_requests(
            Vec::new(),
            VoteRequest {
                term: 7,
                candidate_id: "n1".to_string(),
            },
            &NetworkConfig::default(),
        )
        .await;

    assert!(matches!(
        result,
        Err(Error::System(SystemError::Network(NetworkError::EmptyPeerList { .. })))
    ));
}

/// # Case 1: heartbeats round-trip through the JSON endpoint
#[tokio::test]
async fn test_send_heartbeats_case1() {
    let addr = spawn_stub_peer().await;
    let transport = HttpTransport::new("n1".to_string(), &NetworkConfig::default()).expect("transport");

    let result = transport
        .send_heartbeats(
            vec![peer("n2", addr)],
            HeartbeatRequest {
                term: 4,
                leader_id: "n1".to_string(),
            },
            &NetworkConfig::default(),
        )
        .await
        .expect("fan-out should succeed");

    let (peer_id, reply) = &result.responses[0];
    assert_eq!(peer_id, "n2");
    assert_eq!(
        reply.as_ref().expect("n2 should answer"),
        &HeartbeatResponse {
            accepted: true,
            responder_term: 4,
        }
    );
}

/// # Case 1: a status probe deserializes the peer's snapshot
#[tokio::test]
async fn test_fetch_status_case1() {
    let addr = spawn_stub_peer().await;
    let transport = HttpTransport::new("n1".to_string(), &NetworkConfig::default()).expect("transport");

    let status = transport
        .fetch_status(&peer("n2", addr), &NetworkConfig::default())
        .await
        .expect("probe should succeed");

    assert_eq!(status.node_id, "n2");
    assert_eq!(status.state, NodeState::Leader);
    assert_eq!(status.current_term, 4);
    assert!(!status.is_stopped);
}

/// # Case 2: an unreachable peer fails the probe with a network error
#[tokio::test]
async fn test_fetch_status_case2() {
    let transport = HttpTransport::new("n1".to_string(), &NetworkConfig::default()).expect("transport");

    let result = transport
        .fetch_status(&unreachable_peer("n3"), &NetworkConfig::default())
        .await;

    assert!(matches!(
        result,
        Err(Error::System(SystemError::Network(NetworkError::Unreachable { .. })))
    ));
}
