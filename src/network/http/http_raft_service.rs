//! HTTP RPC service for inter-node and administrative traffic.
//!
//! Every handler forwards an event with a oneshot responder into the
//! engine's event channel and awaits the reply under a timeout; the engine
//! loop remains the only place where protocol state is touched.
//!
//! Routes:
//! - `POST /raft/request-vote`    vote RPC from candidates
//! - `POST /raft/heartbeat`      heartbeat RPC from the leader
//! - `POST /raft/start-election` manual election trigger
//! - `POST /raft/admin/stop`     fault injection: suspend the node
//! - `POST /raft/admin/resume`   fault injection: revive the node
//! - `GET  /raft/status`         this node's status snapshot
//! - `GET  /raft/cluster-status` status fan-out over the whole cluster

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::watch;
use tracing::info;
use tracing::warn;
use warp::http::StatusCode;
use warp::reply::Reply;
use warp::Filter;
use warp::Rejection;

use crate::ConsensusError;
use crate::Error;
use crate::HeartbeatRequest;
use crate::NetworkError;
use crate::Node;
use crate::SystemError;
use crate::TypeConfig;
use crate::VoteRequest;

/// Binds the RPC server and serves until the shutdown signal fires.
pub async fn start_rpc_server<T: TypeConfig>(
    node: Arc<Node<T>>,
    listen_address: SocketAddr,
    mut shutdown_signal: watch::Receiver<()>,
) {
    info!("RPC server listening on {}", listen_address);

    let (_, server) = warp::serve(routes(node)).bind_with_graceful_shutdown(listen_address, async move {
        let _ = shutdown_signal.changed().await;
    });
    server.await;

    info!("RPC server stopped.");
}

pub fn routes<T: TypeConfig>(
    node: Arc<Node<T>>
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    request_vote_route(node.clone())
        .or(heartbeat_route(node.clone()))
        .or(start_election_route(node.clone()))
        .or(admin_stop_route(node.clone()))
        .or(admin_resume_route(node.clone()))
        .or(status_route(node.clone()))
        .or(cluster_status_route(node))
}

fn with_node<T: TypeConfig>(
    node: Arc<Node<T>>
) -> impl Filter<Extract = (Arc<Node<T>>,), Error = Infallible> + Clone {
    warp::any().map(move || node.clone())
}

fn request_vote_route<T: TypeConfig>(
    node: Arc<Node<T>>
) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    warp::path!("raft" / "request-vote")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_node(node))
        .and_then(request_vote_handler)
}

async fn request_vote_handler<T: TypeConfig>(
    request: VoteRequest,
    node: Arc<Node<T>>,
) -> std::result::Result<warp::reply::Response, Infallible> {
    if !node.server_is_ready() {
        warn!("[rpc|request_vote] node {} is not ready!", node.node_id);
        return Ok(not_ready_reply());
    }

    match node.handle_vote_request(request).await {
        Ok(response) => Ok(warp::reply::json(&response).into_response()),
        Err(e) => Ok(error_reply(&e)),
    }
}

fn heartbeat_route<T: TypeConfig>(
    node: Arc<Node<T>>
) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    warp::path!("raft" / "heartbeat")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_node(node))
        .and_then(heartbeat_handler)
}

async fn heartbeat_handler<T: TypeConfig>(
    request: HeartbeatRequest,
    node: Arc<Node<T>>,
) -> std::result::Result<warp::reply::Response, Infallible> {
    if !node.server_is_ready() {
        warn!("[rpc|heartbeat] node {} is not ready!", node.node_id);
        return Ok(not_ready_reply());
    }

    match node.handle_heartbeat(request).await {
        Ok(response) => Ok(warp::reply::json(&response).into_response()),
        Err(e) => Ok(error_reply(&e)),
    }
}

fn start_election_route<T: TypeConfig>(
    node: Arc<Node<T>>
) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    warp::path!("raft" / "start-election")
        .and(warp::post())
        .and(with_node(node))
        .and_then(start_election_handler)
}

async fn start_election_handler<T: TypeConfig>(
    node: Arc<Node<T>>
) -> std::result::Result<warp::reply::Response, Infallible> {
    if !node.server_is_ready() {
        return Ok(not_ready_reply());
    }

    match node.start_election().await {
        Ok(()) => Ok(message_reply(StatusCode::OK, "election started")),
        Err(e) => Ok(error_reply(&e)),
    }
}

fn admin_stop_route<T: TypeConfig>(
    node: Arc<Node<T>>
) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    warp::path!("raft" / "admin" / "stop")
        .and(warp::post())
        .and(with_node(node))
        .and_then(admin_stop_handler)
}

async fn admin_stop_handler<T: TypeConfig>(
    node: Arc<Node<T>>
) -> std::result::Result<warp::reply::Response, Infallible> {
    if !node.server_is_ready() {
        return Ok(not_ready_reply());
    }

    match node.stop().await {
        Ok(()) => Ok(message_reply(StatusCode::OK, "node stopped")),
        Err(e) => Ok(error_reply(&e)),
    }
}

fn admin_resume_route<T: TypeConfig>(
    node: Arc<Node<T>>
) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    warp::path!("raft" / "admin" / "resume")
        .and(warp::post())
        .and(with_node(node))
        .and_then(admin_resume_handler)
}

async fn admin_resume_handler<T: TypeConfig>(
    node: Arc<Node<T>>
) -> std::result::Result<warp::reply::Response, Infallible> {
    if !node.server_is_ready() {
        return Ok(not_ready_reply());
    }

    match node.resume().await {
        Ok(()) => Ok(message_reply(StatusCode::OK, "node resumed")),
        Err(e) => Ok(error_reply(&e)),
    }
}

fn status_route<T: TypeConfig>(
    node: Arc<Node<T>>
) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    warp::path!("raft" / "status")
        .and(warp::get())
        .and(with_node(node))
        .and_then(status_handler)
}

async fn status_handler<T: TypeConfig>(
    node: Arc<Node<T>>
) -> std::result::Result<warp::reply::Response, Infallible> {
    if !node.server_is_ready() {
        return Ok(not_ready_reply());
    }

    match node.status().await {
        Ok(status) => Ok(warp::reply::json(&status).into_response()),
        Err(e) => Ok(error_reply(&e)),
    }
}

fn cluster_status_route<T: TypeConfig>(
    node: Arc<Node<T>>
) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    warp::path!("raft" / "cluster-status")
        .and(warp::get())
        .and(with_node(node))
        .and_then(cluster_status_handler)
}

async fn cluster_status_handler<T: TypeConfig>(
    node: Arc<Node<T>>
) -> std::result::Result<warp::reply::Response, Infallible> {
    if !node.server_is_ready() {
        return Ok(not_ready_reply());
    }

    match node.cluster_status().await {
        Ok(statuses) => Ok(warp::reply::json(&statuses).into_response()),
        Err(e) => Ok(error_reply(&e)),
    }
}

fn message_reply(
    code: StatusCode,
    message: &str,
) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(&json!({ "message": message })), code).into_response()
}

fn not_ready_reply() -> warp::reply::Response {
    warp::reply::with_status(
        warp::reply::json(&json!({ "error": "Service is not ready" })),
        StatusCode::SERVICE_UNAVAILABLE,
    )
    .into_response()
}

fn error_reply(error: &Error) -> warp::reply::Response {
    let code = error_status(error);
    warp::reply::with_status(warp::reply::json(&json!({ "error": error.to_string() })), code).into_response()
}

/// Maps engine errors onto HTTP status codes. A stopped node answers 503 so
/// callers can tell injected downtime from a transport failure.
fn error_status(error: &Error) -> StatusCode {
    match error {
        Error::System(SystemError::NodeStopped) => StatusCode::SERVICE_UNAVAILABLE,
        Error::System(SystemError::ServerUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
        Error::System(SystemError::Network(NetworkError::Timeout { .. })) => StatusCode::GATEWAY_TIMEOUT,
        Error::Consensus(ConsensusError::RoleViolation { .. }) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
