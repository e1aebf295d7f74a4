use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio::time::Duration;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::alias::TROF;
use crate::ClusterView;
use crate::HeartbeatRequest;
use crate::HeartbeatResponse;
use crate::NetworkError;
use crate::NodeStatus;
use crate::Raft;
use crate::RaftEvent;
use crate::RaftNodeConfig;
use crate::Result;
use crate::SystemError;
use crate::Transport;
use crate::TypeConfig;
use crate::VoteRequest;
use crate::VoteResponse;

/// The public handle around the election engine.
///
/// The RPC surface and the administrative API talk to this handle only; it
/// forwards every request onto the engine loop as a [`RaftEvent`] and awaits
/// the oneshot reply. The engine itself runs single-threaded behind
/// `raft_core`.
pub struct Node<T>
where T: TypeConfig
{
    pub node_id: String,
    pub raft_core: Arc<Mutex<Raft<T>>>,

    event_tx: mpsc::Sender<RaftEvent>,
    ready: AtomicBool,

    pub(crate) node_config: Arc<RaftNodeConfig>,
    pub(crate) transport: Arc<TROF<T>>,
    pub(crate) cluster: Arc<ClusterView>,
}

impl<T> Node<T>
where T: TypeConfig
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        node_id: String,
        raft_core: Arc<Mutex<Raft<T>>>,
        event_tx: mpsc::Sender<RaftEvent>,
        node_config: Arc<RaftNodeConfig>,
        transport: Arc<TROF<T>>,
        cluster: Arc<ClusterView>,
    ) -> Self {
        Node {
            node_id,
            raft_core,
            event_tx,
            ready: AtomicBool::new(false),
            node_config,
            transport,
            cluster,
        }
    }

    /// Drives the engine loop until shutdown. Marks the node ready first so
    /// the RPC surface starts answering.
    pub async fn run(&self) -> Result<()> {
        self.set_ready(true);
        info!("[{}] node is ready.", self.node_id);

        let mut raft = self.raft_core.lock().await;
        raft.run().await
    }

    pub fn set_ready(
        &self,
        is_ready: bool,
    ) {
        self.ready.store(is_ready, Ordering::SeqCst);
    }

    pub fn server_is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub async fn handle_vote_request(
        &self,
        request: VoteRequest,
    ) -> Result<VoteResponse> {
        debug!("[{}] received vote request: {:?}", self.node_id, request);
        self.submit(|sender| RaftEvent::VoteRequest(request, sender)).await?
    }

    pub async fn handle_heartbeat(
        &self,
        request: HeartbeatRequest,
    ) -> Result<HeartbeatResponse> {
        debug!("[{}] received heartbeat: {:?}", self.node_id, request);
        self.submit(|sender| RaftEvent::Heartbeat(request, sender)).await?
    }

    /// Manual election trigger: expires the follower's election timer
    /// immediately.
    pub async fn start_election(&self) -> Result<()> {
        self.submit(RaftEvent::StartElection).await?
    }

    pub async fn stop(&self) -> Result<()> {
        self.submit(RaftEvent::AdminStop).await?
    }

    pub async fn resume(&self) -> Result<()> {
        self.submit(RaftEvent::AdminResume).await?
    }

    pub async fn status(&self) -> Result<NodeStatus> {
        self.submit(RaftEvent::QueryStatus).await
    }

    /// Own status first, then one probe per configured peer. An unreachable
    /// peer is reported as DOWN instead of failing the whole call.
    pub async fn cluster_status(&self) -> Result<Vec<NodeStatus>> {
        let mut statuses = Vec::with_capacity(self.cluster.cluster_size());
        statuses.push(self.status().await?);

        let probes = self.cluster.peers().iter().map(|peer| {
            let transport = self.transport.clone();
            let network = &self.node_config.network;
            async move { (peer.id.clone(), transport.fetch_status(peer, network).await) }
        });

        for (peer_id, probe) in join_all(probes).await {
            match probe {
                Ok(status) => statuses.push(status),
                Err(e) => {
                    warn!("[{}] status probe to {} failed: {:?}", self.node_id, peer_id, e);
                    statuses.push(NodeStatus::unreachable(peer_id));
                }
            }
        }

        Ok(statuses)
    }

    /// Submits an event to the engine loop and awaits its oneshot reply,
    /// bounded by the configured RPC handling timeout.
    async fn submit<R>(
        &self,
        make_event: impl FnOnce(oneshot::Sender<R>) -> RaftEvent,
    ) -> Result<R> {
        let (resp_tx, resp_rx) = oneshot::channel();

        self.event_tx.send(make_event(resp_tx)).await.map_err(|e| {
            let error_str = format!("{e:?}");
            error!("Failed to send: {}", error_str);
            NetworkError::SignalSendFailed(error_str)
        })?;

        let duration = Duration::from_millis(self.node_config.raft.rpc_handling_timeout_in_ms);
        match timeout(duration, resp_rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => {
                error!("[{}] engine dropped the responder.", self.node_id);
                Err(SystemError::ServerUnavailable.into())
            }
            Err(_) => {
                warn!("[{}] engine did not answer within {:?}.", self.node_id, duration);
                Err(NetworkError::Timeout {
                    node_id: self.node_id.clone(),
                    duration,
                }
                .into())
            }
        }
    }
}
