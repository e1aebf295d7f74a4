//! Outbound HTTP/JSON client for peer RPCs.
//!
//! Every fan-out contacts all peers in parallel with a bounded per-request
//! timeout. A peer that fails to answer contributes an `Err` entry to the
//! result, which the election tally treats as a non-response.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::HeartbeatRequest;
use crate::HeartbeatResponse;
use crate::HeartbeatResult;
use crate::NetworkConfig;
use crate::NetworkError;
use crate::NodeMeta;
use crate::NodeStatus;
use crate::Result;
use crate::Transport;
use crate::VoteRequest;
use crate::VoteResponse;
use crate::VoteResult;

#[derive(Debug, Clone)]
pub struct HttpTransport {
    pub(crate) my_id: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(
        my_id: String,
        network: &NetworkConfig,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(network.connect_timeout_in_ms))
            .build()
            .map_err(|e| NetworkError::Unreachable { source: Box::new(e) })?;

        Ok(Self { my_id, client })
    }

    fn url(
        peer: &NodeMeta,
        path: &str,
    ) -> String {
        format!("http://{}{}", peer.address, path)
    }

    async fn post_json<Req, Resp>(
        client: &reqwest::Client,
        url: &str,
        request: &Req,
        timeout: Duration,
    ) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let response = client
            .post(url)
            .timeout(timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| NetworkError::Unreachable { source: Box::new(e) })?;

        let response = response
            .error_for_status()
            .map_err(|e| NetworkError::Unreachable { source: Box::new(e) })?;

        let body = response
            .json::<Resp>()
            .await
            .map_err(|e| NetworkError::Unreachable { source: Box::new(e) })?;

        Ok(body)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send_vote_requests(
        &self,
        peers: Vec<NodeMeta>,
        request: VoteRequest,
        network: &NetworkConfig,
    ) -> Result<VoteResult> {
        if peers.is_empty() {
            return Err(NetworkError::EmptyPeerList {
                request_type: "request_vote",
            }
            .into());
        }

        debug!("[{}] send_vote_requests to {} peers", self.my_id, peers.len());

        let timeout = Duration::from_millis(network.request_timeout_in_ms);
        let futures = peers.iter().map(|peer| {
            let client = self.client.clone();
            let url = Self::url(peer, "/raft/request-vote");
            let request = request.clone();
            let peer_id = peer.id.clone();
            async move {
                let result = Self::post_json::<VoteRequest, VoteResponse>(&client, &url, &request, timeout).await;
                (peer_id, result)
            }
        });

        let responses = join_all(futures).await;
        Ok(VoteResult { responses })
    }

    async fn send_heartbeats(
        &self,
        peers: Vec<NodeMeta>,
        request: HeartbeatRequest,
        network: &NetworkConfig,
    ) -> Result<HeartbeatResult> {
        if peers.is_empty() {
            return Err(NetworkError::EmptyPeerList {
                request_type: "heartbeat",
            }
            .into());
        }

        let timeout = Duration::from_millis(network.request_timeout_in_ms);
        let futures = peers.iter().map(|peer| {
            let client = self.client.clone();
            let url = Self::url(peer, "/raft/heartbeat");
            let request = request.clone();
            let peer_id = peer.id.clone();
            async move {
                let result =
                    Self::post_json::<HeartbeatRequest, HeartbeatResponse>(&client, &url, &request, timeout).await;
                (peer_id, result)
            }
        });

        let responses = join_all(futures).await;
        Ok(HeartbeatResult { responses })
    }

    async fn fetch_status(
        &self,
        peer: &NodeMeta,
        network: &NetworkConfig,
    ) -> Result<NodeStatus> {
        let timeout = Duration::from_millis(network.status_probe_timeout_in_ms);
        let response = self
            .client
            .get(Self::url(peer, "/raft/status"))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| NetworkError::Unreachable { source: Box::new(e) })?;

        let response = response
            .error_for_status()
            .map_err(|e| NetworkError::Unreachable { source: Box::new(e) })?;

        let status = response
            .json::<NodeStatus>()
            .await
            .map_err(|e| NetworkError::Unreachable { source: Box::new(e) })?;

        Ok(status)
    }
}
