//! Shared fixtures for unit tests: a mock-backed [`TypeConfig`] plus small
//! builders for settings, cluster views, and durable records.

use std::sync::Arc;

use crate::ClusterView;
use crate::ElectionHandler;
use crate::MockStateStorage;
use crate::MockTransport;
use crate::NodeMeta;
use crate::NodeRecord;
use crate::NodeState;
use crate::RaftContext;
use crate::RaftNodeConfig;
use crate::TypeConfig;

pub const MOCK_NODE_ID: &str = "n1";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct MockTypeConfig;

impl TypeConfig for MockTypeConfig {
    type TR = MockTransport;
    type SS = MockStateStorage;
    type E = ElectionHandler<MockTypeConfig>;
}

pub fn settings() -> Arc<RaftNodeConfig> {
    Arc::new(RaftNodeConfig::default())
}

/// Settings with explicit timing, for tests driving timers under
/// `start_paused`.
pub fn settings_with_timing(
    election_timeout_min: u64,
    election_timeout_max: u64,
    heartbeat_interval_in_ms: u64,
) -> Arc<RaftNodeConfig> {
    let mut settings = RaftNodeConfig::default();
    settings.raft.election.election_timeout_min = election_timeout_min;
    settings.raft.election.election_timeout_max = election_timeout_max;
    settings.raft.heartbeat_interval_in_ms = heartbeat_interval_in_ms;
    Arc::new(settings)
}

/// `count` peers named `n2..`, with unroutable loopback addresses.
pub fn peers(count: usize) -> Vec<NodeMeta> {
    (0..count)
        .map(|i| NodeMeta {
            id: format!("n{}", i + 2),
            address: format!("127.0.0.1:{}", 9082 + i),
        })
        .collect()
}

/// Cluster view for [`MOCK_NODE_ID`] plus `peer_count` peers.
pub fn cluster_of(peer_count: usize) -> Arc<ClusterView> {
    let mut members = vec![NodeMeta {
        id: MOCK_NODE_ID.to_string(),
        address: "127.0.0.1:9081".to_string(),
    }];
    members.extend(peers(peer_count));
    Arc::new(ClusterView::new(MOCK_NODE_ID.to_string(), members))
}

pub fn node_record(
    current_term: u64,
    voted_for: Option<&str>,
    state: NodeState,
    is_stopped: bool,
) -> NodeRecord {
    NodeRecord {
        node_id: MOCK_NODE_ID.to_string(),
        current_term,
        voted_for: voted_for.map(str::to_string),
        state,
        is_stopped,
    }
}

/// Context wired to the given mocks, impersonating [`MOCK_NODE_ID`] in a
/// cluster of `peer_count + 1` members.
pub fn mock_context(
    transport: MockTransport,
    state_storage: MockStateStorage,
    peer_count: usize,
    settings: Arc<RaftNodeConfig>,
) -> RaftContext<MockTypeConfig> {
    RaftContext {
        node_id: MOCK_NODE_ID.to_string(),
        state_storage: Arc::new(state_storage),
        transport: Arc::new(transport),
        election_handler: ElectionHandler::new(MOCK_NODE_ID.to_string()),
        cluster: cluster_of(peer_count),
        settings,
    }
}
