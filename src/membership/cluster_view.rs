//! Static cluster membership view.
//!
//! Membership never changes at runtime; the view is computed once from the
//! configured `initial_cluster` and shared immutably across the engine and
//! the HTTP surface.

use crate::NodeMeta;

#[derive(Debug, Clone)]
pub struct ClusterView {
    node_id: String,
    /// Every configured member except this node.
    peers: Vec<NodeMeta>,
    /// Total member count, this node included.
    cluster_size: usize,
}

impl ClusterView {
    pub fn new(
        node_id: String,
        initial_cluster: Vec<NodeMeta>,
    ) -> Self {
        let cluster_size = initial_cluster.len();
        let peers = initial_cluster.into_iter().filter(|n| n.id != node_id).collect();
        Self {
            node_id,
            peers,
            cluster_size,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn peers(&self) -> &[NodeMeta] {
        &self.peers
    }

    pub fn cluster_size(&self) -> usize {
        self.cluster_size
    }
}

/// `succeed` distinct votes out of `total` cluster members form a majority.
#[inline]
pub fn is_majority(
    succeed: usize,
    total: usize,
) -> bool {
    total > 0 && succeed >= total / 2 + 1
}
