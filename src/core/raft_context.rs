use std::sync::Arc;

use crate::alias::EOF;
use crate::alias::SSOF;
use crate::alias::TROF;
use crate::ClusterView;
use crate::RaftNodeConfig;
use crate::TypeConfig;

/// Shared handles every role state needs while processing events.
pub struct RaftContext<T: TypeConfig> {
    pub node_id: String,

    pub state_storage: Arc<SSOF<T>>,

    pub transport: Arc<TROF<T>>,

    pub election_handler: EOF<T>,

    pub cluster: Arc<ClusterView>,

    pub settings: Arc<RaftNodeConfig>,
}

impl<T: TypeConfig> RaftContext<T> {
    pub fn state_storage(&self) -> &Arc<SSOF<T>> {
        &self.state_storage
    }

    pub fn transport(&self) -> &Arc<TROF<T>> {
        &self.transport
    }

    pub fn election_handler(&self) -> &EOF<T> {
        &self.election_handler
    }

    pub fn cluster(&self) -> &Arc<ClusterView> {
        &self.cluster
    }

    pub fn settings(&self) -> &Arc<RaftNodeConfig> {
        &self.settings
    }
}
