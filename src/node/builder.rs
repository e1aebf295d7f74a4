use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::sync::Mutex;
use tracing::error;
use tracing::info;

use super::Node;
use super::RaftTypeConfig;
use crate::alias::SSOF;
use crate::alias::TROF;
use crate::init_sled_state_db;
use crate::ClusterView;
use crate::ElectionHandler;
use crate::HttpTransport;
use crate::NodeRecord;
use crate::Raft;
use crate::RaftNodeConfig;
use crate::Result;
use crate::SignalParams;
use crate::SledStateStorage;
use crate::StateStorage;
use crate::SystemError;
use crate::RAFT_EVENT_CHANNEL_CAPACITY;

/// Assembles a ready-to-run [`Node`] from configuration.
///
/// The happy path is `NodeBuilder::new(..).build().start_rpc_server().ready()`.
/// Storage and transport can be swapped before `build()` for tests.
pub struct NodeBuilder {
    node_config: RaftNodeConfig,
    state_storage: Option<SSOF<RaftTypeConfig>>,
    transport: Option<TROF<RaftTypeConfig>>,
    shutdown_signal: watch::Receiver<()>,
    node: Option<Arc<Node<RaftTypeConfig>>>,
}

impl NodeBuilder {
    /// Loads configuration (optionally from `node_path`) and prepares the
    /// builder. Configuration failures are fatal at this stage.
    pub fn new(
        node_path: Option<&str>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        let node_config = RaftNodeConfig::load(node_path).expect("Load node config successfully.");
        Self::init(node_config, shutdown_signal)
    }

    pub fn init(
        node_config: RaftNodeConfig,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            node_config,
            state_storage: None,
            transport: None,
            shutdown_signal,
            node: None,
        }
    }

    pub fn state_storage(
        mut self,
        state_storage: SSOF<RaftTypeConfig>,
    ) -> Self {
        self.state_storage = Some(state_storage);
        self
    }

    pub fn transport(
        mut self,
        transport: TROF<RaftTypeConfig>,
    ) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Wires storage, transport, channels and the engine together.
    pub fn build(mut self) -> Self {
        let node_config = self.node_config.clone();
        let node_id = node_config.cluster.node_id.clone();

        let state_storage = match self.state_storage.take() {
            Some(state_storage) => state_storage,
            None => {
                let db_path = node_config.cluster.db_root_dir.join(&node_id);
                let db = init_sled_state_db(&db_path).expect("Init sled state db successfully.");
                SledStateStorage::new(Arc::new(db)).expect("Init state storage successfully.")
            }
        };

        let transport = self.transport.take().unwrap_or_else(|| {
            HttpTransport::new(node_id.clone(), &node_config.network).expect("Init HTTP transport successfully.")
        });

        // First boot initializes the durable record; every later boot
        // restores it.
        let record = match state_storage.load_node_record().expect("Load node record successfully.") {
            Some(record) => {
                info!(
                    "[{}] restored node record: term={}, state={:?}, is_stopped={}",
                    node_id, record.current_term, record.state, record.is_stopped
                );
                record
            }
            None => {
                let record = NodeRecord::initial(node_id.clone());
                state_storage
                    .save_node_record(&record)
                    .expect("Persist initial node record successfully.");
                record
            }
        };

        let cluster = Arc::new(ClusterView::new(
            node_id.clone(),
            node_config.cluster.initial_cluster.clone(),
        ));

        let (role_tx, role_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(RAFT_EVENT_CHANNEL_CAPACITY);

        let node_config = Arc::new(node_config);
        let state_storage = Arc::new(state_storage);
        let transport = Arc::new(transport);

        let raft_core = Raft::<RaftTypeConfig>::new(
            node_id.clone(),
            &record,
            state_storage,
            transport.clone(),
            ElectionHandler::new(node_id.clone()),
            cluster.clone(),
            SignalParams::new(role_tx, role_rx, event_tx.clone(), event_rx, self.shutdown_signal.clone()),
            node_config.clone(),
        );

        self.node = Some(Arc::new(Node::new(
            node_id,
            Arc::new(Mutex::new(raft_core)),
            event_tx,
            node_config,
            transport,
            cluster,
        )));
        self
    }

    /// Spawns the HTTP RPC server on the configured listen address.
    pub fn start_rpc_server(self) -> Self {
        if let Some(node) = &self.node {
            let node = node.clone();
            let listen_address = self.node_config.cluster.listen_address;
            let shutdown_signal = self.shutdown_signal.clone();
            tokio::spawn(async move {
                crate::start_rpc_server(node, listen_address, shutdown_signal).await;
            });
            self
        } else {
            panic!("build() must be called before start_rpc_server().");
        }
    }

    pub fn ready(self) -> Result<Arc<Node<RaftTypeConfig>>> {
        self.node.ok_or_else(|| {
            error!("Node not built yet.");
            SystemError::NodeStartFailed("call build() first".to_string()).into()
        })
    }
}
