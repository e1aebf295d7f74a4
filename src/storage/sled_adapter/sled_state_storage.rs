use std::sync::Arc;

use tracing::debug;
use tracing::error;

use crate::Error;
use crate::NodeRecord;
use crate::Result;
use crate::StateStorage;
use crate::NODE_RECORD_KEY;
use crate::STATE_STORAGE_NAMESPACE;

#[derive(Clone)]
pub struct SledStateStorage {
    #[allow(dead_code)]
    db: Arc<sled::Db>,
    tree: Arc<sled::Tree>,
}

impl std::fmt::Debug for SledStateStorage {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SledStateStorage")
            .field("tree_len", &self.tree.len())
            .finish()
    }
}

impl SledStateStorage {
    pub fn new(db: Arc<sled::Db>) -> Result<Self> {
        let tree = db.open_tree(STATE_STORAGE_NAMESPACE).map_err(|e| {
            error!("Failed to open state storage tree: {}", e);
            Error::from(e)
        })?;
        Ok(Self {
            db,
            tree: Arc::new(tree),
        })
    }
}

impl StateStorage for SledStateStorage {
    fn load_node_record(&self) -> Result<Option<NodeRecord>> {
        match self.tree.get(NODE_RECORD_KEY)? {
            Some(ivec) => {
                let record: NodeRecord = bincode::deserialize(&ivec)?;
                debug!(
                    "loaded node record: term={}, state={:?}, is_stopped={}",
                    record.current_term, record.state, record.is_stopped
                );
                Ok(Some(record))
            }
            None => {
                debug!("no node record found under key: {}", NODE_RECORD_KEY);
                Ok(None)
            }
        }
    }

    fn save_node_record(
        &self,
        record: &NodeRecord,
    ) -> Result<()> {
        let bytes = bincode::serialize(record)?;
        self.tree.insert(NODE_RECORD_KEY, bytes)?;

        // A save that returned Ok must survive a crash.
        self.flush()?;

        debug!(
            "persisted node record: term={}, voted_for={:?}, state={:?}",
            record.current_term, record.voted_for, record.state
        );
        Ok(())
    }

    fn flush(&self) -> Result<usize> {
        self.tree.flush().map_err(Error::from)
    }
}
