mod sled_state_storage;
pub use sled_state_storage::*;


use std::path::Path;

use crate::Result;

/// Opens (or creates) the sled database backing the node record store.
pub fn init_sled_state_db(db_root_dir: impl AsRef<Path>) -> Result<sled::Db> {
    let db = sled::open(db_root_dir.as_ref())?;
    Ok(db)
}
