//! Internal constants shared across storage and engine modules.

/// sled tree name holding the durable node record.
pub const STATE_STORAGE_NAMESPACE: &str = "node_record_store";

/// Key of the single node record inside [`STATE_STORAGE_NAMESPACE`].
pub const NODE_RECORD_KEY: &str = "node_record";

/// Capacity of the engine's inbound RPC/admin event channel.
pub const RAFT_EVENT_CHANNEL_CAPACITY: usize = 10240;

/// Idle re-arm interval for a stopped node's parked timer, in milliseconds.
/// A DOWN node never transitions on tick; this only bounds how often the
/// event loop wakes up while stopped.
pub const DOWN_PARK_INTERVAL_IN_MS: u64 = 60_000;
