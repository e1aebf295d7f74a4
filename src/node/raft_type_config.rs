use crate::ElectionHandler;
use crate::HttpTransport;
use crate::SledStateStorage;
use crate::TypeConfig;

/// The production wiring: HTTP transport, sled-backed persistence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct RaftTypeConfig;

impl TypeConfig for RaftTypeConfig {
    type TR = HttpTransport;
    type SS = SledStateStorage;
    type E = ElectionHandler<RaftTypeConfig>;
}
