mod builder;
#[allow(clippy::module_inception)]
mod node;
mod raft_type_config;

pub use builder::*;
pub use node::*;
pub use raft_type_config::*;
