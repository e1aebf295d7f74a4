pub mod election;
pub mod raft_role;
pub mod timer;

mod event;
mod raft;
mod raft_context;

pub use election::*;
pub use event::*;
pub use raft::*;
pub use raft_context::*;
pub use raft_role::*;
pub use timer::*;
