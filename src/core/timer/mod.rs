mod election_timer;
mod heartbeat_timer;
pub use election_timer::*;
pub use heartbeat_timer::*;
