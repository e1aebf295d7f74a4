mod config;
mod constants;
mod core;
mod errors;
mod membership;
mod network;
mod node;
mod storage;
mod type_config;

pub use self::config::*;
pub use self::constants::*;
pub use self::core::*;
pub use self::errors::*;
pub use self::membership::*;
pub use self::network::*;
pub use self::node::*;
pub use self::storage::*;
pub use self::type_config::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
