mod http_raft_service;
mod http_transport;
pub use http_raft_service::*;
pub use http_transport::*;

#[cfg(test)]
mod http_transport_test;
