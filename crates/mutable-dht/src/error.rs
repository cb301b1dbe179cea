//! Error types for the node API.

use mutable_dht_core::{CoreError, PeerAddr};
use mutable_dht_rpc::RpcError;
use mutable_dht_store::StoreError;
use thiserror::Error;

/// Errors that can occur during node and testnet operations.
#[derive(Debug, Error)]
pub enum DhtError {
    /// Encoding, key or address error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Network, lookup or replication error.
    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError),

    /// The node was destroyed.
    #[error("node destroyed: {0}")]
    Destroyed(PeerAddr),
}

impl DhtError {
    /// No target could be reached for a put or get.
    pub fn is_network_unavailable(&self) -> bool {
        matches!(self, DhtError::Rpc(RpcError::NetworkUnavailable(_)))
    }

    /// The value could not be encoded (too large).
    pub fn is_encoding(&self) -> bool {
        match self {
            DhtError::Core(e) => e.is_encoding(),
            DhtError::Rpc(RpcError::Core(e)) => e.is_encoding(),
            _ => false,
        }
    }
}

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, DhtError>;
