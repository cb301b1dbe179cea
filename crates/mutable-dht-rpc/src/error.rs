//! Error types for the RPC module.

use thiserror::Error;

use mutable_dht_core::PeerAddr;

use crate::messages::RpcErrorCode;

/// Errors that can occur during RPC, lookup and replication.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Protocol version mismatch with peer.
    #[error("protocol version mismatch: local={local}, peer={peer}")]
    VersionMismatch { local: u8, peer: u8 },

    /// Message could not be encoded or decoded.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Message exceeds the size limit.
    #[error("message too large: {len} bytes exceeds {max}")]
    MessageTooLarge { len: usize, max: usize },

    /// Nothing is listening at the address.
    #[error("peer unreachable: {0}")]
    PeerUnreachable(PeerAddr),

    /// Timeout waiting for peer.
    #[error("timeout waiting for {0}")]
    Timeout(PeerAddr),

    /// Address is already bound.
    #[error("address in use: {0}")]
    AddrInUse(PeerAddr),

    /// Peer answered with an error.
    #[error("peer error ({code:?}): {message}")]
    PeerError { code: RpcErrorCode, message: String },

    /// Peer answered with the wrong response kind.
    #[error("unexpected response to {0}")]
    UnexpectedResponse(&'static str),

    /// No target could be reached for a put or get.
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// Encoding or signing failed.
    #[error("core error: {0}")]
    Core(#[from] mutable_dht_core::CoreError),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] mutable_dht_store::StoreError),
}

/// Result type for RPC operations.
pub type Result<T> = std::result::Result<T, RpcError>;
