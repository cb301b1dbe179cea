//! RPC message types and their CBOR codec.
//!
//! Every exchange is one request envelope answered by one response envelope.
//! A sender never reports its own node id: receivers derive it from the
//! advertised address.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use mutable_dht_core::{Blake3Hash, PeerAddr, PublicKey, Record};
use mutable_dht_store::PutOutcome;

use crate::error::{Result, RpcError};

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Message size limits.
pub mod limits {
    pub use mutable_dht_core::MAX_VALUE_LEN;

    /// Max encoded size of any envelope.
    pub const MAX_MESSAGE_SIZE: usize = 16 * 1024;
    /// Max addresses in a `Nodes` response.
    pub const MAX_CLOSER_NODES: usize = 64;
    /// Max length of an advertised host name.
    pub const MAX_HOST_LEN: usize = 253;
}

/// Requests a node can answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Liveness probe.
    Ping,

    /// Ask for the peers closest to a target.
    FindNode {
        /// Target key.
        target: Blake3Hash,
    },

    /// Offer a signed record for storage.
    MutablePut {
        /// The record.
        record: Record,
    },

    /// Ask for the stored record of a public key.
    MutableGet {
        /// Whose record.
        public_key: PublicKey,
        /// Only answer with a record whose sequence is at least this.
        seq: u64,
    },
}

impl Request {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Ping => "ping",
            Request::FindNode { .. } => "find_node",
            Request::MutablePut { .. } => "mutable_put",
            Request::MutableGet { .. } => "mutable_get",
        }
    }
}

/// A request with its sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Protocol version of the sender.
    pub version: u8,
    /// Address the sender is reachable at.
    pub from: PeerAddr,
    /// Ephemeral senders must not be added to routing tables.
    pub ephemeral: bool,
    /// The request.
    pub request: Request,
}

impl RequestEnvelope {
    /// Wrap a request at the current protocol version.
    pub fn new(from: PeerAddr, ephemeral: bool, request: Request) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            from,
            ephemeral,
            request,
        }
    }

    /// Check if this envelope respects size limits.
    pub fn validate_limits(&self) -> std::result::Result<(), &'static str> {
        if self.from.host.is_empty() || self.from.host.len() > limits::MAX_HOST_LEN {
            return Err("invalid sender host");
        }
        if let Request::MutablePut { record } = &self.request {
            if record.value.len() > limits::MAX_VALUE_LEN {
                return Err("value too large");
            }
        }
        Ok(())
    }
}

/// Answers to requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Answer to `Ping`.
    Pong,

    /// Answer to `FindNode`, closest first.
    Nodes {
        /// Closer peers known to the responder.
        closer: Vec<PeerAddr>,
    },

    /// Answer to `MutablePut`.
    Stored {
        /// What the responder's store did with the record.
        outcome: PutOutcome,
    },

    /// Answer to `MutableGet`.
    Value {
        /// The stored record, if any satisfies the request.
        record: Option<Record>,
    },

    /// Error condition.
    Error {
        /// Error code for programmatic handling.
        code: RpcErrorCode,
        /// Human-readable description.
        message: String,
    },
}

impl Response {
    /// Build an error response.
    pub fn error(code: RpcErrorCode, message: impl Into<String>) -> Self {
        Response::Error {
            code,
            message: message.into(),
        }
    }

    /// Check if this response respects size limits.
    pub fn validate_limits(&self) -> std::result::Result<(), &'static str> {
        match self {
            Response::Nodes { closer } if closer.len() > limits::MAX_CLOSER_NODES => {
                Err("too many closer nodes")
            }
            Response::Value {
                record: Some(record),
            } if record.value.len() > limits::MAX_VALUE_LEN => Err("value too large"),
            _ => Ok(()),
        }
    }
}

/// A response with the responder's protocol version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Protocol version of the responder.
    pub version: u8,
    /// The response.
    pub response: Response,
}

impl ResponseEnvelope {
    /// Wrap a response at the current protocol version.
    pub fn new(response: Response) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            response,
        }
    }
}

/// Error codes for the RPC protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum RpcErrorCode {
    /// Unknown/unspecified error.
    Unknown = 0,
    /// Protocol version mismatch.
    VersionMismatch = 1,
    /// Message too large.
    MessageTooLarge = 2,
    /// Invalid message format.
    InvalidMessage = 3,
    /// Record value exceeds the size limit.
    ValueTooLarge = 4,
    /// Internal error on peer.
    InternalError = 5,
}

/// Encode a message as CBOR.
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(message, &mut buf)
        .map_err(|e| RpcError::InvalidMessage(format!("encode failed: {}", e)))?;
    if buf.len() > limits::MAX_MESSAGE_SIZE {
        return Err(RpcError::MessageTooLarge {
            len: buf.len(),
            max: limits::MAX_MESSAGE_SIZE,
        });
    }
    Ok(buf)
}

/// Decode a CBOR message, rejecting oversized input before parsing.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    if bytes.len() > limits::MAX_MESSAGE_SIZE {
        return Err(RpcError::MessageTooLarge {
            len: bytes.len(),
            max: limits::MAX_MESSAGE_SIZE,
        });
    }
    ciborium::from_reader(bytes).map_err(|e| RpcError::InvalidMessage(format!("decode failed: {}", e)))
}
