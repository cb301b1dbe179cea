//! # Mutable DHT RPC
//!
//! The network side of mutable records: wire messages, transport, routing,
//! iterative lookup, request handling and put/get replication.
//!
//! ## Overview
//!
//! A put computes the target `Blake3(public_key)`, finds the closest live
//! nodes with an iterative lookup, signs once, and offers the identical
//! record to every target. A get asks the same targets and keeps the
//! highest-sequence record that verifies locally.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mutable_dht_rpc::{GetOptions, PutOptions, Replicator};
//!
//! async fn example(replicator: Replicator, key_pair: mutable_dht_core::KeyPair) {
//!     let put = replicator.put(&key_pair, &b"hello"[..], PutOptions::default()).await;
//!     let got = replicator.get(&key_pair.public_key, GetOptions::default()).await;
//! }
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! Writer                              Closest nodes
//!   |-------- FindNode (iterative) --->|
//!   |<------- Nodes -------------------|
//!   |-------- MutablePut ------------->|  (verify, then compare-and-swap)
//!   |<------- Stored ------------------|
//!
//! Reader
//!   |-------- MutableGet ------------->|
//!   |<------- Value -------------------|  (verify, keep highest seq)
//! ```

pub mod client;
pub mod error;
pub mod handler;
pub mod lookup;
pub mod messages;
pub mod replication;
pub mod routing;
pub mod transport;

pub use client::RpcClient;
pub use error::{Result, RpcError};
pub use handler::{serve, RequestHandler};
pub use lookup::{closest_nodes, LookupConfig};
pub use messages::{
    limits, Request, RequestEnvelope, Response, ResponseEnvelope, RpcErrorCode, PROTOCOL_VERSION,
};
pub use replication::{GetOptions, GetResult, PutOptions, PutResult, Replicator};
pub use routing::{RoutingTable, DEFAULT_K};
pub use transport::{
    memory::{MemoryListener, MemoryNetwork, MemoryTransport},
    Transport,
};
