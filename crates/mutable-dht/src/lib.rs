//! # Mutable DHT
//!
//! Signed, sequence-numbered mutable records on a Kademlia-style DHT.
//!
//! ## Overview
//!
//! - **Records**: a value signed under a public key, ordered by a sequence
//!   number. The highest sequence wins; equal or lower sequences are no-ops.
//! - **Backends**: two interoperable Ed25519 implementations. A record signed
//!   by one verifies under the other.
//! - **Replication**: a put goes to the nodes closest to `Blake3(public_key)`;
//!   a get asks the same nodes and keeps the highest verified sequence.
//! - **Testnets**: sequentially bootstrapped swarms on an in-process network.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mutable_dht::{GetOptions, PutOptions, Testnet, TestnetConfig};
//!
//! async fn example() -> mutable_dht::Result<()> {
//!     let testnet = Testnet::create(10, TestnetConfig::default()).await?;
//!     let writer = &testnet.nodes()[0];
//!     let reader = &testnet.nodes()[1];
//!
//!     let key_pair = writer.generate_key_pair(None);
//!     writer
//!         .put(&key_pair, &b"hello"[..], PutOptions::default())
//!         .await?;
//!
//!     let found = reader.get(&key_pair.public_key(), GetOptions::default()).await?;
//!     assert_eq!(found.map(|r| r.value.to_vec()), Some(b"hello".to_vec()));
//!
//!     testnet.destroy().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `mutable_dht::core` - Keys, signables, backends and records
//! - `mutable_dht::store` - Record storage and the accept rule
//! - `mutable_dht::rpc` - Messages, routing, lookup and replication

pub mod config;
pub mod error;
pub mod node;
pub mod testnet;

pub use mutable_dht_core as core;
pub use mutable_dht_rpc as rpc;
pub use mutable_dht_store as store;

pub use config::{NodeConfig, RoutingConfig, StoreConfig};
pub use error::{DhtError, Result};
pub use node::{DhtNode, Server};
pub use testnet::{TeardownReport, Testnet, TestnetConfig};

pub use mutable_dht_core::{
    KeyPair, PeerAddr, PublicKey, Record, SchemeId, SecretKey, Signature, MAX_VALUE_LEN,
};
pub use mutable_dht_rpc::{GetOptions, GetResult, MemoryNetwork, PutOptions, PutResult};
pub use mutable_dht_store::PutOutcome;
