//! # Mutable DHT Store
//!
//! Per-node storage for mutable records, keyed by public key. Holds the
//! single highest-sequence record accepted for each key.
//!
//! ## Key Types
//!
//! - [`RecordStore`] - The compare-and-swap trait every backend implements
//! - [`MemoryStore`] - In-memory storage with per-key locking
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MutableRecords`] - The accept path: verify, then compare-and-swap
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mutable_dht_core::SchemeId;
//! use mutable_dht_store::{MemoryStore, MutableRecords};
//!
//! let records = MutableRecords::new(Arc::new(MemoryStore::new()), SchemeId::Dalek);
//! // let outcome = records.put(&record, None)?;
//! ```
//!
//! ## Design Notes
//!
//! - **Verify before accept**: nothing reaches a store without a valid signature
//! - **Strictly greater wins**: stale and replayed puts are silent no-ops
//! - **First writer wins** at a given sequence number

pub mod accept;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use accept::{MutableRecords, PutOutcome};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{decide, InsertResult, RecordStore, StoredEntry};
