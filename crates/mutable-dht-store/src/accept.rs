//! The accept path: verify, then compare-and-swap.
//!
//! The verifying node neither knows nor needs to know which backend
//! produced a signature; it verifies with its own configured scheme.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use mutable_dht_core::{Namespace, Namespaces, PeerAddr, PublicKey, Record, SchemeId};

use crate::error::Result;
use crate::traits::{InsertResult, RecordStore, StoredEntry};

/// What happened to an offered record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PutOutcome {
    /// Stored as the new latest record.
    Accepted,
    /// Already held, or another record already holds this sequence number.
    Duplicate,
    /// A higher sequence number is already stored.
    Stale { current_seq: u64 },
    /// The signature did not verify. Nothing changed.
    InvalidSignature,
}

impl PutOutcome {
    /// Whether the record was newly stored.
    pub fn is_accepted(&self) -> bool {
        matches!(self, PutOutcome::Accepted)
    }
}

impl From<InsertResult> for PutOutcome {
    fn from(result: InsertResult) -> Self {
        match result {
            InsertResult::Inserted { .. } => PutOutcome::Accepted,
            InsertResult::AlreadyExists | InsertResult::SequenceReused { .. } => {
                PutOutcome::Duplicate
            }
            InsertResult::Stale { current_seq } => PutOutcome::Stale { current_seq },
        }
    }
}

/// A node's mutable record table: a store plus the scheme that guards it.
#[derive(Clone)]
pub struct MutableRecords {
    store: Arc<dyn RecordStore>,
    scheme: SchemeId,
    namespace: Namespace,
}

impl MutableRecords {
    /// Guard `store` with `scheme` under the standard mutable-put namespace.
    pub fn new(store: Arc<dyn RecordStore>, scheme: SchemeId) -> Self {
        Self::with_namespace(store, scheme, Namespaces::standard().mutable_put)
    }

    /// Guard `store` with `scheme` under an explicit namespace.
    pub fn with_namespace(store: Arc<dyn RecordStore>, scheme: SchemeId, namespace: Namespace) -> Self {
        Self {
            store,
            scheme,
            namespace,
        }
    }

    /// The verifying scheme.
    pub fn scheme(&self) -> SchemeId {
        self.scheme
    }

    /// The namespace records are verified under.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Offer a record. Invalid signatures never reach the store.
    pub fn put(&self, record: &Record, from: Option<&PeerAddr>) -> Result<PutOutcome> {
        if !record.verify(self.scheme.scheme(), &self.namespace) {
            warn!(
                public_key = %record.public_key,
                seq = record.seq,
                from = ?from,
                "rejected record with invalid signature"
            );
            return Ok(PutOutcome::InvalidSignature);
        }

        let result = self.store.compare_and_swap(record, from)?;
        debug!(
            public_key = %record.public_key,
            seq = record.seq,
            result = ?result,
            "offered mutable record"
        );
        Ok(result.into())
    }

    /// The latest accepted record for a public key.
    pub fn get(&self, public_key: &PublicKey) -> Result<Option<Record>> {
        Ok(self.store.get(public_key)?.map(|entry| entry.record))
    }

    /// The latest accepted record with its diagnostics.
    pub fn entry(&self, public_key: &PublicKey) -> Result<Option<StoredEntry>> {
        self.store.get(public_key)
    }

    /// Number of public keys with a stored record.
    pub fn len(&self) -> Result<usize> {
        self.store.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> Result<bool> {
        self.store.is_empty()
    }
}
