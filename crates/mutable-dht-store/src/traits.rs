//! RecordStore trait: the abstract interface for mutable record persistence.
//!
//! Implementations include in-memory (default for nodes and tests) and
//! SQLite (persistent). Both apply the same compare-and-swap rule through
//! [`decide`], so they cannot drift apart.

use mutable_dht_core::{PeerAddr, PublicKey, Record};

use crate::error::Result;

/// Result of offering a record to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// The record replaced the previous one (or was the first).
    Inserted {
        /// Sequence of the replaced record, if any.
        previous_seq: Option<u64>,
    },
    /// The identical record is already stored (idempotent - not an error).
    AlreadyExists,
    /// A different record already holds this sequence number. First writer
    /// wins; nothing changes.
    SequenceReused {
        /// The contested sequence number.
        seq: u64,
    },
    /// The stored record has a higher sequence number.
    Stale {
        /// The stored sequence number.
        current_seq: u64,
    },
}

impl InsertResult {
    /// Whether the store now holds the offered record as a new write.
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertResult::Inserted { .. })
    }
}

/// The record held for one public key, with diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    /// Highest-sequence record accepted for this key.
    pub record: Record,

    /// Peer that most recently delivered this record. Not an authority.
    pub confirmed_by: Option<PeerAddr>,

    /// Local time of the last write or confirmation (Unix ms).
    pub updated_at: i64,
}

/// The RecordStore trait: per-key compare-and-swap over signed records.
///
/// Callers verify signatures before calling [`RecordStore::compare_and_swap`];
/// the store only orders by sequence number.
///
/// # Design Notes
///
/// - **Strictly greater wins**: a record replaces the stored one only if its
///   sequence is strictly greater.
/// - **Idempotent writes**: offering the stored record again returns
///   `AlreadyExists` and refreshes `confirmed_by`.
/// - **Per-key serialization**: concurrent writers to one key are serialized;
///   writers to different keys do not contend.
pub trait RecordStore: Send + Sync {
    /// Offer a record; store it if its sequence is higher than the current one.
    fn compare_and_swap(&self, record: &Record, from: Option<&PeerAddr>) -> Result<InsertResult>;

    /// Get the stored entry for a public key.
    fn get(&self, public_key: &PublicKey) -> Result<Option<StoredEntry>>;

    /// Number of public keys with a stored record.
    fn len(&self) -> Result<usize>;

    /// Whether no record is stored.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Every public key with a stored record, in no particular order.
    fn public_keys(&self) -> Result<Vec<PublicKey>>;
}

/// Decide what offering `incoming` over `current` does.
pub fn decide(current: Option<&Record>, incoming: &Record) -> InsertResult {
    match current {
        None => InsertResult::Inserted { previous_seq: None },
        Some(current) if incoming.seq > current.seq => InsertResult::Inserted {
            previous_seq: Some(current.seq),
        },
        Some(current) if incoming.seq == current.seq => {
            if current.value == incoming.value && current.signature == incoming.signature {
                InsertResult::AlreadyExists
            } else {
                InsertResult::SequenceReused { seq: current.seq }
            }
        }
        Some(current) => InsertResult::Stale {
            current_seq: current.seq,
        },
    }
}

/// Get current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use mutable_dht_core::Signature;

    fn record(seq: u64, value: &'static [u8]) -> Record {
        Record {
            public_key: PublicKey::from_bytes([1; 32]),
            seq,
            value: Bytes::from_static(value),
            signature: Signature::ZERO,
        }
    }

    #[test]
    fn test_decide_table() {
        let r1 = record(1, b"a");

        assert_eq!(
            decide(None, &r1),
            InsertResult::Inserted { previous_seq: None }
        );
        assert_eq!(
            decide(Some(&r1), &record(2, b"b")),
            InsertResult::Inserted {
                previous_seq: Some(1)
            }
        );
        assert_eq!(decide(Some(&r1), &r1), InsertResult::AlreadyExists);
        assert_eq!(
            decide(Some(&r1), &record(1, b"other")),
            InsertResult::SequenceReused { seq: 1 }
        );
        assert_eq!(
            decide(Some(&record(5, b"x")), &r1),
            InsertResult::Stale { current_seq: 5 }
        );
    }
}
