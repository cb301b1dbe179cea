//! In-memory implementation of the RecordStore trait.
//!
//! The outer map is only locked to find or create a key's slot. The
//! compare-and-swap itself runs under the slot's own mutex, so writers to
//! different keys never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use mutable_dht_core::{PeerAddr, PublicKey, Record};

use crate::error::{Result, StoreError};
use crate::traits::{decide, now_millis, InsertResult, RecordStore, StoredEntry};

type Slot = Arc<Mutex<Option<StoredEntry>>>;

/// In-memory store implementation.
///
/// All data is lost when the store is dropped.
#[derive(Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<PublicKey, Slot>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn existing_slot(&self, public_key: &PublicKey) -> Result<Option<Slot>> {
        let slots = self.slots.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(slots.get(public_key).cloned())
    }

    fn slot(&self, public_key: &PublicKey) -> Result<Slot> {
        if let Some(slot) = self.existing_slot(public_key)? {
            return Ok(slot);
        }
        let mut slots = self.slots.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(slots.entry(*public_key).or_default().clone())
    }

    fn occupied(&self) -> Result<Vec<(PublicKey, Slot)>> {
        let slots = self.slots.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(slots.iter().map(|(k, s)| (*k, s.clone())).collect())
    }
}

impl RecordStore for MemoryStore {
    fn compare_and_swap(&self, record: &Record, from: Option<&PeerAddr>) -> Result<InsertResult> {
        let slot = self.slot(&record.public_key)?;
        let mut entry = slot.lock().map_err(|_| StoreError::LockPoisoned)?;

        let result = decide(entry.as_ref().map(|e| &e.record), record);
        match &result {
            InsertResult::Inserted { .. } => {
                *entry = Some(StoredEntry {
                    record: record.clone(),
                    confirmed_by: from.cloned(),
                    updated_at: now_millis(),
                });
            }
            InsertResult::AlreadyExists => {
                if let Some(entry) = entry.as_mut() {
                    if from.is_some() {
                        entry.confirmed_by = from.cloned();
                    }
                    entry.updated_at = now_millis();
                }
            }
            InsertResult::SequenceReused { .. } | InsertResult::Stale { .. } => {}
        }

        Ok(result)
    }

    fn get(&self, public_key: &PublicKey) -> Result<Option<StoredEntry>> {
        let Some(slot) = self.existing_slot(public_key)? else {
            return Ok(None);
        };
        let entry = slot.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entry.clone())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.public_keys()?.len())
    }

    fn public_keys(&self) -> Result<Vec<PublicKey>> {
        let mut keys = Vec::new();
        for (key, slot) in self.occupied()? {
            if slot.lock().map_err(|_| StoreError::LockPoisoned)?.is_some() {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mutable_dht_core::{KeyPair, Namespaces, SchemeId};
    use proptest::prelude::*;
    use std::thread;

    fn sign(kp: &KeyPair, seq: u64, value: &[u8]) -> Record {
        Record::sign(
            SchemeId::Dalek.scheme(),
            kp,
            &Namespaces::standard().mutable_put,
            seq,
            value.to_vec(),
        )
        .unwrap()
    }

    #[test]
    fn test_memory_store_basic() {
        let store = MemoryStore::new();
        let kp = SchemeId::Dalek.scheme().generate_key_pair(None);
        assert!(store.get(&kp.public_key).unwrap().is_none());
        assert!(store.is_empty().unwrap());

        let r0 = sign(&kp, 0, b"first");
        let result = store.compare_and_swap(&r0, None).unwrap();
        assert_eq!(result, InsertResult::Inserted { previous_seq: None });

        let entry = store.get(&kp.public_key).unwrap().unwrap();
        assert_eq!(entry.record, r0);
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.public_keys().unwrap(), vec![kp.public_key]);
    }

    #[test]
    fn test_memory_store_monotonic() {
        let store = MemoryStore::new();
        let kp = SchemeId::Dalek.scheme().generate_key_pair(None);
        let r0 = sign(&kp, 0, b"old");
        let r2 = sign(&kp, 2, b"new");

        store.compare_and_swap(&r0, None).unwrap();
        assert_eq!(
            store.compare_and_swap(&r2, None).unwrap(),
            InsertResult::Inserted {
                previous_seq: Some(0)
            }
        );
        assert_eq!(
            store.compare_and_swap(&r0, None).unwrap(),
            InsertResult::Stale { current_seq: 2 }
        );
        assert_eq!(store.get(&kp.public_key).unwrap().unwrap().record, r2);
    }

    #[test]
    fn test_memory_store_idempotent_refreshes_confirmation() {
        let store = MemoryStore::new();
        let kp = SchemeId::Dalek.scheme().generate_key_pair(None);
        let r = sign(&kp, 1, b"v");
        let a = PeerAddr::new("127.0.0.1", 1);
        let b = PeerAddr::new("127.0.0.1", 2);

        store.compare_and_swap(&r, Some(&a)).unwrap();
        assert_eq!(
            store.compare_and_swap(&r, Some(&b)).unwrap(),
            InsertResult::AlreadyExists
        );
        assert_eq!(
            store.get(&kp.public_key).unwrap().unwrap().confirmed_by,
            Some(b)
        );
    }

    #[test]
    fn test_memory_store_first_writer_wins_at_same_seq() {
        let store = MemoryStore::new();
        let kp = SchemeId::Dalek.scheme().generate_key_pair(None);
        let first = sign(&kp, 4, b"first");
        let second = sign(&kp, 4, b"second");

        store.compare_and_swap(&first, None).unwrap();
        assert_eq!(
            store.compare_and_swap(&second, None).unwrap(),
            InsertResult::SequenceReused { seq: 4 }
        );
        assert_eq!(store.get(&kp.public_key).unwrap().unwrap().record, first);
    }

    #[test]
    fn test_concurrent_writers_keep_highest() {
        let store = Arc::new(MemoryStore::new());
        let kp = SchemeId::Dalek.scheme().generate_key_pair(None);
        let records: Vec<Record> = (0..64).map(|seq| sign(&kp, seq, b"racing")).collect();

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                let mine: Vec<Record> = records.iter().skip(t).step_by(8).rev().cloned().collect();
                thread::spawn(move || {
                    for record in mine {
                        store.compare_and_swap(&record, None).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get(&kp.public_key).unwrap().unwrap().record.seq, 63);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn store_holds_max_of_any_order(seqs in prop::collection::vec(0u64..1000, 1..20)) {
            let store = MemoryStore::new();
            let kp = SchemeId::Dalek.scheme().generate_key_pair(Some(&[5; 32]));
            for seq in &seqs {
                store.compare_and_swap(&sign(&kp, *seq, b"p"), None).unwrap();
            }
            let max = seqs.iter().copied().max().unwrap();
            prop_assert_eq!(store.get(&kp.public_key).unwrap().unwrap().record.seq, max);
        }
    }
}
