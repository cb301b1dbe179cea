//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use bytes::Bytes;
use mutable_dht_core::{
    KeyPair, Namespace, Namespaces, PublicKey, Record, SchemeId, Signature,
};
use mutable_dht_store::{MemoryStore, MutableRecords};

/// A key pair bound to one backend.
pub struct TestFixture {
    pub scheme: SchemeId,
    pub key_pair: KeyPair,
}

impl TestFixture {
    /// Create a fixture with a random key pair.
    pub fn new(scheme: SchemeId) -> Self {
        Self {
            scheme,
            key_pair: scheme.scheme().generate_key_pair(None),
        }
    }

    /// Create with a deterministic key pair from seed.
    pub fn with_seed(scheme: SchemeId, seed: [u8; 32]) -> Self {
        Self {
            scheme,
            key_pair: scheme.scheme().generate_key_pair(Some(&seed)),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.key_pair.public_key()
    }

    /// The namespace records are signed under.
    pub fn namespace(&self) -> Namespace {
        Namespaces::standard().mutable_put
    }

    /// A signed record.
    ///
    /// # Panics
    ///
    /// If `value` is longer than the value limit.
    pub fn record(&self, seq: u64, value: &[u8]) -> Record {
        Record::sign(
            self.scheme.scheme(),
            &self.key_pair,
            &self.namespace(),
            seq,
            Bytes::copy_from_slice(value),
        )
        .expect("fixture value within limit")
    }

    /// A record claiming this fixture's key, signed by someone else.
    pub fn forged(&self, seq: u64, value: &[u8]) -> Record {
        let other = TestFixture::new(self.scheme);
        Record {
            public_key: self.public_key(),
            ..other.record(seq, value)
        }
    }

    /// A valid record with one bit of the signature flipped.
    pub fn tampered(&self, seq: u64, value: &[u8]) -> Record {
        let mut record = self.record(seq, value);
        let mut bytes = *record.signature.as_bytes();
        bytes[0] ^= 0x01;
        record.signature = Signature::from_bytes(bytes);
        record
    }

    /// Whether `record` verifies under this fixture's backend.
    pub fn verifies(&self, record: &Record) -> bool {
        record.verify(self.scheme.scheme(), &self.namespace())
    }

    /// An empty in-memory record table verifying with this fixture's backend.
    pub fn records(&self) -> MutableRecords {
        MutableRecords::new(Arc::new(MemoryStore::new()), self.scheme)
    }
}

/// One deterministic fixture per party, backends alternating.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[1] = (i >> 8) as u8;
            TestFixture::with_seed(SchemeId::ALL[i % SchemeId::ALL.len()], seed)
        })
        .collect()
}
