//! Record: a signed mutable value.
//!
//! A record binds `(seq, value)` to a public key. Any node may hold a copy,
//! but only the holder of the matching secret key can produce one that
//! verifies.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::crypto::{KeyPair, PublicKey, Signature};
use crate::error::{CoreError, Result};
use crate::scheme::SignatureScheme;
use crate::signable::{signable, Namespace, Signable};

/// Maximum length of a mutable value in bytes.
pub const MAX_VALUE_LEN: usize = 1000;

/// Check a value length against [`MAX_VALUE_LEN`].
pub fn check_value_len(len: usize) -> Result<()> {
    if len > MAX_VALUE_LEN {
        return Err(CoreError::ValueTooLarge {
            len,
            max: MAX_VALUE_LEN,
        });
    }
    Ok(())
}

/// A signed mutable record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// The writer's public key.
    pub public_key: PublicKey,

    /// Sequence number. Higher wins.
    pub seq: u64,

    /// The value bytes.
    pub value: Bytes,

    /// Signature over `signable(namespace, seq, value)`.
    pub signature: Signature,
}

impl Record {
    /// Build and sign a record.
    ///
    /// Fails with an encoding-class error if the value is too large, before
    /// any signing takes place.
    pub fn sign(
        scheme: &dyn SignatureScheme,
        key_pair: &KeyPair,
        namespace: &Namespace,
        seq: u64,
        value: impl Into<Bytes>,
    ) -> Result<Self> {
        let value = value.into();
        check_value_len(value.len())?;

        if key_pair.secret_key.public_half() != key_pair.public_key {
            return Err(CoreError::InvalidSecretKey);
        }

        let signature = scheme.sign(&signable(namespace, seq, &value), &key_pair.secret_key)?;
        Ok(Self {
            public_key: key_pair.public_key,
            seq,
            value,
            signature,
        })
    }

    /// Recompute the signable this record's signature must cover.
    pub fn signable(&self, namespace: &Namespace) -> Signable {
        signable(namespace, self.seq, &self.value)
    }

    /// Verify the signature. Returns `false` for any malformed input.
    pub fn verify(&self, scheme: &dyn SignatureScheme, namespace: &Namespace) -> bool {
        if self.value.len() > MAX_VALUE_LEN {
            return false;
        }
        scheme.verify(
            &self.signable(namespace),
            &self.signature,
            self.public_key.as_bytes(),
        )
    }

    /// The DHT key this record is stored under.
    pub fn target(&self) -> crate::crypto::Blake3Hash {
        self.public_key.target()
    }
}
