//! Signable construction for mutable records.
//!
//! A signable is the exact 64-byte buffer handed to a signature scheme:
//!
//! ```text
//! namespace (32 bytes) ‖ Blake3(canonical(seq, value)) (32 bytes)
//! ```
//!
//! The canonical encoding (version 1) is:
//! - `uint(seq)`
//! - `uint(len(value))`
//! - `value`
//!
//! where `uint(n)` is a single byte for `n < 0xfd`, otherwise a marker byte
//! (`0xfd`, `0xfe`, `0xff`) followed by a little-endian `u16`, `u32` or `u64`.
//! The smallest form is always used, and every field is self-delimiting, so no
//! two `(seq, value)` pairs share an encoding.
//!
//! **CRITICAL**: This encoding is FROZEN. Changes break every stored signature.

use std::fmt;
use std::sync::OnceLock;

use crate::crypto::Blake3Hash;

/// Version of the canonical `(seq, value)` encoding.
pub const ENCODING_VERSION: u8 = 1;

/// Blake3 key-derivation context for namespace tags.
pub const NAMESPACE_CONTEXT: &str = "mutable-dht 2026-01-01 signable namespace";

/// Length of a signable buffer.
pub const SIGNABLE_LEN: usize = 64;

/// A 32-byte domain-separation tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Namespace(pub [u8; 32]);

impl Namespace {
    /// Derive the tag for a named operation kind.
    pub fn derive(name: &str) -> Self {
        Self(blake3::derive_key(NAMESPACE_CONTEXT, name.as_bytes()))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Namespace({})", &hex::encode(self.0)[..16])
    }
}

/// The namespace tags of every signed message kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Namespaces {
    pub mutable_put: Namespace,
    pub immutable_put: Namespace,
    pub announce: Namespace,
}

impl Namespaces {
    /// Derive the tag set from scratch.
    pub fn derive() -> Self {
        Self {
            mutable_put: Namespace::derive("mutable-put"),
            immutable_put: Namespace::derive("immutable-put"),
            announce: Namespace::derive("announce"),
        }
    }

    /// The process-wide tag set, derived once on first use.
    pub fn standard() -> &'static Namespaces {
        static NAMESPACES: OnceLock<Namespaces> = OnceLock::new();
        NAMESPACES.get_or_init(Namespaces::derive)
    }
}

/// The 64-byte buffer that gets signed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signable(pub [u8; SIGNABLE_LEN]);

impl Signable {
    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; SIGNABLE_LEN] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The namespace half.
    pub fn namespace(&self) -> &[u8] {
        &self.0[..32]
    }

    /// The payload hash half.
    pub fn payload_hash(&self) -> Blake3Hash {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.0[32..]);
        Blake3Hash(out)
    }
}

impl fmt::Debug for Signable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signable({}...)", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Signable {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Build the signable for `(seq, value)` under `namespace`.
pub fn signable(namespace: &Namespace, seq: u64, value: &[u8]) -> Signable {
    let encoded = encode_mutable(seq, value);
    let hash = Blake3Hash::hash(&encoded);

    let mut buf = [0u8; SIGNABLE_LEN];
    buf[..32].copy_from_slice(namespace.as_bytes());
    buf[32..].copy_from_slice(hash.as_bytes());
    Signable(buf)
}

/// Canonically encode `(seq, value)`.
pub fn encode_mutable(seq: u64, value: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(uint_len(seq) + uint_len(value.len() as u64) + value.len());
    encode_uint(&mut buf, seq);
    encode_uint(&mut buf, value.len() as u64);
    buf.extend_from_slice(value);
    buf
}

/// Encode an unsigned integer in its smallest form.
fn encode_uint(buf: &mut Vec<u8>, n: u64) {
    if n < 0xfd {
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(n as u16).to_le_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(0xfe);
        buf.extend_from_slice(&(n as u32).to_le_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&n.to_le_bytes());
    }
}

fn uint_len(n: u64) -> usize {
    if n < 0xfd {
        1
    } else if n <= 0xffff {
        3
    } else if n <= 0xffff_ffff {
        5
    } else {
        9
    }
}
