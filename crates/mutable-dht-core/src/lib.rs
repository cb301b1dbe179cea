//! # Mutable DHT Core
//!
//! Pure primitives for mutable DHT records: signables, signature schemes and
//! signed records.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Signable`] - The exact 64-byte buffer that gets signed
//! - [`Namespaces`] - Domain-separation tags, derived once per process
//! - [`SignatureScheme`] - Capability interface over interchangeable Ed25519 backends
//! - [`Record`] - A signed `(seq, value)` bound to a public key
//!
//! ## Interoperability
//!
//! Every backend in [`scheme`] implements the same Ed25519 over the same
//! signable, so a record signed by one verifies under any other.

pub mod crypto;
pub mod error;
pub mod record;
pub mod scheme;
mod serde_bytes;
pub mod signable;
pub mod types;

pub use crypto::{Blake3Hash, KeyPair, PublicKey, SecretKey, Signature};
pub use error::{CoreError, Result};
pub use record::{check_value_len, Record, MAX_VALUE_LEN};
pub use scheme::{DalekScheme, ReferenceScheme, SchemeId, SignatureScheme};
pub use signable::{encode_mutable, signable, Namespace, Namespaces, Signable};
pub use types::PeerAddr;
