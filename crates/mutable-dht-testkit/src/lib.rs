//! # Mutable DHT Testkit
//!
//! Testing utilities for mutable-dht.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: namespaces, signables and signatures with known
//!   outputs, for checking any implementation byte for byte
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Key pairs and signed records for test scenarios
//!
//! ## Golden Vectors
//!
//! ```rust
//! use mutable_dht_core::SchemeId;
//! use mutable_dht_testkit::vectors::{all_vectors, check_vector};
//!
//! for scheme in SchemeId::ALL {
//!     for vector in all_vectors() {
//!         check_vector(scheme, &vector).unwrap();
//!     }
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use mutable_dht_testkit::generators::{record_from_params, RecordParams};
//!
//! proptest! {
//!     #[test]
//!     fn signed_records_verify(params: RecordParams) {
//!         let record = record_from_params(&params);
//!         prop_assert!(record.verify(params.scheme.scheme(), &params.namespace()));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use mutable_dht_core::SchemeId;
//! use mutable_dht_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new(SchemeId::Dalek);
//! let record = fixture.record(0, b"initial data");
//! assert!(fixture.verifies(&record));
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, TestFixture};
