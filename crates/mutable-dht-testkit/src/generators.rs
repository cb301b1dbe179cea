//! Proptest generators for property-based testing.

use proptest::prelude::*;

use mutable_dht_core::{
    KeyPair, Namespace, Namespaces, PeerAddr, PublicKey, Record, SchemeId, MAX_VALUE_LEN,
};

/// Generate a backend.
pub fn scheme_id() -> impl Strategy<Value = SchemeId> {
    prop_oneof![Just(SchemeId::Dalek), Just(SchemeId::Reference)]
}

/// Generate a key pair from a random seed.
pub fn key_pair(scheme: SchemeId) -> impl Strategy<Value = KeyPair> {
    any::<[u8; 32]>().prop_map(move |seed| scheme.scheme().generate_key_pair(Some(&seed)))
}

/// Generate an arbitrary 32-byte public key, which may not be a valid point.
pub fn raw_public_key() -> impl Strategy<Value = PublicKey> {
    any::<[u8; 32]>().prop_map(PublicKey::from_bytes)
}

/// Generate a sequence number, biased toward encoding width boundaries.
pub fn seq() -> impl Strategy<Value = u64> {
    prop_oneof![
        0u64..0x100,
        Just(0xfc),
        Just(0xfd),
        Just(0xffff),
        Just(0x1_0000),
        Just(0xffff_ffff),
        Just(0x1_0000_0000),
        Just(u64::MAX),
        any::<u64>(),
    ]
}

/// Generate value bytes within the limit.
pub fn value() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=MAX_VALUE_LEN)
}

/// Generate value bytes over the limit.
pub fn oversized_value() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), MAX_VALUE_LEN + 1..=MAX_VALUE_LEN * 2)
}

/// Generate a loopback peer address.
pub fn peer_addr() -> impl Strategy<Value = PeerAddr> {
    (1u16..=u16::MAX).prop_map(|port| PeerAddr::new("127.0.0.1", port))
}

/// Parameters for generating a record.
#[derive(Debug, Clone)]
pub struct RecordParams {
    pub scheme: SchemeId,
    pub seed: [u8; 32],
    pub seq: u64,
    pub value: Vec<u8>,
}

impl RecordParams {
    pub fn key_pair(&self) -> KeyPair {
        self.scheme.scheme().generate_key_pair(Some(&self.seed))
    }

    pub fn namespace(&self) -> Namespace {
        Namespaces::standard().mutable_put
    }
}

impl Arbitrary for RecordParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (scheme_id(), any::<[u8; 32]>(), seq(), value())
            .prop_map(|(scheme, seed, seq, value)| RecordParams {
                scheme,
                seed,
                seq,
                value,
            })
            .boxed()
    }
}

/// Sign a record from parameters.
pub fn record_from_params(params: &RecordParams) -> Record {
    Record::sign(
        params.scheme.scheme(),
        &params.key_pair(),
        &params.namespace(),
        params.seq,
        params.value.clone(),
    )
    .expect("generated value within limit")
}
