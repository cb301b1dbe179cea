//! Golden vectors: every backend must reproduce the same namespaces,
//! signables and signatures byte for byte.

use mutable_dht::core::{Namespaces, SchemeId};
use mutable_dht::{PutOutcome, Testnet, TestnetConfig};
use mutable_dht_testkit::vectors::{
    all_vectors, check_namespaces, check_vector, key_pair, public_key, record_from_vector,
};

#[test]
fn test_namespaces() {
    check_namespaces().unwrap();
}

#[test]
fn test_vectors_dalek() {
    for vector in all_vectors() {
        check_vector(SchemeId::Dalek, &vector).unwrap();
    }
}

#[test]
fn test_vectors_reference() {
    for vector in all_vectors() {
        check_vector(SchemeId::Reference, &vector).unwrap();
    }
}

#[test]
fn test_backends_agree_on_key_pair() {
    let a = key_pair(SchemeId::Dalek);
    let b = key_pair(SchemeId::Reference);
    assert_eq!(a.public_key(), b.public_key());
    assert_eq!(a.secret_key.as_bytes(), b.secret_key.as_bytes());
    assert_eq!(a.public_key(), public_key());
}

#[test]
fn test_golden_records_cross_verify() {
    let ns = Namespaces::standard().mutable_put;
    for vector in all_vectors() {
        let record = record_from_vector(SchemeId::Dalek, &vector);
        for verifier in SchemeId::ALL {
            assert!(
                record.verify(verifier.scheme(), &ns),
                "{} rejected by {}",
                vector.name,
                verifier.as_str()
            );
        }
    }
}

#[tokio::test]
async fn test_golden_record_stored_by_node() {
    let testnet = Testnet::create(1, TestnetConfig::default()).await.unwrap();
    let node = &testnet.nodes()[0];

    let vector = &all_vectors()[0];
    let record = record_from_vector(node.scheme(), vector);
    assert_eq!(
        node.records().put(&record, None).unwrap(),
        PutOutcome::Accepted
    );
    let stored = node.records().get(&public_key()).unwrap().unwrap();
    assert_eq!(stored, record);
    assert_eq!(hex::encode(stored.signature.as_bytes()), vector.signature);

    testnet.destroy().await.unwrap();
}
