//! Golden test vectors for deterministic verification.
//!
//! Every conforming implementation must produce identical namespaces,
//! signables and (deterministic Ed25519) signatures for these inputs.

use mutable_dht_core::{
    signable, KeyPair, Namespace, Namespaces, PublicKey, Record, SchemeId, Signature,
};
use serde::{Deserialize, Serialize};

/// Seed shared by the signature vectors.
pub const SEED: [u8; 32] = [0x42; 32];

/// Public key derived from [`SEED`].
pub const PUBLIC_KEY: &str = "2152f8d19b791d24453242e15f2eab6cb7cffa7b6a5ed30097960e069881db12";

/// `Blake3(PUBLIC_KEY)`, the replication target of the vectors' key.
pub const TARGET: &str = "fef6dfa48b073924c436539010d7812fbe50096ae82569fdad35f79628bc0084";

/// Expected namespace tags by name.
pub const NAMESPACES: [(&str, &str); 3] = [
    (
        "mutable-put",
        "5843a490b5ca57608de11d0345c4aa73cd9353250c65ef8b46f47a2505ef5b51",
    ),
    (
        "immutable-put",
        "c601054257239cf79d71b326d575061da8019ed24b7e9fc0ee1ff4fdec5ad3a8",
    ),
    (
        "announce",
        "20abe760a83cd67917a17307a4277c5534f03680171093ad8be80a5476891bfe",
    ),
];

/// A golden test vector under the `mutable-put` namespace.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Sequence number.
    pub seq: u64,
    /// Value bytes.
    pub value: &'static [u8],
    /// Leading bytes of the canonical encoding (hex).
    pub encoding_prefix: &'static str,
    /// Expected signable (hex).
    pub signable: &'static str,
    /// Expected signature by [`SEED`] (hex).
    pub signature: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "testing standard",
            seq: 0,
            value: b"testing standard",
            encoding_prefix: "0010",
            signable: "5843a490b5ca57608de11d0345c4aa73cd9353250c65ef8b46f47a2505ef5b51\
                       d7cc24413489d9de62b04a2b607d8a4d22a56be0c0d449b069ac0f9c943a5390",
            signature: "6a810c4e2f32343b5998d0d0c728551e78f8191c2001ab2080d8023aad0b61a4\
                        bed166e7bf06295f43d2e41b7b4f2f591371957fdebf22362e82be7f1e867103",
        },
        GoldenVector {
            name: "empty value",
            seq: 0,
            value: b"",
            encoding_prefix: "0000",
            signable: "5843a490b5ca57608de11d0345c4aa73cd9353250c65ef8b46f47a2505ef5b51\
                       1ad48f49627079d806b802c74f40c39d55fe1d78b3faf0f8017aec62cec42122",
            signature: "32009ee094c52597881ee76ae5fbd9d03dfaf5e4343835499334307f03414389\
                        53b083d2ba52a319b194ea4ef240affd5d1aeca0f45c902e5d37018486872a01",
        },
        GoldenVector {
            name: "second update",
            seq: 2,
            value: b"updated value",
            encoding_prefix: "020d",
            signable: "5843a490b5ca57608de11d0345c4aa73cd9353250c65ef8b46f47a2505ef5b51\
                       7708e75e1a891bd511a298332cc5b65d8be55731971d600ba0c4e229ff91e33d",
            signature: "3e4eb0ec7686f70848837241ca710fbe64692daa12e3fb38813e4cdda3fbbd93\
                        ecb65fd68f02e87306e376bb04a5b838678e33d067bac38be7f780c661152609",
        },
        GoldenVector {
            name: "two-byte sequence",
            seq: 0x1234,
            value: b"x",
            encoding_prefix: "fd341201",
            signable: "5843a490b5ca57608de11d0345c4aa73cd9353250c65ef8b46f47a2505ef5b51\
                       cd3d1092ecf2502ed66036c7b890c4675249989b08b66db322c925359ce7a6b6",
            signature: "fc10ffd9a596b6d1cea3c3070ad02ffc6ea0dcaa1e1d42da03ac4d0d08769065\
                        cce533495bcd4b8d8cfa7f8c1b23471cb2db32e840e2d8842cd67a0d9afa000f",
        },
        GoldenVector {
            name: "eight-byte sequence, 300-byte value",
            seq: 0x1_0000_0000,
            value: &[0x5a; 300],
            encoding_prefix: "ff0000000001000000fd2c01",
            signable: "5843a490b5ca57608de11d0345c4aa73cd9353250c65ef8b46f47a2505ef5b51\
                       41fc93426966be5c36bc7321fdf7d0e0d0338a3a200c73984bd2c777613ee159",
            signature: "c2bff594ba0c5a547f6408451ba01ae3fc3dd9544f75d14c9bdc3bb5f969df18\
                        0e1a00ffec3ae522fe6626c942422daa6911c965e6a70239aef5c444747ba409",
        },
    ]
}

/// The key pair for [`SEED`] under `scheme`.
pub fn key_pair(scheme: SchemeId) -> KeyPair {
    scheme.scheme().generate_key_pair(Some(&SEED))
}

/// The record a vector describes, signed by `scheme`.
pub fn record_from_vector(scheme: SchemeId, vector: &GoldenVector) -> Record {
    Record {
        public_key: key_pair(scheme).public_key(),
        seq: vector.seq,
        value: vector.value.into(),
        signature: signature_of(vector),
    }
}

/// Check one vector against `scheme`. Returns a description of the first
/// mismatch.
pub fn check_vector(scheme: SchemeId, vector: &GoldenVector) -> Result<(), String> {
    let kp = key_pair(scheme);
    if kp.public_key().to_hex() != PUBLIC_KEY {
        return Err(format!("{}: public key {}", vector.name, kp.public_key().to_hex()));
    }
    if kp.public_key().target().to_hex() != TARGET {
        return Err(format!("{}: target mismatch", vector.name));
    }

    let encoded = mutable_dht_core::encode_mutable(vector.seq, vector.value);
    if !hex::encode(&encoded).starts_with(vector.encoding_prefix) {
        return Err(format!("{}: encoding {}", vector.name, hex::encode(&encoded)));
    }

    let ns = Namespaces::standard().mutable_put;
    let s = signable(&ns, vector.seq, vector.value);
    if s.to_hex() != strip(vector.signable) {
        return Err(format!("{}: signable {}", vector.name, s.to_hex()));
    }

    let sig = scheme
        .scheme()
        .sign(&s, &kp.secret_key)
        .map_err(|e| format!("{}: sign failed: {}", vector.name, e))?;
    if sig.to_hex() != strip(vector.signature) {
        return Err(format!("{}: signature {}", vector.name, sig.to_hex()));
    }

    if !record_from_vector(scheme, vector).verify(scheme.scheme(), &ns) {
        return Err(format!("{}: golden signature rejected", vector.name));
    }
    Ok(())
}

/// Check the namespace tags. Returns a description of the first mismatch.
pub fn check_namespaces() -> Result<(), String> {
    for (name, expected) in NAMESPACES {
        let got = Namespace::derive(name);
        if hex::encode(got.as_bytes()) != expected {
            return Err(format!("namespace {}: {}", name, hex::encode(got.as_bytes())));
        }
    }
    Ok(())
}

/// A vector in the portable JSON form, all bytes hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub name: String,
    pub seed: String,
    pub public_key: String,
    pub target: String,
    pub namespace: String,
    pub seq: u64,
    pub value: String,
    pub signable: String,
    pub signature: String,
}

/// Every vector in portable form.
pub fn vector_records() -> Vec<VectorRecord> {
    let namespace = NAMESPACES[0].1;
    all_vectors()
        .into_iter()
        .map(|v| VectorRecord {
            name: v.name.to_string(),
            seed: hex::encode(SEED),
            public_key: PUBLIC_KEY.to_string(),
            target: TARGET.to_string(),
            namespace: namespace.to_string(),
            seq: v.seq,
            value: hex::encode(v.value),
            signable: strip(v.signable),
            signature: strip(v.signature),
        })
        .collect()
}

/// Every vector as pretty-printed JSON, for checking other implementations.
pub fn export_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&vector_records())
}

/// Public key of [`SEED`] decoded from [`PUBLIC_KEY`].
pub fn public_key() -> PublicKey {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&decode(PUBLIC_KEY));
    PublicKey::from_bytes(bytes)
}

fn signature_of(vector: &GoldenVector) -> Signature {
    let mut bytes = [0u8; 64];
    bytes.copy_from_slice(&decode(&strip(vector.signature)));
    Signature::from_bytes(bytes)
}

fn strip(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn decode(s: &str) -> Vec<u8> {
    hex::decode(s).expect("golden vectors are valid hex")
}
