//! Signature schemes.
//!
//! A node selects its backend by value ([`SchemeId`]). Every backend signs and
//! verifies plain Ed25519 over the same 64-byte [`Signable`] and the same
//! 32-byte public key encoding, so a signature produced by one backend
//! verifies under every other one. Backends differ only in provenance:
//!
//! - [`DalekScheme`]: `ed25519-dalek`
//! - [`ReferenceScheme`]: RFC 8032 written directly over `curve25519-dalek`
//!
//! `verify` takes the public key as a raw slice because it is fed from the
//! network. Wrong lengths, undecodable or small-order points, and
//! non-canonical scalars all produce `false`.

mod dalek;
mod reference;

pub use dalek::DalekScheme;
pub use reference::ReferenceScheme;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::crypto::{KeyPair, SecretKey, Signature};
use crate::error::{CoreError, Result};
use crate::signable::Signable;

/// Capability interface implemented by every signature backend.
pub trait SignatureScheme: Send + Sync + fmt::Debug {
    /// Which backend this is.
    fn id(&self) -> SchemeId;

    /// Generate a key pair, deterministically when a seed is given.
    fn generate_key_pair(&self, seed: Option<&[u8; 32]>) -> KeyPair;

    /// Sign a signable.
    ///
    /// Fails only if the secret key's public half does not belong to its seed.
    fn sign(&self, signable: &Signable, secret_key: &SecretKey) -> Result<Signature>;

    /// Verify a signature. Never panics on malformed input.
    fn verify(&self, signable: &Signable, signature: &Signature, public_key: &[u8]) -> bool;
}

/// Identifies a signature backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemeId {
    /// Scheme A: `ed25519-dalek`.
    #[default]
    Dalek,
    /// Scheme B: RFC 8032 over `curve25519-dalek` primitives.
    Reference,
}

impl SchemeId {
    /// Every supported backend.
    pub const ALL: [SchemeId; 2] = [SchemeId::Dalek, SchemeId::Reference];

    /// The backend implementation.
    pub fn scheme(self) -> &'static dyn SignatureScheme {
        match self {
            SchemeId::Dalek => &DalekScheme,
            SchemeId::Reference => &ReferenceScheme,
        }
    }

    /// Stable name.
    pub fn as_str(self) -> &'static str {
        match self {
            SchemeId::Dalek => "dalek",
            SchemeId::Reference => "reference",
        }
    }
}

impl fmt::Display for SchemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemeId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dalek" => Ok(SchemeId::Dalek),
            "reference" => Ok(SchemeId::Reference),
            other => Err(CoreError::UnknownScheme(other.to_string())),
        }
    }
}

/// Fill a fresh random seed.
pub(crate) fn random_seed() -> [u8; 32] {
    use rand::RngCore;
    let mut seed = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut seed);
    seed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signable::{signable, Namespaces};
    use curve25519_dalek::edwards::CompressedEdwardsY;
    use curve25519_dalek::traits::Identity;
    use proptest::prelude::*;

    fn ns() -> crate::signable::Namespace {
        Namespaces::standard().mutable_put
    }

    #[test]
    fn test_scheme_ids_roundtrip() {
        for id in SchemeId::ALL {
            assert_eq!(id.scheme().id(), id);
            assert_eq!(id.as_str().parse::<SchemeId>().unwrap(), id);
        }
        assert!("rsa".parse::<SchemeId>().is_err());
    }

    #[test]
    fn test_every_pair_cross_verifies() {
        let s = signable(&ns(), 0, b"testing standard");
        for signer in SchemeId::ALL {
            let kp = signer.scheme().generate_key_pair(None);
            let sig = signer.scheme().sign(&s, &kp.secret_key).unwrap();
            for verifier in SchemeId::ALL {
                assert!(
                    verifier.scheme().verify(&s, &sig, kp.public_key.as_bytes()),
                    "sign with {} / verify with {} failed",
                    signer,
                    verifier
                );
            }
        }
    }

    #[test]
    fn test_seeded_key_pairs_agree() {
        let seed = [0x42u8; 32];
        let a = SchemeId::Dalek.scheme().generate_key_pair(Some(&seed));
        let b = SchemeId::Reference.scheme().generate_key_pair(Some(&seed));
        assert_eq!(a.public_key, b.public_key);
        assert_eq!(a.secret_key, b.secret_key);
    }

    #[test]
    fn test_signatures_are_byte_identical() {
        let seed = [0x07u8; 32];
        let kp = SchemeId::Dalek.scheme().generate_key_pair(Some(&seed));
        let s = signable(&ns(), 42, b"deterministic");
        let a = SchemeId::Dalek.scheme().sign(&s, &kp.secret_key).unwrap();
        let b = SchemeId::Reference.scheme().sign(&s, &kp.secret_key).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_mismatched_secret_key_is_rejected() {
        let kp = SchemeId::Dalek.scheme().generate_key_pair(Some(&[1u8; 32]));
        let other = SchemeId::Dalek.scheme().generate_key_pair(Some(&[2u8; 32]));
        let forged = SecretKey::from_parts(&kp.seed(), &other.public_key);
        let s = signable(&ns(), 1, b"x");
        for id in SchemeId::ALL {
            assert!(matches!(
                id.scheme().sign(&s, &forged),
                Err(CoreError::InvalidSecretKey)
            ));
        }
    }

    #[test]
    fn test_malformed_public_keys_fail_closed() {
        let kp = SchemeId::Dalek.scheme().generate_key_pair(None);
        let s = signable(&ns(), 0, b"v");
        let sig = SchemeId::Dalek.scheme().sign(&s, &kp.secret_key).unwrap();

        let identity = CompressedEdwardsY::identity().to_bytes();
        let mut not_on_curve = [0u8; 32];
        // y = 2 has no matching x on edwards25519.
        not_on_curve[0] = 2;

        let cases: Vec<Vec<u8>> = vec![
            vec![],
            kp.public_key.as_bytes()[..31].to_vec(),
            [kp.public_key.as_bytes().as_slice(), &[0u8][..]].concat(),
            vec![0u8; 32],
            identity.to_vec(),
            not_on_curve.to_vec(),
        ];

        for id in SchemeId::ALL {
            for pk in &cases {
                assert!(!id.scheme().verify(&s, &sig, pk), "{} accepted {:?}", id, pk);
            }
        }
    }

    #[test]
    fn test_small_order_forgery_is_rejected() {
        // With A = identity and R = identity, S = 0 satisfies the
        // cofactorless equation for every message.
        let identity = CompressedEdwardsY::identity().to_bytes();
        let mut sig = [0u8; 64];
        sig[..32].copy_from_slice(&identity);
        let sig = Signature(sig);
        let s = signable(&ns(), 0, b"anything");
        for id in SchemeId::ALL {
            assert!(!id.scheme().verify(&s, &sig, &identity));
        }
    }

    #[test]
    fn test_non_canonical_s_is_rejected() {
        let kp = SchemeId::Reference.scheme().generate_key_pair(None);
        let s = signable(&ns(), 3, b"malleable");
        let sig = SchemeId::Reference.scheme().sign(&s, &kp.secret_key).unwrap();

        // S + l is a different encoding of the same scalar.
        let l: [u8; 32] = [
            0xed, 0xd3, 0xf5, 0x5c, 0x1a, 0x63, 0x12, 0x58, 0xd6, 0x9c, 0xf7, 0xa2, 0xde, 0xf9,
            0xde, 0x14, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x10,
        ];
        let mut bytes = sig.0;
        let mut carry = 0u16;
        for i in 0..32 {
            let sum = bytes[32 + i] as u16 + l[i] as u16 + carry;
            bytes[32 + i] = sum as u8;
            carry = sum >> 8;
        }
        let malleated = Signature(bytes);
        for id in SchemeId::ALL {
            assert!(!id.scheme().verify(&s, &malleated, kp.public_key.as_bytes()));
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn cross_scheme_roundtrip(
            seed in any::<[u8; 32]>(),
            seq in any::<u64>(),
            value in prop::collection::vec(any::<u8>(), 0..128),
            signer in prop::sample::select(SchemeId::ALL.to_vec()),
            verifier in prop::sample::select(SchemeId::ALL.to_vec()),
        ) {
            let kp = signer.scheme().generate_key_pair(Some(&seed));
            let s = signable(&ns(), seq, &value);
            let sig = signer.scheme().sign(&s, &kp.secret_key).unwrap();
            prop_assert!(verifier.scheme().verify(&s, &sig, kp.public_key.as_bytes()));
        }

        #[test]
        fn perturbed_signable_fails(
            seed in any::<[u8; 32]>(),
            seq in 0u64..1_000_000,
            value in prop::collection::vec(any::<u8>(), 1..64),
            flip in any::<prop::sample::Index>(),
            verifier in prop::sample::select(SchemeId::ALL.to_vec()),
        ) {
            let kp = SchemeId::Dalek.scheme().generate_key_pair(Some(&seed));
            let s = signable(&ns(), seq, &value);
            let sig = SchemeId::Dalek.scheme().sign(&s, &kp.secret_key).unwrap();

            let mut tampered = value.clone();
            let i = flip.index(tampered.len());
            tampered[i] ^= 0x01;
            let bad_value = signable(&ns(), seq, &tampered);
            let bad_seq = signable(&ns(), seq + 1, &value);

            prop_assert!(!verifier.scheme().verify(&bad_value, &sig, kp.public_key.as_bytes()));
            prop_assert!(!verifier.scheme().verify(&bad_seq, &sig, kp.public_key.as_bytes()));
        }
    }
}
