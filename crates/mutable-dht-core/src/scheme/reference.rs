//! Scheme B: RFC 8032 Ed25519 written directly over `curve25519-dalek`.
//!
//! Key expansion, nonce derivation and the challenge hash follow RFC 8032
//! section 5.1 with SHA-512. Verification uses the cofactorless equation
//! `[S]B = R + [k]A` and applies the same strictness rules as
//! `ed25519-dalek`'s `verify_strict`: canonical `S`, and neither `A` nor `R`
//! of small order.

use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::{clamp_integer, Scalar};
use sha2::{Digest, Sha512};

use super::{random_seed, SchemeId, SignatureScheme};
use crate::crypto::{KeyPair, PublicKey, SecretKey, Signature};
use crate::error::{CoreError, Result};
use crate::signable::Signable;

/// Ed25519 implemented from the RFC over curve primitives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceScheme;

/// A seed expanded into signing material.
struct Expanded {
    scalar: Scalar,
    prefix: [u8; 32],
    public_key: CompressedEdwardsY,
}

fn sha512(parts: &[&[u8]]) -> [u8; 64] {
    let mut hasher = Sha512::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 64];
    out.copy_from_slice(&hasher.finalize());
    out
}

fn expand(seed: &[u8; 32]) -> Expanded {
    let h = sha512(&[&seed[..]]);
    let mut lower = [0u8; 32];
    lower.copy_from_slice(&h[..32]);
    let mut prefix = [0u8; 32];
    prefix.copy_from_slice(&h[32..]);

    let scalar = Scalar::from_bytes_mod_order(clamp_integer(lower));
    let public_key = EdwardsPoint::mul_base(&scalar).compress();
    Expanded {
        scalar,
        prefix,
        public_key,
    }
}

fn sign_message(key: &Expanded, message: &[u8]) -> [u8; 64] {
    let r = Scalar::from_bytes_mod_order_wide(&sha512(&[&key.prefix[..], message]));
    let big_r = EdwardsPoint::mul_base(&r).compress();

    let k = Scalar::from_bytes_mod_order_wide(&sha512(&[
        &big_r.as_bytes()[..],
        &key.public_key.as_bytes()[..],
        message,
    ]));
    let s = r + k * key.scalar;

    let mut sig = [0u8; 64];
    sig[..32].copy_from_slice(big_r.as_bytes());
    sig[32..].copy_from_slice(s.as_bytes());
    sig
}

fn verify_message(public_key: &[u8], message: &[u8], signature: &[u8; 64]) -> bool {
    let Ok(pk_bytes) = <[u8; 32]>::try_from(public_key) else {
        return false;
    };
    let Some(a) = CompressedEdwardsY(pk_bytes).decompress() else {
        return false;
    };
    if a.is_small_order() {
        return false;
    }

    let mut r_bytes = [0u8; 32];
    r_bytes.copy_from_slice(&signature[..32]);
    let mut s_bytes = [0u8; 32];
    s_bytes.copy_from_slice(&signature[32..]);

    let Some(s) = Option::<Scalar>::from(Scalar::from_canonical_bytes(s_bytes)) else {
        return false;
    };
    let Some(r) = CompressedEdwardsY(r_bytes).decompress() else {
        return false;
    };
    if r.is_small_order() {
        return false;
    }

    let k = Scalar::from_bytes_mod_order_wide(&sha512(&[&r_bytes[..], &pk_bytes[..], message]));
    let expected = EdwardsPoint::vartime_double_scalar_mul_basepoint(&k, &(-a), &s);
    expected.compress().as_bytes() == &r_bytes
}

impl SignatureScheme for ReferenceScheme {
    fn id(&self) -> SchemeId {
        SchemeId::Reference
    }

    fn generate_key_pair(&self, seed: Option<&[u8; 32]>) -> KeyPair {
        let seed = seed.copied().unwrap_or_else(random_seed);
        let expanded = expand(&seed);
        let public_key = PublicKey(expanded.public_key.to_bytes());
        KeyPair::new(public_key, SecretKey::from_parts(&seed, &public_key))
    }

    fn sign(&self, signable: &Signable, secret_key: &SecretKey) -> Result<Signature> {
        let expanded = expand(&secret_key.seed());
        if expanded.public_key.as_bytes() != secret_key.public_half().as_bytes() {
            return Err(CoreError::InvalidSecretKey);
        }
        Ok(Signature(sign_message(&expanded, signable.as_bytes())))
    }

    fn verify(&self, signable: &Signable, signature: &Signature, public_key: &[u8]) -> bool {
        verify_message(public_key, signable.as_bytes(), signature.as_bytes())
    }
}
