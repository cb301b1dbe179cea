//! Scheme A: Ed25519 via `ed25519-dalek`.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, VerifyingKey};

use super::{SchemeId, SignatureScheme};
use crate::crypto::{KeyPair, PublicKey, SecretKey, Signature};
use crate::error::{CoreError, Result};
use crate::signable::Signable;

/// Ed25519 backed by `ed25519-dalek`, verifying with `verify_strict`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DalekScheme;

impl SignatureScheme for DalekScheme {
    fn id(&self) -> SchemeId {
        SchemeId::Dalek
    }

    fn generate_key_pair(&self, seed: Option<&[u8; 32]>) -> KeyPair {
        let signing_key = match seed {
            Some(seed) => SigningKey::from_bytes(seed),
            None => SigningKey::generate(&mut rand::thread_rng()),
        };
        KeyPair::new(
            PublicKey(signing_key.verifying_key().to_bytes()),
            SecretKey::from_bytes(signing_key.to_keypair_bytes()),
        )
    }

    fn sign(&self, signable: &Signable, secret_key: &SecretKey) -> Result<Signature> {
        // Rejects key material whose public half was not derived from the seed.
        let signing_key = SigningKey::from_keypair_bytes(secret_key.as_bytes())
            .map_err(|_| CoreError::InvalidSecretKey)?;
        Ok(Signature(signing_key.sign(signable.as_bytes()).to_bytes()))
    }

    fn verify(&self, signable: &Signable, signature: &Signature, public_key: &[u8]) -> bool {
        let Ok(bytes) = <[u8; 32]>::try_from(public_key) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&bytes) else {
            return false;
        };
        if verifying_key.is_weak() {
            return false;
        }
        let sig = DalekSignature::from_bytes(signature.as_bytes());
        verifying_key
            .verify_strict(signable.as_bytes(), &sig)
            .is_ok()
    }
}
