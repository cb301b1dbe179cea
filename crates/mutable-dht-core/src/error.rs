//! Error types for the mutable DHT core.

use thiserror::Error;

/// Core errors that can occur while building or signing records.
///
/// Verification failures are deliberately absent: verifying attacker-controlled
/// input yields `false`, never an error.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("value too large: {len} bytes exceeds the limit of {max}")]
    ValueTooLarge { len: usize, max: usize },

    #[error("invalid secret key: public half does not match the seed")]
    InvalidSecretKey,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid peer address: {0}")]
    InvalidAddress(String),

    #[error("unknown signature scheme: {0}")]
    UnknownScheme(String),
}

impl CoreError {
    /// Whether this error belongs to the encoding class (fatal to the
    /// operation, never retried).
    pub fn is_encoding(&self) -> bool {
        matches!(self, CoreError::ValueTooLarge { .. })
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
