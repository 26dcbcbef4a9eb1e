//! Crypto error type.

use thiserror::Error;

/// Failure to parse key material.
///
/// Signature checks report a plain `bool`; only parsing can fail with a reason.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CryptoError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("expected {expected} key bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Bytes do not describe a point on the Ed25519 curve
    #[error("not a valid Ed25519 public key")]
    InvalidPublicKey,

    #[error("signature verification failed")]
    SignatureVerificationFailed,
}
