//! Error type for parsing identifiers.

use thiserror::Error;

/// Errors that can occur when parsing identifiers from text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseIdError {
    /// Input is not valid hex
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Decoded identifier has the wrong length
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Required length
        expected: usize,
        /// Decoded length
        actual: usize,
    },

    /// Unknown channel phase discriminant
    #[error("unknown channel phase: {0}")]
    UnknownPhase(u8),
}
