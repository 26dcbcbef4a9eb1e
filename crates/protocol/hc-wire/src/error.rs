//! Error types for the wire codec.
//!
//! Encoding and decoding fail for different reasons and are handled by
//! different parties: decode errors come from untrusted peer input and are
//! recoverable, encode errors point at a local bug or oversized value.

use thiserror::Error;

use crate::codec::ElementKind;

/// Errors that can occur while encoding.
///
/// A failed encode never leaves partial output behind when it goes through
/// [`crate::write_message`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EncodeError {
    /// A variable-length field does not fit a 2-byte length prefix
    #[error("value too large: {len} bytes exceeds length prefix limit {max}")]
    ValueTooLarge { len: usize, max: usize },

    /// A bounded field is longer than the protocol allows
    #[error("field {field} too large: {len} bytes, maximum {max}")]
    FieldTooLarge {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// The encoded message body exceeds the protocol maximum
    #[error("payload too large: {size} bytes exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },
}

/// Errors that can occur while decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// Fewer bytes remain than the format requires
    #[error("truncated input: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    /// A length-prefixed field declares more bytes than its maximum
    #[error("field {field} too large: declared {len} bytes, maximum {max}")]
    FieldTooLarge {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// The type code is not registered
    #[error("unknown message type: {0}")]
    UnknownMessageType(u16),

    /// The requested element kind has no fixed-width reader
    #[error("unsupported primitive: {0:?}")]
    UnsupportedPrimitive(ElementKind),
}

/// Either direction of codec failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Result alias for decode paths.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_values() {
        let err = DecodeError::FieldTooLarge {
            field: "refund_script_pub_key",
            len: 40,
            max: 34,
        };
        assert_eq!(
            err.to_string(),
            "field refund_script_pub_key too large: declared 40 bytes, maximum 34"
        );

        let err = EncodeError::PayloadTooLarge {
            size: 65_534,
            max: 65_533,
        };
        assert!(err.to_string().contains("65534"));
    }

    #[test]
    fn test_wire_error_from() {
        let err: WireError = DecodeError::UnknownMessageType(7).into();
        assert!(matches!(
            err,
            WireError::Decode(DecodeError::UnknownMessageType(7))
        ));
    }
}
