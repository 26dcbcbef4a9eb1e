//! Primitive field codec.
//!
//! All multi-byte integers are big-endian. Variable-length byte strings carry
//! a 2-byte length prefix. Fixed-width fields (hashes, signatures, onion
//! packets) are written raw with no prefix.
//!
//! Writing goes straight into a `Vec<u8>`, which cannot fail; reading goes
//! through [`WireReader`], a cursor that never reads past the end of its
//! input and carries the [`DecodeLimits`] of the current configuration.

use hc_types::{DEFAULT_MAX_FEATURES_LEN, MAX_VAR_BYTES_LEN};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{DecodeError, DecodeResult, EncodeError};

/// Configurable bounds applied while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeLimits {
    /// Maximum length of the `features` blob in `init_hosted_channel`.
    pub max_features_len: u16,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_features_len: DEFAULT_MAX_FEATURES_LEN,
        }
    }
}

impl DecodeLimits {
    /// Override the features bound.
    pub fn with_max_features_len(mut self, max: u16) -> Self {
        self.max_features_len = max;
        self
    }
}

/// The kinds of element the primitive codec knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Bool,
    U16,
    U32,
    U64,
    /// Length-prefixed bytes; only readable through [`read_var_bytes`]
    VarBytes,
}

impl ElementKind {
    /// Encoded width, or `None` for kinds without a fixed width.
    pub fn width(self) -> Option<usize> {
        match self {
            ElementKind::Bool => Some(1),
            ElementKind::U16 => Some(2),
            ElementKind::U32 => Some(4),
            ElementKind::U64 => Some(8),
            ElementKind::VarBytes => None,
        }
    }
}

/// A decoded fixed-width value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Bool(bool),
    U16(u16),
    U32(u32),
    U64(u64),
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Bool(_) => ElementKind::Bool,
            Element::U16(_) => ElementKind::U16,
            Element::U32(_) => ElementKind::U32,
            Element::U64(_) => ElementKind::U64,
        }
    }
}

/// Bounds-checked cursor over an input buffer.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
    limits: DecodeLimits,
}

impl<'a> WireReader<'a> {
    /// Create a reader with default limits.
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_limits(buf, DecodeLimits::default())
    }

    /// Create a reader with explicit limits.
    pub fn with_limits(buf: &'a [u8], limits: DecodeLimits) -> Self {
        Self {
            buf,
            pos: 0,
            limits,
        }
    }

    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Consume exactly `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(DecodeError::Truncated {
                needed: n,
                available: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Consume a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Any nonzero byte decodes as `true`.
    pub fn read_bool(&mut self) -> DecodeResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> DecodeResult<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> DecodeResult<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> DecodeResult<u64> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }
}

/// Read one fixed-width element of the requested kind.
///
/// Call sites that know the kind statically should prefer the typed readers
/// on [`WireReader`]. This entry point exists for table-driven callers.
pub fn read_element(reader: &mut WireReader<'_>, kind: ElementKind) -> DecodeResult<Element> {
    match kind {
        ElementKind::Bool => reader.read_bool().map(Element::Bool),
        ElementKind::U16 => reader.read_u16().map(Element::U16),
        ElementKind::U32 => reader.read_u32().map(Element::U32),
        ElementKind::U64 => reader.read_u64().map(Element::U64),
        ElementKind::VarBytes => Err(DecodeError::UnsupportedPrimitive(kind)),
    }
}

/// Write one fixed-width element.
pub fn write_element(buf: &mut Vec<u8>, element: Element) {
    match element {
        Element::Bool(v) => buf.push(u8::from(v)),
        Element::U16(v) => write_u16(buf, v),
        Element::U32(v) => write_u32(buf, v),
        Element::U64(v) => write_u64(buf, v),
    }
}

pub fn write_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

pub fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

pub fn write_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

/// Read a length-prefixed byte string.
///
/// The declared length is checked against `max_allowed` before any body byte
/// is consumed, so an oversized prefix never causes a large read.
pub fn read_var_bytes(
    reader: &mut WireReader<'_>,
    max_allowed: usize,
    field_name: &'static str,
) -> DecodeResult<Vec<u8>> {
    let len = reader.read_u16()? as usize;
    if len > max_allowed {
        trace!(field = field_name, len, max = max_allowed, "var bytes over limit");
        return Err(DecodeError::FieldTooLarge {
            field: field_name,
            len,
            max: max_allowed,
        });
    }
    Ok(reader.read_bytes(len)?.to_vec())
}

/// Write a length-prefixed byte string.
///
/// Nothing is written when the value does not fit the prefix.
pub fn write_var_bytes(buf: &mut Vec<u8>, bytes: &[u8]) -> Result<(), EncodeError> {
    let len = u16::try_from(bytes.len()).map_err(|_| EncodeError::ValueTooLarge {
        len: bytes.len(),
        max: MAX_VAR_BYTES_LEN,
    })?;
    write_u16(buf, len);
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Write a length-prefixed byte string whose length the protocol caps.
pub fn write_bounded_bytes(
    buf: &mut Vec<u8>,
    bytes: &[u8],
    max_allowed: usize,
    field_name: &'static str,
) -> Result<(), EncodeError> {
    if bytes.len() > max_allowed {
        return Err(EncodeError::FieldTooLarge {
            field: field_name,
            len: bytes.len(),
            max: max_allowed,
        });
    }
    write_var_bytes(buf, bytes)
}
