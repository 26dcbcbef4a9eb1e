//! Message framing.
//!
//! ```text
//! [type: u16 BE]   # Registered message type
//! [body: bytes]    # Type-specific fields, at most 65533 bytes
//! ```
//!
//! One transport payload carries exactly one message. The reader does not
//! require the input to be exhausted after the body.

use hc_types::MAX_MESSAGE_BODY;
use tracing::{debug, trace};

use crate::codec::{write_u16, DecodeLimits, WireReader};
use crate::error::{DecodeResult, EncodeError};
use crate::message::{lookup, Message};

/// Append a framed message to `buf`.
///
/// The write is all-or-nothing: on any error `buf` is truncated back to the
/// length it had before the call.
pub fn write_message(buf: &mut Vec<u8>, message: &Message) -> Result<(), EncodeError> {
    let rollback = buf.len();
    let result = write_framed(buf, message, rollback);
    if let Err(e) = &result {
        debug!(
            message_type = %message.message_type(),
            error = %e,
            "encode failed, discarding partial output"
        );
        buf.truncate(rollback);
    }
    result
}

fn write_framed(buf: &mut Vec<u8>, message: &Message, start: usize) -> Result<(), EncodeError> {
    write_u16(buf, message.message_type().to_u16());
    message.encode_body(buf)?;

    let body_len = buf.len() - start - 2;
    if body_len > MAX_MESSAGE_BODY {
        return Err(EncodeError::PayloadTooLarge {
            size: body_len,
            max: MAX_MESSAGE_BODY,
        });
    }
    trace!(message_type = %message.message_type(), body_len, "message encoded");
    Ok(())
}

/// Read one framed message.
pub fn read_message(reader: &mut WireReader<'_>) -> DecodeResult<Message> {
    let code = reader.read_u16()?;
    let (message_type, decode) = lookup(code)?;
    let message = decode(reader)?;
    trace!(%message_type, consumed = reader.position(), "message decoded");
    Ok(message)
}

/// Encode a message into a fresh buffer.
pub fn encode_message(message: &Message) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    write_message(&mut buf, message)?;
    Ok(buf)
}

/// Decode one transport payload.
pub fn decode_message(payload: &[u8], limits: DecodeLimits) -> DecodeResult<Message> {
    read_message(&mut WireReader::with_limits(payload, limits))
}
