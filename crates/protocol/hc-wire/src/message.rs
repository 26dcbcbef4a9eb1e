//! Message types and the type-code registry.
//!
//! Hosted-channel control messages sit at the top of the 16-bit range, on odd
//! codes. HTLC sub-protocol messages routed over the same channel use their
//! own reserved block below them.

use std::fmt;

use crate::codec::WireReader;
use crate::error::{DecodeError, DecodeResult, EncodeError};
use crate::hosted::{
    InitHostedChannel, InvokeHostedChannel, LastCrossSignedState, StateOverride, StateUpdate,
};
use crate::htlc::{
    HtlcMessage, UpdateAddHtlc, UpdateFailHtlc, UpdateFailMalformedHtlc, UpdateFulfillHtlc,
};

/// Type codes for every registered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
#[non_exhaustive]
pub enum MessageType {
    // =========================================================================
    // Hosted Channel Messages
    // =========================================================================
    /// Client asks a Host to open a channel
    InvokeHostedChannel = 65535,

    /// Host answers with its channel terms
    InitHostedChannel = 65533,

    /// Full cross-signed snapshot
    LastCrossSignedState = 65531,

    /// Proposal to advance the snapshot
    StateUpdate = 65529,

    /// Host-issued balance correction
    StateOverride = 65527,

    // =========================================================================
    // HTLC Messages
    // =========================================================================
    /// Offer an HTLC
    UpdateAddHtlc = 63505,

    /// Settle an HTLC with its preimage
    UpdateFulfillHtlc = 63503,

    /// Fail an HTLC with an encrypted reason
    UpdateFailHtlc = 63501,

    /// Fail an HTLC whose onion could not be parsed
    UpdateFailMalformedHtlc = 63499,
}

impl MessageType {
    /// Every registered type, in descending code order.
    pub const ALL: [MessageType; 9] = [
        MessageType::InvokeHostedChannel,
        MessageType::InitHostedChannel,
        MessageType::LastCrossSignedState,
        MessageType::StateUpdate,
        MessageType::StateOverride,
        MessageType::UpdateAddHtlc,
        MessageType::UpdateFulfillHtlc,
        MessageType::UpdateFailHtlc,
        MessageType::UpdateFailMalformedHtlc,
    ];

    /// Convert a u16 value to a MessageType.
    ///
    /// Returns `Err(DecodeError::UnknownMessageType)` for unregistered codes.
    /// Peers may speak a richer protocol, so callers should treat this as a
    /// normal outcome.
    pub fn from_u16(value: u16) -> DecodeResult<Self> {
        match value {
            65535 => Ok(MessageType::InvokeHostedChannel),
            65533 => Ok(MessageType::InitHostedChannel),
            65531 => Ok(MessageType::LastCrossSignedState),
            65529 => Ok(MessageType::StateUpdate),
            65527 => Ok(MessageType::StateOverride),
            63505 => Ok(MessageType::UpdateAddHtlc),
            63503 => Ok(MessageType::UpdateFulfillHtlc),
            63501 => Ok(MessageType::UpdateFailHtlc),
            63499 => Ok(MessageType::UpdateFailMalformedHtlc),
            _ => Err(DecodeError::UnknownMessageType(value)),
        }
    }

    /// Convert the message type to its u16 wire format value.
    pub fn to_u16(self) -> u16 {
        self as u16
    }

    /// Check if this is a hosted channel control message.
    pub fn is_hosted_control(&self) -> bool {
        matches!(
            self,
            MessageType::InvokeHostedChannel
                | MessageType::InitHostedChannel
                | MessageType::LastCrossSignedState
                | MessageType::StateUpdate
                | MessageType::StateOverride
        )
    }

    /// Check if this is an HTLC sub-protocol message.
    pub fn is_htlc(&self) -> bool {
        !self.is_hosted_control()
    }

    /// Body decoder registered for this type.
    pub fn decoder(self) -> DecodeFn {
        match self {
            MessageType::InvokeHostedChannel => decode_as::<InvokeHostedChannel>,
            MessageType::InitHostedChannel => decode_as::<InitHostedChannel>,
            MessageType::LastCrossSignedState => decode_as::<LastCrossSignedState>,
            MessageType::StateUpdate => decode_as::<StateUpdate>,
            MessageType::StateOverride => decode_as::<StateOverride>,
            MessageType::UpdateAddHtlc => decode_as::<HtlcMessage<UpdateAddHtlc>>,
            MessageType::UpdateFulfillHtlc => decode_as::<HtlcMessage<UpdateFulfillHtlc>>,
            MessageType::UpdateFailHtlc => decode_as::<HtlcMessage<UpdateFailHtlc>>,
            MessageType::UpdateFailMalformedHtlc => {
                decode_as::<HtlcMessage<UpdateFailMalformedHtlc>>
            }
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::InvokeHostedChannel => write!(f, "invoke_hosted_channel"),
            MessageType::InitHostedChannel => write!(f, "init_hosted_channel"),
            MessageType::LastCrossSignedState => write!(f, "last_cross_signed_state"),
            MessageType::StateUpdate => write!(f, "state_update"),
            MessageType::StateOverride => write!(f, "state_override"),
            MessageType::UpdateAddHtlc => write!(f, "update_add_htlc"),
            MessageType::UpdateFulfillHtlc => write!(f, "update_fulfill_htlc"),
            MessageType::UpdateFailHtlc => write!(f, "update_fail_htlc"),
            MessageType::UpdateFailMalformedHtlc => write!(f, "update_fail_malformed_htlc"),
        }
    }
}

/// A message with a fixed type code and field layout.
///
/// Field order is the wire format: `encode` and `decode` walk the fields in
/// the same order with no tags beyond explicit length prefixes.
pub trait WireMessage: Sized {
    /// Type code written ahead of the body.
    const TYPE: MessageType;

    /// Append the body to `buf`.
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError>;

    /// Read the body from `reader`.
    fn decode(reader: &mut WireReader<'_>) -> DecodeResult<Self>;
}

/// Constructor stored in the registry.
pub type DecodeFn = fn(&mut WireReader<'_>) -> DecodeResult<Message>;

fn decode_as<M>(reader: &mut WireReader<'_>) -> DecodeResult<Message>
where
    M: WireMessage + Into<Message>,
{
    M::decode(reader).map(Into::into)
}

/// Resolve a type code to its type and body decoder.
pub fn lookup(code: u16) -> DecodeResult<(MessageType, DecodeFn)> {
    let message_type = MessageType::from_u16(code)?;
    Ok((message_type, message_type.decoder()))
}

/// Any registered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    InvokeHostedChannel(InvokeHostedChannel),
    InitHostedChannel(InitHostedChannel),
    LastCrossSignedState(LastCrossSignedState),
    StateUpdate(StateUpdate),
    StateOverride(StateOverride),
    UpdateAddHtlc(HtlcMessage<UpdateAddHtlc>),
    UpdateFulfillHtlc(HtlcMessage<UpdateFulfillHtlc>),
    UpdateFailHtlc(HtlcMessage<UpdateFailHtlc>),
    UpdateFailMalformedHtlc(HtlcMessage<UpdateFailMalformedHtlc>),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::InvokeHostedChannel(_) => MessageType::InvokeHostedChannel,
            Message::InitHostedChannel(_) => MessageType::InitHostedChannel,
            Message::LastCrossSignedState(_) => MessageType::LastCrossSignedState,
            Message::StateUpdate(_) => MessageType::StateUpdate,
            Message::StateOverride(_) => MessageType::StateOverride,
            Message::UpdateAddHtlc(_) => MessageType::UpdateAddHtlc,
            Message::UpdateFulfillHtlc(_) => MessageType::UpdateFulfillHtlc,
            Message::UpdateFailHtlc(_) => MessageType::UpdateFailHtlc,
            Message::UpdateFailMalformedHtlc(_) => MessageType::UpdateFailMalformedHtlc,
        }
    }

    /// Append the body (without type code) to `buf`.
    pub fn encode_body(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        match self {
            Message::InvokeHostedChannel(m) => m.encode(buf),
            Message::InitHostedChannel(m) => m.encode(buf),
            Message::LastCrossSignedState(m) => m.encode(buf),
            Message::StateUpdate(m) => m.encode(buf),
            Message::StateOverride(m) => m.encode(buf),
            Message::UpdateAddHtlc(m) => m.encode(buf),
            Message::UpdateFulfillHtlc(m) => m.encode(buf),
            Message::UpdateFailHtlc(m) => m.encode(buf),
            Message::UpdateFailMalformedHtlc(m) => m.encode(buf),
        }
    }
}

macro_rules! impl_from_variant {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Message {
                fn from(m: $ty) -> Self {
                    Message::$variant(m)
                }
            }
        )*
    };
}

impl_from_variant! {
    InvokeHostedChannel => InvokeHostedChannel,
    InitHostedChannel => InitHostedChannel,
    LastCrossSignedState => LastCrossSignedState,
    StateUpdate => StateUpdate,
    StateOverride => StateOverride,
    UpdateAddHtlc => HtlcMessage<UpdateAddHtlc>,
    UpdateFulfillHtlc => HtlcMessage<UpdateFulfillHtlc>,
    UpdateFailHtlc => HtlcMessage<UpdateFailHtlc>,
    UpdateFailMalformedHtlc => HtlcMessage<UpdateFailMalformedHtlc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_values() {
        assert_eq!(MessageType::InvokeHostedChannel as u16, 65535);
        assert_eq!(MessageType::InitHostedChannel as u16, 65533);
        assert_eq!(MessageType::LastCrossSignedState as u16, 65531);
        assert_eq!(MessageType::StateUpdate as u16, 65529);
        assert_eq!(MessageType::StateOverride as u16, 65527);
        assert_eq!(MessageType::UpdateAddHtlc as u16, 63505);
        assert_eq!(MessageType::UpdateFulfillHtlc as u16, 63503);
        assert_eq!(MessageType::UpdateFailHtlc as u16, 63501);
        assert_eq!(MessageType::UpdateFailMalformedHtlc as u16, 63499);
    }

    #[test]
    fn test_message_type_all_variants_u16_roundtrip() {
        for message_type in MessageType::ALL {
            let value = message_type.to_u16();
            let parsed = MessageType::from_u16(value).unwrap();
            assert_eq!(parsed, message_type, "from_u16({:#06x}) failed", value);
        }
    }

    #[test]
    fn test_registry_codes_distinct() {
        let mut codes: Vec<u16> = MessageType::ALL.iter().map(|t| t.to_u16()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), MessageType::ALL.len());
    }

    #[test]
    fn test_unknown_codes() {
        // Invoice forwarding is reserved but not implemented
        assert_eq!(
            MessageType::from_u16(65525),
            Err(DecodeError::UnknownMessageType(65525))
        );
        assert!(lookup(0).is_err());
        assert!(lookup(128).is_err());
    }

    #[test]
    fn test_message_type_categories() {
        assert!(MessageType::StateUpdate.is_hosted_control());
        assert!(!MessageType::StateUpdate.is_htlc());
        assert!(MessageType::UpdateAddHtlc.is_htlc());
        assert_eq!(
            MessageType::ALL.iter().filter(|t| t.is_hosted_control()).count(),
            5
        );
    }

    #[test]
    fn test_message_type_display() {
        assert_eq!(
            MessageType::InvokeHostedChannel.to_string(),
            "invoke_hosted_channel"
        );
        assert_eq!(MessageType::StateOverride.to_string(), "state_override");
    }

    #[test]
    fn test_message_reports_its_type() {
        let msg: Message = StateUpdate::default().into();
        assert_eq!(msg.message_type(), MessageType::StateUpdate);
        assert_eq!(msg.message_type(), StateUpdate::TYPE);
    }
}
