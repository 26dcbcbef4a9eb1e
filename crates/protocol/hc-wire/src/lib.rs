//! Wire codec for hosted channels.
//!
//! This crate implements the binary format peers exchange to open hosted
//! channels and advance their cross-signed state:
//!
//! - Primitive fields: big-endian integers, booleans, length-prefixed bytes
//! - One type per message with a fixed field order
//! - A registry from 16-bit type code to body decoder
//! - Framing with an all-or-nothing writer
//! - Signing digests over channel state
//!
//! Every decode path treats its input as hostile: declared lengths are
//! checked against their maximum before any body byte is read, and no read
//! ever runs past the end of the input.
//!
//! # Example
//!
//! ```
//! use hc_types::ChainHash;
//! use hc_wire::{decode_message, encode_message, DecodeLimits, InvokeHostedChannel, Message};
//!
//! let invoke = Message::InvokeHostedChannel(InvokeHostedChannel {
//!     chain_hash: ChainHash::BITCOIN_MAINNET,
//!     refund_script_pub_key: vec![0x08],
//!     secret: vec![0x0a],
//! });
//!
//! let bytes = encode_message(&invoke).unwrap();
//! let decoded = decode_message(&bytes, DecodeLimits::default()).unwrap();
//! assert_eq!(decoded, invoke);
//! ```

pub mod codec;
pub mod encoding;
pub mod error;
pub mod hosted;
pub mod htlc;
pub mod message;
pub mod signing;

pub use codec::{
    read_element, read_var_bytes, write_bounded_bytes, write_element, write_var_bytes,
    DecodeLimits, Element, ElementKind, WireReader,
};
pub use encoding::{decode_message, encode_message, read_message, write_message};
pub use error::{DecodeError, DecodeResult, EncodeError, WireError};
pub use hosted::{
    InitHostedChannel, InvokeHostedChannel, LastCrossSignedState, StateOverride, StateUpdate,
};
pub use htlc::{
    HtlcMessage, HtlcRecord, OnionPacket, UpdateAddHtlc, UpdateFailHtlc, UpdateFailMalformedHtlc,
    UpdateFulfillHtlc,
};
pub use message::{lookup, DecodeFn, Message, MessageType, WireMessage};
