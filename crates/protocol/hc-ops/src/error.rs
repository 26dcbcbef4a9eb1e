//! Error types for the operations layer.

use hc_channel::ChannelError;
use hc_store::StoreError;
use hc_types::{ChannelPhase, NodeId};
use hc_wire::{DecodeError, EncodeError, MessageType};
use thiserror::Error;

/// Result type for operations.
pub type OpsResult<T> = std::result::Result<T, OpsError>;

/// Errors that can occur during protocol operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OpsError {
    // =========================================================================
    // Channel Errors
    // =========================================================================
    /// No channel with this peer.
    #[error("no channel with peer {0}")]
    ChannelNotFound(NodeId),

    /// A channel with this peer already exists.
    #[error("channel with peer {0} already exists")]
    ChannelAlreadyExists(NodeId),

    /// A message arrived that the channel's phase cannot accept.
    #[error("unexpected {message_type} while channel is {phase}")]
    UnexpectedMessage {
        message_type: MessageType,
        phase: ChannelPhase,
    },

    /// An invoke carried a secret the Host does not accept.
    #[error("invoke secret rejected")]
    SecretRejected,

    /// This node does not host channels.
    #[error("hosting is disabled")]
    HostingDisabled,

    /// The channel aggregate rejected the operation.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    // =========================================================================
    // Wire Errors
    // =========================================================================
    /// Inbound payload failed to decode.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Outbound message failed to encode.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    // =========================================================================
    // Collaborator Errors
    // =========================================================================
    /// Transport failed to send.
    #[error("transport error: {0}")]
    Transport(String),

    /// Storage error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(String),

    /// Lock poisoning error.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl OpsError {
    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        OpsError::Transport(msg.into())
    }

    /// Create a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        OpsError::Config(msg.into())
    }

    /// Whether the error was caused by what the peer sent, rather than by a
    /// local collaborator.
    ///
    /// Peer faults reject one message; local faults are reported to the caller.
    pub fn is_peer_fault(&self) -> bool {
        matches!(
            self,
            OpsError::UnexpectedMessage { .. }
                | OpsError::SecretRejected
                | OpsError::HostingDisabled
                | OpsError::Channel(_)
                | OpsError::Decode(_)
                | OpsError::ChannelNotFound(_)
                | OpsError::ChannelAlreadyExists(_)
        )
    }
}
