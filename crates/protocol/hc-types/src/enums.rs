//! Enumeration types.

use serde::{Deserialize, Serialize};

use crate::error::ParseIdError;

/// Lifecycle phase of a hosted channel.
///
/// ```text
/// Uninitialized -> Invoked -> Negotiating -> Open <-> Updating
///                                            Open|Updating -> Disputed -> Overridden -> Open
///                                            any -> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ChannelPhase {
    /// No message exchanged yet
    #[default]
    Uninitialized = 0x00,
    /// `invoke_hosted_channel` sent or received
    Invoked = 0x01,
    /// `init_hosted_channel` exchanged, awaiting the first signed state
    Negotiating = 0x02,
    /// A cross-signed state is established and no round is in flight
    Open = 0x03,
    /// A `state_update` round is in flight
    Updating = 0x04,
    /// The counterparty's view conflicts with ours
    Disputed = 0x05,
    /// A `state_override` is staged and awaiting persistence
    Overridden = 0x06,
    /// The channel no longer accepts updates
    Closed = 0x07,
}

impl ChannelPhase {
    /// Convert a stored discriminant back to a phase.
    pub fn from_u8(value: u8) -> Result<Self, ParseIdError> {
        match value {
            0x00 => Ok(ChannelPhase::Uninitialized),
            0x01 => Ok(ChannelPhase::Invoked),
            0x02 => Ok(ChannelPhase::Negotiating),
            0x03 => Ok(ChannelPhase::Open),
            0x04 => Ok(ChannelPhase::Updating),
            0x05 => Ok(ChannelPhase::Disputed),
            0x06 => Ok(ChannelPhase::Overridden),
            0x07 => Ok(ChannelPhase::Closed),
            other => Err(ParseIdError::UnknownPhase(other)),
        }
    }

    /// Check whether the channel holds a cross-signed state.
    pub fn is_established(&self) -> bool {
        matches!(
            self,
            ChannelPhase::Open
                | ChannelPhase::Updating
                | ChannelPhase::Disputed
                | ChannelPhase::Overridden
        )
    }

    /// Check whether a new update round may start.
    pub fn accepts_updates(&self) -> bool {
        *self == ChannelPhase::Open
    }
}

impl std::fmt::Display for ChannelPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelPhase::Uninitialized => write!(f, "UNINITIALIZED"),
            ChannelPhase::Invoked => write!(f, "INVOKED"),
            ChannelPhase::Negotiating => write!(f, "NEGOTIATING"),
            ChannelPhase::Open => write!(f, "OPEN"),
            ChannelPhase::Updating => write!(f, "UPDATING"),
            ChannelPhase::Disputed => write!(f, "DISPUTED"),
            ChannelPhase::Overridden => write!(f, "OVERRIDDEN"),
            ChannelPhase::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Which side of the channel an action originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// This node
    Local,
    /// The counterparty
    Remote,
}

impl Side {
    /// The other side.
    pub fn opposite(self) -> Self {
        match self {
            Side::Local => Side::Remote,
            Side::Remote => Side::Local,
        }
    }
}
