//! Error types for channel state transitions.

use hc_types::{Blockday, ChainHash, ChannelPhase, MilliSatoshi};
use hc_wire::EncodeError;
use thiserror::Error;

/// Result type for channel operations.
pub type ChannelResult<T> = std::result::Result<T, ChannelError>;

/// Reasons a proposed snapshot is rejected.
///
/// A rejected update leaves the channel on its last committed snapshot.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChannelError {
    /// A signature did not verify against the counterparty key
    #[error("invalid signature on {0}")]
    InvalidSignature(&'static str),

    /// Proposed blockday is earlier than the current one
    #[error("stale blockday: current {current}, proposed {proposed}")]
    StaleBlockday {
        current: Blockday,
        proposed: Blockday,
    },

    /// Update counters do not match the expected next values
    #[error(
        "counter mismatch: expected local {expected_local} remote {expected_remote}, \
         got local {got_local} remote {got_remote}"
    )]
    CounterMismatch {
        expected_local: u32,
        expected_remote: u32,
        got_local: u32,
        got_remote: u32,
    },

    /// A balance would exceed channel capacity
    #[error("balance {balance} exceeds capacity {capacity}")]
    BalanceExceedsCapacity {
        balance: MilliSatoshi,
        capacity: MilliSatoshi,
    },

    /// The paying side does not hold enough
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        available: MilliSatoshi,
        requested: MilliSatoshi,
    },

    /// Operation not allowed in the current phase
    #[error("cannot {operation} while {phase}")]
    InvalidTransition {
        phase: ChannelPhase,
        operation: &'static str,
    },

    /// Nothing is staged
    #[error("no pending state")]
    NoPendingState,

    /// A round is already in flight
    #[error("a pending state already exists")]
    PendingStateExists,

    /// Peer addressed a different ledger
    #[error("chain hash mismatch: expected {expected}, got {got}")]
    ChainHashMismatch { expected: ChainHash, got: ChainHash },

    /// Refund script exceeds its wire maximum
    #[error("refund script too long: {len} bytes")]
    RefundScriptTooLong { len: usize },

    /// Channel has no committed snapshot yet
    #[error("channel not established")]
    NotEstablished,

    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
}
