//! Hosted channel state.
//!
//! A hosted channel has no funding output: its balances exist only as a
//! snapshot both peers have signed. This crate holds that snapshot and the
//! rules for replacing it.
//!
//! - [`state`] - pure functions that compute a new snapshot from the current
//!   one and a [`StateUpdate`](hc_wire::StateUpdate) or
//!   [`StateOverride`](hc_wire::StateOverride)
//! - [`channel`] - the [`HostedChannel`] aggregate, which stages results and
//!   commits them only after the caller has persisted them
//!
//! Counters never go backwards, and the blockday never decreases. A
//! snapshot is replaced whole, never edited in place.

pub mod channel;
pub mod error;
pub mod state;

pub use channel::{HostedChannel, PendingKind, PendingState, ResyncOutcome};
pub use error::{ChannelError, ChannelResult};
pub use state::{
    accept_countersignature, advance, apply_override, apply_update, propose_override,
    propose_update, state_update_for, BalanceDelta, ChannelKeys,
};
