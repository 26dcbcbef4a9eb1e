//! Rules for advancing a cross-signed snapshot.
//!
//! Every function here is pure: it takes the current snapshot by reference
//! and returns a new one. The caller decides when the result replaces the
//! committed snapshot, so a rejected or unpersisted result never leaks.
//!
//! Counters in a received [`StateUpdate`] or [`StateOverride`] are from the
//! sender's point of view: the sender's `local_updates` is our
//! `remote_updates` and the other way round.

use hc_crypto::{PrivateKey, PublicKey, Signature};
use hc_types::{Blockday, MilliSatoshi, Side};
use hc_wire::{LastCrossSignedState, StateOverride, StateUpdate};

use crate::error::{ChannelError, ChannelResult};

/// Keys used to verify and countersign one channel's snapshots.
#[derive(Debug, Clone, Copy)]
pub struct ChannelKeys<'a> {
    /// Our signing key
    pub local: &'a PrivateKey,
    /// The counterparty's node key
    pub remote: &'a PublicKey,
}

impl<'a> ChannelKeys<'a> {
    pub fn new(local: &'a PrivateKey, remote: &'a PublicKey) -> Self {
        Self { local, remote }
    }
}

/// Millisatoshi moved by one update, seen from the initiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceDelta {
    /// Initiator pays its counterparty
    Pay(MilliSatoshi),
    /// Initiator receives from its counterparty
    Receive(MilliSatoshi),
}

impl Default for BalanceDelta {
    fn default() -> Self {
        Self::ZERO
    }
}

impl BalanceDelta {
    /// No balance change; only counters advance.
    pub const ZERO: BalanceDelta = BalanceDelta::Pay(0);

    /// Initiator pays `msat` to its counterparty.
    pub fn pay(msat: MilliSatoshi) -> Self {
        BalanceDelta::Pay(msat)
    }

    /// Initiator receives `msat` from its counterparty.
    pub fn receive(msat: MilliSatoshi) -> Self {
        BalanceDelta::Receive(msat)
    }

    /// Amount moved, whatever the direction.
    pub fn msat(self) -> MilliSatoshi {
        match self {
            BalanceDelta::Pay(msat) | BalanceDelta::Receive(msat) => msat,
        }
    }

    /// Whether the delta moves funds at all.
    pub fn is_zero(self) -> bool {
        self.msat() == 0
    }
}

fn counter_overflow(current: &LastCrossSignedState) -> ChannelError {
    ChannelError::CounterMismatch {
        expected_local: current.local_updates,
        expected_remote: current.remote_updates,
        got_local: current.local_updates,
        got_remote: current.remote_updates,
    }
}

fn next_counters(current: &LastCrossSignedState, initiator: Side) -> ChannelResult<(u32, u32)> {
    let overflow = || counter_overflow(current);
    match initiator {
        Side::Local => Ok((
            current.local_updates.checked_add(1).ok_or_else(overflow)?,
            current.remote_updates,
        )),
        Side::Remote => Ok((
            current.local_updates,
            current.remote_updates.checked_add(1).ok_or_else(overflow)?,
        )),
    }
}

fn move_balance(
    state: &mut LastCrossSignedState,
    initiator: Side,
    delta: BalanceDelta,
) -> ChannelResult<()> {
    let capacity = state.init_hosted_channel.channel_capacity_msat;
    let (payer, payee, amount) = match (initiator, delta) {
        (Side::Local, BalanceDelta::Pay(msat)) | (Side::Remote, BalanceDelta::Receive(msat)) => (
            &mut state.local_balance_msat,
            &mut state.remote_balance_msat,
            msat,
        ),
        (Side::Remote, BalanceDelta::Pay(msat)) | (Side::Local, BalanceDelta::Receive(msat)) => (
            &mut state.remote_balance_msat,
            &mut state.local_balance_msat,
            msat,
        ),
    };
    *payer = payer
        .checked_sub(amount)
        .ok_or(ChannelError::InsufficientBalance {
            available: *payer,
            requested: amount,
        })?;
    let credited = payee.checked_add(amount).unwrap_or(u64::MAX);
    if credited > capacity {
        return Err(ChannelError::BalanceExceedsCapacity {
            balance: credited,
            capacity,
        });
    }
    *payee = credited;
    Ok(())
}

fn check_blockday(current: &LastCrossSignedState, proposed: Blockday) -> ChannelResult<()> {
    if proposed < current.blockday {
        return Err(ChannelError::StaleBlockday {
            current: current.blockday,
            proposed,
        });
    }
    Ok(())
}

fn verify_prior(current: &LastCrossSignedState, keys: &ChannelKeys<'_>) -> ChannelResult<()> {
    if !current.verify_remote_sig(keys.remote) {
        return Err(ChannelError::InvalidSignature("prior state"));
    }
    Ok(())
}

/// Compute the unsigned snapshot after one update.
pub fn advance(
    current: &LastCrossSignedState,
    initiator: Side,
    delta: BalanceDelta,
    blockday: Blockday,
) -> ChannelResult<LastCrossSignedState> {
    check_blockday(current, blockday)?;
    let (local_updates, remote_updates) = next_counters(current, initiator)?;

    let mut next = current.clone();
    next.blockday = blockday;
    next.local_updates = local_updates;
    next.remote_updates = remote_updates;
    move_balance(&mut next, initiator, delta)?;
    next.remote_sig_of_local = Signature::EMPTY;
    next.local_sig_of_remote = Signature::EMPTY;
    Ok(next)
}

/// Build our proposal for the next snapshot.
///
/// Returns the proposed snapshot, signed only by us, and the message that
/// carries our signature to the counterparty.
pub fn propose_update(
    current: &LastCrossSignedState,
    initiator: Side,
    delta: BalanceDelta,
    blockday: Blockday,
    keys: &ChannelKeys<'_>,
) -> ChannelResult<(LastCrossSignedState, StateUpdate)> {
    let mut next = advance(current, initiator, delta, blockday)?;
    next.local_sig_of_remote = next.sign_remote_view(keys.local)?;
    let update = state_update_for(&next);
    Ok((next, update))
}

/// The message announcing our signature over `state`'s counterparty view.
pub fn state_update_for(state: &LastCrossSignedState) -> StateUpdate {
    StateUpdate {
        blockday: state.blockday,
        local_updates: state.local_updates,
        remote_updates: state.remote_updates,
        local_sig_of_remote: state.local_sig_of_remote,
    }
}

/// Accept a counterparty's update to `current`.
///
/// The prior snapshot's counterparty signature is checked before anything
/// else. The initiator's counter advances by exactly one and the update's
/// signature must cover the resulting snapshot. On success the result carries
/// both signatures.
pub fn apply_update(
    current: &LastCrossSignedState,
    update: &StateUpdate,
    initiator: Side,
    delta: BalanceDelta,
    keys: &ChannelKeys<'_>,
) -> ChannelResult<LastCrossSignedState> {
    verify_prior(current, keys)?;
    check_blockday(current, update.blockday)?;

    let (expected_local, expected_remote) = next_counters(current, initiator)?;
    if update.remote_updates != expected_local || update.local_updates != expected_remote {
        return Err(ChannelError::CounterMismatch {
            expected_local,
            expected_remote,
            got_local: update.remote_updates,
            got_remote: update.local_updates,
        });
    }

    let mut next = advance(current, initiator, delta, update.blockday)?;
    next.remote_sig_of_local = update.local_sig_of_remote;
    if !next.verify_remote_sig(keys.remote) {
        return Err(ChannelError::InvalidSignature("state update"));
    }
    next.local_sig_of_remote = next.sign_remote_view(keys.local)?;

    tracing::debug!(
        blockday = next.blockday,
        local_updates = next.local_updates,
        remote_updates = next.remote_updates,
        "state update verified"
    );
    Ok(next)
}

/// Complete our own proposal with the counterparty's reply.
pub fn accept_countersignature(
    proposed: &LastCrossSignedState,
    reply: &StateUpdate,
    keys: &ChannelKeys<'_>,
) -> ChannelResult<LastCrossSignedState> {
    if reply.blockday != proposed.blockday {
        return Err(ChannelError::StaleBlockday {
            current: proposed.blockday,
            proposed: reply.blockday,
        });
    }
    if reply.remote_updates != proposed.local_updates
        || reply.local_updates != proposed.remote_updates
    {
        return Err(ChannelError::CounterMismatch {
            expected_local: proposed.local_updates,
            expected_remote: proposed.remote_updates,
            got_local: reply.remote_updates,
            got_remote: reply.local_updates,
        });
    }

    let mut signed = proposed.clone();
    signed.remote_sig_of_local = reply.local_sig_of_remote;
    if !signed.verify_remote_sig(keys.remote) {
        return Err(ChannelError::InvalidSignature("countersignature"));
    }
    Ok(signed)
}

fn overridden(
    current: &LastCrossSignedState,
    blockday: Blockday,
    local_updates: u32,
    remote_updates: u32,
    local_balance_msat: MilliSatoshi,
) -> ChannelResult<LastCrossSignedState> {
    check_blockday(current, blockday)?;
    let capacity = current.init_hosted_channel.channel_capacity_msat;
    let remote_balance_msat =
        capacity
            .checked_sub(local_balance_msat)
            .ok_or(ChannelError::BalanceExceedsCapacity {
                balance: local_balance_msat,
                capacity,
            })?;

    let mut next = current.clone();
    next.blockday = blockday;
    next.local_updates = local_updates;
    next.remote_updates = remote_updates;
    next.local_balance_msat = local_balance_msat;
    next.remote_balance_msat = remote_balance_msat;
    next.incoming_htlcs.clear();
    next.outgoing_htlcs.clear();
    next.remote_sig_of_local = Signature::EMPTY;
    next.local_sig_of_remote = Signature::EMPTY;
    Ok(next)
}

/// Build a balance correction for the counterparty (Host side).
///
/// Both counters advance by one so the correction supersedes every snapshot
/// signed before it. All in-flight HTLCs are dropped and `local_balance_msat`
/// becomes our balance; the counterparty gets the rest of the capacity.
pub fn propose_override(
    current: &LastCrossSignedState,
    blockday: Blockday,
    local_balance_msat: MilliSatoshi,
    keys: &ChannelKeys<'_>,
) -> ChannelResult<(LastCrossSignedState, StateOverride)> {
    let overflow = || counter_overflow(current);
    let mut next = overridden(
        current,
        blockday,
        current.local_updates.checked_add(1).ok_or_else(overflow)?,
        current.remote_updates.checked_add(1).ok_or_else(overflow)?,
        local_balance_msat,
    )?;
    next.local_sig_of_remote = next.sign_remote_view(keys.local)?;
    let message = StateOverride {
        blockday: next.blockday,
        local_balance_msat: next.local_balance_msat,
        local_updates: next.local_updates,
        remote_updates: next.remote_updates,
        local_sig_of_remote: next.local_sig_of_remote,
    };
    Ok((next, message))
}

/// Accept a balance correction from the counterparty.
///
/// Both counters must move past ours and the blockday must not go backwards,
/// but balances may move in either direction. All in-flight HTLCs are dropped.
pub fn apply_override(
    current: &LastCrossSignedState,
    message: &StateOverride,
    keys: &ChannelKeys<'_>,
) -> ChannelResult<LastCrossSignedState> {
    verify_prior(current, keys)?;

    if message.remote_updates <= current.local_updates
        || message.local_updates <= current.remote_updates
    {
        return Err(ChannelError::CounterMismatch {
            expected_local: current.local_updates,
            expected_remote: current.remote_updates,
            got_local: message.remote_updates,
            got_remote: message.local_updates,
        });
    }

    let capacity = current.init_hosted_channel.channel_capacity_msat;
    // The sender's balance is our remote balance
    let local_balance_msat =
        capacity
            .checked_sub(message.local_balance_msat)
            .ok_or(ChannelError::BalanceExceedsCapacity {
                balance: message.local_balance_msat,
                capacity,
            })?;

    let mut next = overridden(
        current,
        message.blockday,
        message.remote_updates,
        message.local_updates,
        local_balance_msat,
    )?;
    next.remote_sig_of_local = message.local_sig_of_remote;
    if !next.verify_remote_sig(keys.remote) {
        return Err(ChannelError::InvalidSignature("state override"));
    }
    next.local_sig_of_remote = next.sign_remote_view(keys.local)?;

    tracing::debug!(
        blockday = next.blockday,
        local_balance_msat = next.local_balance_msat,
        "state override verified"
    );
    Ok(next)
}
