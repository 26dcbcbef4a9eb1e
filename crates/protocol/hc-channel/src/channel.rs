//! The per-channel aggregate.
//!
//! A [`HostedChannel`] owns the negotiated terms and the committed snapshot.
//! New snapshots are first *staged*; the committed one is replaced only once
//! the caller reports that the staged result was persisted. Until then the
//! previous snapshot stays authoritative, and abandoning the round restores
//! the channel exactly as it was.

use hc_crypto::Signature;
use hc_types::{
    Blockday, ChainHash, ChannelId, ChannelPhase, NodeId, Side, MAX_REFUND_SCRIPT_LEN,
};
use hc_wire::{InitHostedChannel, LastCrossSignedState, StateOverride, StateUpdate};

use crate::error::{ChannelError, ChannelResult};
use crate::state::{self, BalanceDelta, ChannelKeys};

/// What kind of round produced a staged snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKind {
    /// Our own proposal, waiting for the counterparty's signature
    Proposal,
    /// A fully signed update waiting to be persisted
    Update,
    /// A fully signed override waiting to be persisted
    Override,
}

/// A staged snapshot and the phase to return to if it is abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingState {
    pub kind: PendingKind,
    pub state: LastCrossSignedState,
    pub previous_phase: ChannelPhase,
}

impl PendingState {
    /// Whether the counterparty has signed the staged snapshot.
    pub fn is_signed(&self) -> bool {
        self.kind != PendingKind::Proposal
    }
}

/// How a received snapshot compares to ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncOutcome {
    /// Both sides hold the same snapshot
    InSync,
    /// The counterparty's snapshot was newer and has been adopted
    Adopted,
    /// Our snapshot is newer; the counterparty should catch up
    AheadOfRemote,
}

/// One hosted channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedChannel {
    pub channel_id: ChannelId,
    pub peer: NodeId,
    pub chain_hash: ChainHash,
    pub is_host: bool,
    pub refund_script_pub_key: Vec<u8>,
    phase: ChannelPhase,
    init: Option<InitHostedChannel>,
    committed: Option<LastCrossSignedState>,
    pending: Option<PendingState>,
}

impl HostedChannel {
    /// Create an uninitialized channel between `local` and `peer`.
    pub fn new(local: &NodeId, peer: NodeId, chain_hash: ChainHash, is_host: bool) -> Self {
        Self {
            channel_id: ChannelId::from_nodes(local, &peer),
            peer,
            chain_hash,
            is_host,
            refund_script_pub_key: Vec::new(),
            phase: ChannelPhase::Uninitialized,
            init: None,
            committed: None,
            pending: None,
        }
    }

    /// Rebuild a channel from persisted parts.
    ///
    /// Staged rounds are never persisted, so a restored channel has none and
    /// an in-flight phase falls back to the nearest stable one.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        channel_id: ChannelId,
        peer: NodeId,
        chain_hash: ChainHash,
        is_host: bool,
        refund_script_pub_key: Vec<u8>,
        phase: ChannelPhase,
        init: Option<InitHostedChannel>,
        committed: Option<LastCrossSignedState>,
    ) -> Self {
        let phase = match phase {
            ChannelPhase::Updating => ChannelPhase::Open,
            ChannelPhase::Overridden => ChannelPhase::Disputed,
            other => other,
        };
        Self {
            channel_id,
            peer,
            chain_hash,
            is_host,
            refund_script_pub_key,
            phase,
            init,
            committed: committed.map(|s| s.with_role(is_host)),
            pending: None,
        }
    }

    pub fn phase(&self) -> ChannelPhase {
        self.phase
    }

    pub fn init(&self) -> Option<&InitHostedChannel> {
        self.init.as_ref()
    }

    /// The authoritative snapshot.
    pub fn committed(&self) -> Option<&LastCrossSignedState> {
        self.committed.as_ref()
    }

    pub fn pending(&self) -> Option<&PendingState> {
        self.pending.as_ref()
    }

    fn require_phase(&self, allowed: &[ChannelPhase], operation: &'static str) -> ChannelResult<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(ChannelError::InvalidTransition {
                phase: self.phase,
                operation,
            })
        }
    }

    fn committed_state(&self) -> ChannelResult<&LastCrossSignedState> {
        self.committed.as_ref().ok_or(ChannelError::NotEstablished)
    }

    // =========================================================================
    // Opening
    // =========================================================================

    /// Record an `invoke_hosted_channel`, sent or received.
    pub fn invoke(&mut self, refund_script_pub_key: Vec<u8>) -> ChannelResult<()> {
        self.require_phase(&[ChannelPhase::Uninitialized], "invoke")?;
        if refund_script_pub_key.len() > MAX_REFUND_SCRIPT_LEN as usize {
            return Err(ChannelError::RefundScriptTooLong {
                len: refund_script_pub_key.len(),
            });
        }
        self.refund_script_pub_key = refund_script_pub_key;
        self.phase = ChannelPhase::Invoked;
        Ok(())
    }

    /// Check an incoming chain hash against ours.
    pub fn check_chain(&self, chain_hash: &ChainHash) -> ChannelResult<()> {
        if *chain_hash != self.chain_hash {
            return Err(ChannelError::ChainHashMismatch {
                expected: self.chain_hash,
                got: *chain_hash,
            });
        }
        Ok(())
    }

    /// Record the Host's terms.
    pub fn negotiate(&mut self, init: InitHostedChannel) -> ChannelResult<()> {
        self.require_phase(&[ChannelPhase::Invoked], "negotiate")?;
        if init.initial_client_balance_msat > init.channel_capacity_msat {
            return Err(ChannelError::BalanceExceedsCapacity {
                balance: init.initial_client_balance_msat,
                capacity: init.channel_capacity_msat,
            });
        }
        self.init = Some(init);
        self.phase = ChannelPhase::Negotiating;
        Ok(())
    }

    /// The first snapshot implied by the negotiated terms, unsigned.
    pub fn initial_state(&self, blockday: Blockday) -> ChannelResult<LastCrossSignedState> {
        let init = self.init.as_ref().ok_or(ChannelError::InvalidTransition {
            phase: self.phase,
            operation: "build initial state",
        })?;
        let client = init.initial_client_balance_msat;
        let host = init.channel_capacity_msat.saturating_sub(client);
        let (local, remote) = if self.is_host {
            (host, client)
        } else {
            (client, host)
        };
        Ok(LastCrossSignedState {
            is_host: self.is_host,
            refund_script_pub_key: self.refund_script_pub_key.clone(),
            init_hosted_channel: init.clone(),
            blockday,
            local_balance_msat: local,
            remote_balance_msat: remote,
            local_updates: 0,
            remote_updates: 0,
            incoming_htlcs: Vec::new(),
            outgoing_htlcs: Vec::new(),
            remote_sig_of_local: Signature::EMPTY,
            local_sig_of_remote: Signature::EMPTY,
        })
    }

    /// Our signature over the initial state, to send to the counterparty.
    pub fn sign_initial(
        &self,
        blockday: Blockday,
        keys: &ChannelKeys<'_>,
    ) -> ChannelResult<StateUpdate> {
        self.require_phase(&[ChannelPhase::Negotiating], "sign initial state")?;
        let mut first = self.initial_state(blockday)?;
        first.local_sig_of_remote = first.sign_remote_view(keys.local)?;
        Ok(state::state_update_for(&first))
    }

    /// Establish the channel from the counterparty's signature over the
    /// initial state. Returns the first committed snapshot.
    pub fn establish(
        &mut self,
        update: &StateUpdate,
        keys: &ChannelKeys<'_>,
    ) -> ChannelResult<&LastCrossSignedState> {
        self.require_phase(&[ChannelPhase::Negotiating], "establish")?;
        if update.local_updates != 0 || update.remote_updates != 0 {
            return Err(ChannelError::CounterMismatch {
                expected_local: 0,
                expected_remote: 0,
                got_local: update.remote_updates,
                got_remote: update.local_updates,
            });
        }
        let mut first = self.initial_state(update.blockday)?;
        first.remote_sig_of_local = update.local_sig_of_remote;
        if !first.verify_remote_sig(keys.remote) {
            return Err(ChannelError::InvalidSignature("initial state"));
        }
        first.local_sig_of_remote = first.sign_remote_view(keys.local)?;

        tracing::info!(
            channel_id = %self.channel_id,
            peer = %self.peer,
            blockday = first.blockday,
            "hosted channel established"
        );
        self.phase = ChannelPhase::Open;
        Ok(&*self.committed.insert(first))
    }

    /// Compare a snapshot the counterparty sent with ours.
    ///
    /// A newer snapshot is adopted only when it carries valid signatures from
    /// both sides and at least one counter is ahead of ours. Anything else
    /// that disagrees with ours disputes the channel.
    pub fn resync(
        &mut self,
        remote: &LastCrossSignedState,
        keys: &ChannelKeys<'_>,
    ) -> ChannelResult<ResyncOutcome> {
        self.require_phase(
            &[
                ChannelPhase::Negotiating,
                ChannelPhase::Open,
                ChannelPhase::Disputed,
            ],
            "resync",
        )?;
        let theirs = remote.clone().with_role(!self.is_host).reverse();
        if !theirs.verify_remote_sig(keys.remote) || !theirs.verify_local_sig(&keys.local_public())
        {
            self.mark_disputed();
            return Err(ChannelError::InvalidSignature("remote snapshot"));
        }

        let outcome = match self.committed.as_ref() {
            Some(ours) if *ours == theirs => Some(ResyncOutcome::InSync),
            // Two different snapshots on the same counters are a conflict
            Some(ours)
                if theirs.local_updates == ours.local_updates
                    && theirs.remote_updates == ours.remote_updates =>
            {
                None
            }
            Some(ours)
                if theirs.local_updates >= ours.local_updates
                    && theirs.remote_updates >= ours.remote_updates
                    && theirs.blockday >= ours.blockday =>
            {
                Some(ResyncOutcome::Adopted)
            }
            Some(ours)
                if theirs.local_updates <= ours.local_updates
                    && theirs.remote_updates <= ours.remote_updates =>
            {
                Some(ResyncOutcome::AheadOfRemote)
            }
            Some(_) => None,
            None => Some(ResyncOutcome::Adopted),
        };
        let Some(outcome) = outcome else {
            let ours = self.committed_state()?;
            let err = ChannelError::CounterMismatch {
                expected_local: ours.local_updates,
                expected_remote: ours.remote_updates,
                got_local: theirs.local_updates,
                got_remote: theirs.remote_updates,
            };
            self.mark_disputed();
            return Err(err);
        };

        if outcome == ResyncOutcome::Adopted {
            tracing::info!(
                channel_id = %self.channel_id,
                local_updates = theirs.local_updates,
                remote_updates = theirs.remote_updates,
                "adopted counterparty snapshot"
            );
            self.init = Some(theirs.init_hosted_channel.clone());
            self.refund_script_pub_key = theirs.refund_script_pub_key.clone();
            self.committed = Some(theirs);
            self.pending = None;
            self.phase = ChannelPhase::Open;
        }
        Ok(outcome)
    }

    // =========================================================================
    // Update Rounds
    // =========================================================================

    /// Stage our own proposal for the next snapshot.
    pub fn propose(
        &mut self,
        delta: BalanceDelta,
        blockday: Blockday,
        keys: &ChannelKeys<'_>,
    ) -> ChannelResult<StateUpdate> {
        if self.pending.is_some() {
            return Err(ChannelError::PendingStateExists);
        }
        self.require_phase(&[ChannelPhase::Open], "propose update")?;
        let (proposed, update) =
            state::propose_update(self.committed_state()?, Side::Local, delta, blockday, keys)?;
        self.stage(
            PendingKind::Proposal,
            proposed,
            ChannelPhase::Updating,
            ChannelPhase::Open,
        );
        Ok(update)
    }

    /// Stage a counterparty-initiated update.
    ///
    /// Rejected while a dispute is open or an override is staged.
    pub fn stage_update(
        &mut self,
        update: &StateUpdate,
        delta: BalanceDelta,
        keys: &ChannelKeys<'_>,
    ) -> ChannelResult<&LastCrossSignedState> {
        if let Some(pending) = &self.pending {
            if pending.kind == PendingKind::Override || self.phase == ChannelPhase::Overridden {
                return Err(ChannelError::InvalidTransition {
                    phase: self.phase,
                    operation: "stage update",
                });
            }
            return Err(ChannelError::PendingStateExists);
        }
        self.require_phase(&[ChannelPhase::Open], "stage update")?;
        let next = state::apply_update(self.committed_state()?, update, Side::Remote, delta, keys)?;
        Ok(self.stage(
            PendingKind::Update,
            next,
            ChannelPhase::Updating,
            ChannelPhase::Open,
        ))
    }

    /// Complete our staged proposal with the counterparty's reply.
    pub fn stage_countersignature(
        &mut self,
        reply: &StateUpdate,
        keys: &ChannelKeys<'_>,
    ) -> ChannelResult<&LastCrossSignedState> {
        let pending = self.pending.as_mut().ok_or(ChannelError::NoPendingState)?;
        if pending.kind != PendingKind::Proposal {
            return Err(ChannelError::PendingStateExists);
        }
        pending.state = state::accept_countersignature(&pending.state, reply, keys)?;
        pending.kind = if self.phase == ChannelPhase::Overridden {
            PendingKind::Override
        } else {
            PendingKind::Update
        };
        Ok(&pending.state)
    }

    /// Stage a balance correction from the counterparty.
    ///
    /// Takes precedence over any staged update, which is abandoned.
    pub fn stage_override(
        &mut self,
        message: &StateOverride,
        keys: &ChannelKeys<'_>,
    ) -> ChannelResult<&LastCrossSignedState> {
        self.require_phase(
            &[
                ChannelPhase::Open,
                ChannelPhase::Updating,
                ChannelPhase::Disputed,
            ],
            "stage override",
        )?;
        let next = state::apply_override(self.committed_state()?, message, keys)?;

        if let Some(abandoned) = self.abandon_pending() {
            tracing::debug!(
                channel_id = %self.channel_id,
                kind = ?abandoned.kind,
                "staged round abandoned for override"
            );
        }
        let restore = self.phase;
        Ok(self.stage(
            PendingKind::Override,
            next,
            ChannelPhase::Overridden,
            restore,
        ))
    }

    /// Stage our own balance correction (Host side).
    pub fn propose_override(
        &mut self,
        local_balance_msat: u64,
        blockday: Blockday,
        keys: &ChannelKeys<'_>,
    ) -> ChannelResult<StateOverride> {
        if !self.is_host {
            return Err(ChannelError::InvalidTransition {
                phase: self.phase,
                operation: "propose override as client",
            });
        }
        self.require_phase(
            &[
                ChannelPhase::Open,
                ChannelPhase::Updating,
                ChannelPhase::Disputed,
            ],
            "propose override",
        )?;
        let (proposed, message) = state::propose_override(
            self.committed_state()?,
            blockday,
            local_balance_msat,
            keys,
        )?;
        self.abandon_pending();
        let restore = self.phase;
        self.stage(
            PendingKind::Proposal,
            proposed,
            ChannelPhase::Overridden,
            restore,
        );
        Ok(message)
    }

    fn stage(
        &mut self,
        kind: PendingKind,
        state: LastCrossSignedState,
        next_phase: ChannelPhase,
        restore_phase: ChannelPhase,
    ) -> &LastCrossSignedState {
        self.phase = next_phase;
        &self
            .pending
            .insert(PendingState {
                kind,
                state,
                previous_phase: restore_phase,
            })
            .state
    }

    /// The channel as it will look once the staged snapshot is committed.
    ///
    /// This is what the caller persists before calling
    /// [`confirm_persisted`](Self::confirm_persisted).
    pub fn committed_view(&self) -> ChannelResult<HostedChannel> {
        let pending = self.pending.as_ref().ok_or(ChannelError::NoPendingState)?;
        if !pending.is_signed() {
            return Err(ChannelError::InvalidSignature("unsigned proposal"));
        }
        Ok(HostedChannel {
            phase: ChannelPhase::Open,
            committed: Some(pending.state.clone()),
            pending: None,
            ..self.clone()
        })
    }

    /// Replace the committed snapshot with the staged one.
    ///
    /// Call only after the staged snapshot was persisted. Returns the
    /// replaced snapshot.
    pub fn confirm_persisted(&mut self) -> ChannelResult<Option<LastCrossSignedState>> {
        let pending = self.pending.take().ok_or(ChannelError::NoPendingState)?;
        if !pending.is_signed() {
            self.pending = Some(pending);
            return Err(ChannelError::InvalidSignature("unsigned proposal"));
        }

        tracing::info!(
            channel_id = %self.channel_id,
            kind = ?pending.kind,
            blockday = pending.state.blockday,
            local_updates = pending.state.local_updates,
            remote_updates = pending.state.remote_updates,
            local_balance_msat = pending.state.local_balance_msat,
            "snapshot committed"
        );
        self.phase = ChannelPhase::Open;
        Ok(self.committed.replace(pending.state))
    }

    /// Drop the staged snapshot and restore the phase it replaced.
    pub fn abandon_pending(&mut self) -> Option<PendingState> {
        let pending = self.pending.take()?;
        self.phase = pending.previous_phase;
        Some(pending)
    }

    /// A copy holding only the committed snapshot, as if any staged round
    /// had been abandoned.
    pub fn committed_only(&self) -> HostedChannel {
        let mut copy = self.clone();
        copy.abandon_pending();
        copy
    }

    /// Open a dispute. Any staged update is abandoned.
    pub fn mark_disputed(&mut self) {
        let staged_update = matches!(&self.pending, Some(p) if p.kind != PendingKind::Override);
        if staged_update {
            self.abandon_pending();
        }
        if self.phase.is_established() && self.phase != ChannelPhase::Overridden {
            tracing::warn!(channel_id = %self.channel_id, "channel disputed");
            self.phase = ChannelPhase::Disputed;
        }
    }

    /// Stop accepting updates.
    pub fn close(&mut self) {
        self.pending = None;
        self.phase = ChannelPhase::Closed;
    }
}

impl ChannelKeys<'_> {
    /// Public key matching our signing key.
    pub fn local_public(&self) -> NodeId {
        hc_crypto::public_key_from_private(self.local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hc_crypto::{identity_from_seed, PrivateKey, PublicKey};

    struct Peers {
        client_key: PrivateKey,
        client_pk: PublicKey,
        host_key: PrivateKey,
        host_pk: PublicKey,
    }

    fn peers() -> Peers {
        let (client_key, client_pk) = identity_from_seed([11u8; 32]);
        let (host_key, host_pk) = identity_from_seed([12u8; 32]);
        Peers {
            client_key,
            client_pk,
            host_key,
            host_pk,
        }
    }

    fn open_pair(p: &Peers) -> (HostedChannel, HostedChannel) {
        let mut client = HostedChannel::new(&p.client_pk, p.host_pk, ChainHash::default(), false);
        let mut host = HostedChannel::new(&p.host_pk, p.client_pk, ChainHash::default(), true);
        let init = InitHostedChannel {
            initial_client_balance_msat: 250_000_000,
            ..Default::default()
        };
        for ch in [&mut client, &mut host] {
            ch.invoke(vec![0x51]).unwrap();
            ch.negotiate(init.clone()).unwrap();
        }
        let client_keys = ChannelKeys::new(&p.client_key, &p.host_pk);
        let host_keys = ChannelKeys::new(&p.host_key, &p.client_pk);

        let from_client = client.sign_initial(10, &client_keys).unwrap();
        let from_host = host.sign_initial(10, &host_keys).unwrap();
        host.establish(&from_client, &host_keys).unwrap();
        client.establish(&from_host, &client_keys).unwrap();
        (client, host)
    }

    #[test]
    fn test_lifecycle_to_open() {
        let p = peers();
        let (client, host) = open_pair(&p);
        assert_eq!(client.phase(), ChannelPhase::Open);
        assert_eq!(client.channel_id, host.channel_id);

        let c = client.committed().unwrap();
        assert_eq!(c.local_balance_msat, 250_000_000);
        assert_eq!(c.remote_balance_msat, 750_000_000);
        assert_eq!(c.reverse(), *host.committed().unwrap());
    }

    #[test]
    fn test_invoke_twice_rejected() {
        let p = peers();
        let mut ch = HostedChannel::new(&p.client_pk, p.host_pk, ChainHash::default(), false);
        ch.invoke(vec![]).unwrap();
        assert!(matches!(
            ch.invoke(vec![]),
            Err(ChannelError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_refund_script_bound() {
        let p = peers();
        let mut ch = HostedChannel::new(&p.client_pk, p.host_pk, ChainHash::default(), false);
        assert_eq!(
            ch.invoke(vec![0u8; 35]),
            Err(ChannelError::RefundScriptTooLong { len: 35 })
        );
        assert_eq!(ch.phase(), ChannelPhase::Uninitialized);
    }

    #[test]
    fn test_staged_update_invisible_until_confirmed() {
        let p = peers();
        let (mut client, mut host) = open_pair(&p);
        let client_keys = ChannelKeys::new(&p.client_key, &p.host_pk);
        let host_keys = ChannelKeys::new(&p.host_key, &p.client_pk);

        let update = host
            .propose(BalanceDelta::pay(1_000), 10, &host_keys)
            .unwrap();
        let before = client.committed().cloned();
        client
            .stage_update(&update, BalanceDelta::pay(1_000), &client_keys)
            .unwrap();

        assert_eq!(client.phase(), ChannelPhase::Updating);
        assert_eq!(client.committed().cloned(), before);
        assert_eq!(
            client.committed_view().unwrap().committed().unwrap().remote_updates,
            1
        );

        let replaced = client.confirm_persisted().unwrap();
        assert_eq!(replaced, before);
        assert_eq!(client.phase(), ChannelPhase::Open);
        assert_eq!(client.committed().unwrap().local_balance_msat, 250_001_000);
    }

    #[test]
    fn test_abandon_restores_previous() {
        let p = peers();
        let (mut client, mut host) = open_pair(&p);
        let client_keys = ChannelKeys::new(&p.client_key, &p.host_pk);
        let host_keys = ChannelKeys::new(&p.host_key, &p.client_pk);

        let update = host.propose(BalanceDelta::ZERO, 11, &host_keys).unwrap();
        let before = client.clone();
        client
            .stage_update(&update, BalanceDelta::ZERO, &client_keys)
            .unwrap();
        client.abandon_pending().unwrap();
        assert_eq!(client, before);
    }

    #[test]
    fn test_unsigned_proposal_cannot_commit() {
        let p = peers();
        let (_, mut host) = open_pair(&p);
        let host_keys = ChannelKeys::new(&p.host_key, &p.client_pk);
        host.propose(BalanceDelta::ZERO, 10, &host_keys).unwrap();
        assert!(host.confirm_persisted().is_err());
        assert!(host.committed_view().is_err());
        assert_eq!(host.phase(), ChannelPhase::Updating);
    }

    #[test]
    fn test_override_wins_over_staged_update() {
        let p = peers();
        let (mut client, mut host) = open_pair(&p);
        let client_keys = ChannelKeys::new(&p.client_key, &p.host_pk);
        let host_keys = ChannelKeys::new(&p.host_key, &p.client_pk);

        // Client stages an update from a host proposal...
        let mut host_copy = host.clone();
        let update = host_copy.propose(BalanceDelta::ZERO, 10, &host_keys).unwrap();
        client
            .stage_update(&update, BalanceDelta::ZERO, &client_keys)
            .unwrap();

        // ...then the host overrides on the same blockday
        let message = host
            .propose_override(600_000_000, 10, &host_keys)
            .unwrap();
        assert_eq!(host.phase(), ChannelPhase::Overridden);

        client.stage_override(&message, &client_keys).unwrap();
        assert_eq!(client.phase(), ChannelPhase::Overridden);
        assert_eq!(client.pending().unwrap().kind, PendingKind::Override);

        // Updates are refused while the override is staged
        assert!(matches!(
            client.stage_update(&update, BalanceDelta::ZERO, &client_keys),
            Err(ChannelError::InvalidTransition { .. })
        ));

        client.confirm_persisted().unwrap();
        let c = client.committed().unwrap();
        assert_eq!(c.local_balance_msat, 400_000_000);
        assert_eq!(client.phase(), ChannelPhase::Open);
    }

    #[test]
    fn test_abandoned_override_returns_to_dispute_origin() {
        let p = peers();
        let (mut client, mut host) = open_pair(&p);
        let client_keys = ChannelKeys::new(&p.client_key, &p.host_pk);
        let host_keys = ChannelKeys::new(&p.host_key, &p.client_pk);

        client.mark_disputed();
        assert_eq!(client.phase(), ChannelPhase::Disputed);

        let message = host.propose_override(500_000_000, 12, &host_keys).unwrap();
        client.stage_override(&message, &client_keys).unwrap();
        client.abandon_pending().unwrap();
        assert_eq!(client.phase(), ChannelPhase::Disputed);
    }

    #[test]
    fn test_client_cannot_propose_override() {
        let p = peers();
        let (mut client, _) = open_pair(&p);
        let client_keys = ChannelKeys::new(&p.client_key, &p.host_pk);
        assert!(client.propose_override(0, 10, &client_keys).is_err());
    }

    #[test]
    fn test_resync_in_sync_and_adopt() {
        let p = peers();
        let (mut client, mut host) = open_pair(&p);
        let client_keys = ChannelKeys::new(&p.client_key, &p.host_pk);
        let host_keys = ChannelKeys::new(&p.host_key, &p.client_pk);

        let host_lcss = host.committed().cloned().unwrap();
        assert_eq!(
            client.resync(&host_lcss, &client_keys).unwrap(),
            ResyncOutcome::InSync
        );

        // Host commits a round the client never saw
        let update = client.clone().propose(BalanceDelta::ZERO, 10, &client_keys).unwrap();
        host.stage_update(&update, BalanceDelta::ZERO, &host_keys)
            .unwrap();
        host.confirm_persisted().unwrap();

        let newer = host.committed().cloned().unwrap();
        assert_eq!(
            client.resync(&newer, &client_keys).unwrap(),
            ResyncOutcome::Adopted
        );
        assert_eq!(client.committed().unwrap().local_updates, 1);

        assert_eq!(
            host.resync(&host_lcss.reverse(), &host_keys).unwrap(),
            ResyncOutcome::AheadOfRemote
        );
    }

    #[test]
    fn test_resync_keeps_override_over_replayed_snapshot() {
        let p = peers();
        let (mut client, mut host) = open_pair(&p);
        let client_keys = ChannelKeys::new(&p.client_key, &p.host_pk);
        let host_keys = ChannelKeys::new(&p.host_key, &p.client_pk);
        let before_override = client.committed().cloned().unwrap();

        let message = host.propose_override(600_000_000, 10, &host_keys).unwrap();
        client.stage_override(&message, &client_keys).unwrap();
        client.confirm_persisted().unwrap();
        let reply = state::state_update_for(client.committed().unwrap());
        host.stage_countersignature(&reply, &host_keys).unwrap();
        host.confirm_persisted().unwrap();
        let corrected = host.committed().cloned().unwrap();
        assert_eq!((corrected.local_updates, corrected.remote_updates), (1, 1));

        // The pre-override snapshot still carries both signatures
        assert_eq!(
            host.resync(&before_override, &host_keys).unwrap(),
            ResyncOutcome::AheadOfRemote
        );
        assert_eq!(host.committed(), Some(&corrected));
        assert_eq!(host.committed().unwrap().local_balance_msat, 600_000_000);
        assert_eq!(host.phase(), ChannelPhase::Open);
    }

    #[test]
    fn test_resync_disputes_conflicting_snapshot_on_same_counters() {
        let p = peers();
        let (client, mut host) = open_pair(&p);
        let host_keys = ChannelKeys::new(&p.host_key, &p.client_pk);
        let ours = host.committed().cloned().unwrap();

        let mut forked = client.committed().cloned().unwrap();
        forked.local_balance_msat = 300_000_000;
        forked.remote_balance_msat = 700_000_000;
        forked.local_sig_of_remote = forked.sign_remote_view(&p.client_key).unwrap();
        forked.remote_sig_of_local = forked.sign_view(&p.host_key).unwrap();

        assert!(matches!(
            host.resync(&forked, &host_keys),
            Err(ChannelError::CounterMismatch { .. })
        ));
        assert_eq!(host.phase(), ChannelPhase::Disputed);
        assert_eq!(host.committed(), Some(&ours));
    }

    #[test]
    fn test_restore_drops_in_flight_phase() {
        let p = peers();
        let (client, _) = open_pair(&p);
        let restored = HostedChannel::restore(
            client.channel_id,
            client.peer,
            client.chain_hash,
            client.is_host,
            client.refund_script_pub_key.clone(),
            ChannelPhase::Updating,
            client.init().cloned(),
            client.committed().cloned(),
        );
        assert_eq!(restored.phase(), ChannelPhase::Open);
        assert_eq!(restored, client);
    }
}
