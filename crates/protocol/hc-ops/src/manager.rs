//! Per-channel serialization of state rounds.
//!
//! Every channel has its own async lock. A round holds that lock from the
//! moment a snapshot is staged until it is persisted and committed (or
//! abandoned), so a reader that takes the lock only ever sees committed
//! snapshots. Rounds on different channels never wait on each other.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use hc_channel::{BalanceDelta, ChannelError, ChannelKeys, HostedChannel};
use hc_crypto::{public_key_from_private, PrivateKey};
use hc_store::ChannelStore;
use hc_types::{blockday_from_height, Blockday, ChannelId, MilliSatoshi, NodeId};
use hc_wire::{encode_message, Message, StateOverride, StateUpdate};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::config::HostedConfig;
use crate::error::{OpsError, OpsResult};
use crate::transport::Transport;

/// What the manager holds for one channel.
#[derive(Debug, Default)]
pub struct ChannelSlot {
    /// The aggregate, once loaded or created
    pub channel: Option<HostedChannel>,
    /// Balance change expected from the next counterparty update
    pub expected_remote_delta: BalanceDelta,
    loaded: bool,
}

type Slots = Mutex<HashMap<ChannelId, Arc<AsyncMutex<ChannelSlot>>>>;

/// Exclusive access to one channel's slot.
///
/// On release, a slot that holds no channel and no expectation is dropped
/// from the manager unless another task is already waiting for it, so
/// messages from unknown peers leave nothing behind.
pub(crate) struct SlotGuard<'a> {
    guard: OwnedMutexGuard<ChannelSlot>,
    channel_id: ChannelId,
    slots: &'a Slots,
}

impl Deref for SlotGuard<'_> {
    type Target = ChannelSlot;

    fn deref(&self) -> &ChannelSlot {
        &self.guard
    }
}

impl DerefMut for SlotGuard<'_> {
    fn deref_mut(&mut self) -> &mut ChannelSlot {
        &mut self.guard
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        if self.guard.channel.is_some() || !self.guard.expected_remote_delta.is_zero() {
            return;
        }
        let Ok(mut slots) = self.slots.lock() else {
            return;
        };
        let ours = OwnedMutexGuard::mutex(&self.guard);
        // One reference in the map and one in this guard
        let idle = matches!(
            slots.get(&self.channel_id),
            Some(slot) if Arc::ptr_eq(slot, ours) && Arc::strong_count(slot) == 2
        );
        if idle {
            slots.remove(&self.channel_id);
        }
    }
}

/// Serializes rounds per channel and owns the collaborators.
pub struct ChannelManager<S, T> {
    identity: PrivateKey,
    local_id: NodeId,
    config: HostedConfig,
    store: Mutex<S>,
    transport: T,
    blockday: AtomicU32,
    slots: Slots,
}

impl<S, T> ChannelManager<S, T>
where
    S: ChannelStore + Send,
    T: Transport,
{
    pub fn new(identity: PrivateKey, config: HostedConfig, store: S, transport: T) -> Self {
        let local_id = public_key_from_private(&identity);
        Self {
            identity,
            local_id,
            config,
            store: Mutex::new(store),
            transport,
            blockday: AtomicU32::new(0),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// This node's identifier.
    pub fn local_id(&self) -> NodeId {
        self.local_id
    }

    pub fn config(&self) -> &HostedConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Blockday stamped on snapshots this node proposes.
    pub fn blockday(&self) -> Blockday {
        self.blockday.load(Ordering::SeqCst)
    }

    /// Set the current blockday. It never moves backwards.
    pub fn set_blockday(&self, blockday: Blockday) {
        self.blockday.fetch_max(blockday, Ordering::SeqCst);
    }

    /// Set the current blockday from a chain tip height.
    pub fn set_block_height(&self, height: u32) {
        self.set_blockday(blockday_from_height(height));
    }

    /// Identifier of the channel shared with `peer`.
    pub fn channel_id(&self, peer: &NodeId) -> ChannelId {
        ChannelId::from_nodes(&self.local_id, peer)
    }

    pub(crate) fn keys<'a>(&'a self, peer: &'a NodeId) -> ChannelKeys<'a> {
        ChannelKeys::new(&self.identity, peer)
    }

    // =========================================================================
    // Slots
    // =========================================================================

    /// Take the channel's lock, loading it from the store on first use.
    pub(crate) async fn lock_channel(&self, peer: &NodeId) -> OpsResult<SlotGuard<'_>> {
        let channel_id = self.channel_id(peer);
        let slot = {
            let mut slots = self
                .slots
                .lock()
                .map_err(|_| OpsError::LockPoisoned("channel slots".into()))?;
            Arc::clone(slots.entry(channel_id).or_default())
        };

        let mut guard = SlotGuard {
            guard: slot.lock_owned().await,
            channel_id,
            slots: &self.slots,
        };
        if !guard.loaded {
            guard.channel = self.with_store(|store| store.get(&channel_id))?;
            guard.loaded = true;
            debug!(
                channel_id = %channel_id,
                found = guard.channel.is_some(),
                "channel slot loaded"
            );
        }
        Ok(guard)
    }

    /// The committed state of the channel with `peer`.
    ///
    /// A proposal still waiting for the peer's reply is left out.
    pub async fn channel(&self, peer: &NodeId) -> OpsResult<Option<HostedChannel>> {
        let slot = self.lock_channel(peer).await?;
        Ok(slot.channel.as_ref().map(HostedChannel::committed_only))
    }

    /// Record the balance change the next counterparty update must carry.
    ///
    /// Updates carry no amount on the wire; both sides agree on it out of
    /// band (an invoice, a forwarded HTLC). An update arriving without an
    /// expectation moves no funds.
    pub async fn expect_remote_delta(&self, peer: &NodeId, delta: BalanceDelta) -> OpsResult<()> {
        let mut slot = self.lock_channel(peer).await?;
        slot.expected_remote_delta = delta;
        Ok(())
    }

    // =========================================================================
    // Collaborators
    // =========================================================================

    fn with_store<R>(
        &self,
        f: impl FnOnce(&mut S) -> hc_store::Result<R>,
    ) -> OpsResult<R> {
        let mut store = self
            .store
            .lock()
            .map_err(|_| OpsError::LockPoisoned("channel store".into()))?;
        Ok(f(&mut *store)?)
    }

    /// Write a channel to the store.
    pub(crate) fn persist(&self, channel: &HostedChannel) -> OpsResult<()> {
        self.with_store(|store| store.put(channel))
    }

    /// Persist the staged snapshot, then commit it.
    ///
    /// If the store refuses, the staged round is abandoned and the previous
    /// snapshot stays authoritative.
    pub(crate) fn commit_staged(&self, channel: &mut HostedChannel) -> OpsResult<()> {
        let view = channel.committed_view()?;
        if let Err(e) = self.persist(&view) {
            warn!(
                channel_id = %channel.channel_id,
                error = %e,
                "failed to persist staged snapshot, abandoning round"
            );
            channel.abandon_pending();
            return Err(e);
        }
        channel.confirm_persisted()?;
        Ok(())
    }

    /// Frame and send one message.
    pub(crate) async fn send(&self, peer: &NodeId, message: &Message) -> OpsResult<()> {
        let payload = encode_message(message)?;
        debug!(
            peer = %peer,
            message_type = %message.message_type(),
            len = payload.len(),
            "sending message"
        );
        self.transport.send(peer, payload).await
    }

    /// Send our committed snapshot so the peer can resynchronize.
    pub(crate) async fn send_snapshot(&self, channel: &HostedChannel) -> OpsResult<()> {
        let state = channel
            .committed()
            .cloned()
            .ok_or(OpsError::Channel(ChannelError::NotEstablished))?;
        self.send(&channel.peer, &Message::LastCrossSignedState(state))
            .await
    }

    // =========================================================================
    // Rounds We Start
    // =========================================================================

    /// Propose the next snapshot and send it to the peer.
    ///
    /// `delta` is the amount this node moves to the peer. The proposal stays
    /// staged (and unpersisted) until the peer's reply arrives.
    pub async fn propose_update(&self, peer: &NodeId, delta: BalanceDelta) -> OpsResult<StateUpdate> {
        let mut slot = self.lock_channel(peer).await?;
        let channel = slot
            .channel
            .as_mut()
            .ok_or(OpsError::ChannelNotFound(*peer))?;

        let update = channel.propose(delta, self.blockday(), &self.keys(peer))?;
        if let Err(e) = self.send(peer, &Message::StateUpdate(update.clone())).await {
            channel.abandon_pending();
            return Err(e);
        }
        info!(
            channel_id = %channel.channel_id,
            delta = ?delta,
            local_updates = update.local_updates,
            "update proposed"
        );
        Ok(update)
    }

    /// Host only: propose a balance correction and send it to the client.
    pub async fn propose_override(
        &self,
        peer: &NodeId,
        local_balance_msat: MilliSatoshi,
    ) -> OpsResult<StateOverride> {
        let mut slot = self.lock_channel(peer).await?;
        let channel = slot
            .channel
            .as_mut()
            .ok_or(OpsError::ChannelNotFound(*peer))?;

        let message = channel.propose_override(local_balance_msat, self.blockday(), &self.keys(peer))?;
        if let Err(e) = self.send(peer, &Message::StateOverride(message.clone())).await {
            channel.abandon_pending();
            return Err(e);
        }
        info!(
            channel_id = %channel.channel_id,
            local_balance_msat,
            "override proposed"
        );
        Ok(message)
    }

    /// Open a dispute on the channel with `peer`.
    pub async fn mark_disputed(&self, peer: &NodeId) -> OpsResult<()> {
        let mut slot = self.lock_channel(peer).await?;
        let channel = slot
            .channel
            .as_mut()
            .ok_or(OpsError::ChannelNotFound(*peer))?;
        let mut next = channel.clone();
        next.mark_disputed();
        self.persist(&next)?;
        *channel = next;
        Ok(())
    }
}
