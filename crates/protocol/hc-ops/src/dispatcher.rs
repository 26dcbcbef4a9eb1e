//! Inbound message dispatch.
//!
//! [`Dispatcher::handle_inbound`] is the entry point for every payload a
//! peer delivers. Malformed input is logged and discarded; a message the
//! channel refuses is logged and reported as rejected. Neither affects
//! other channels, the connection or the process.

use std::sync::Arc;

use hc_channel::{state_update_for, ChannelError, HostedChannel, PendingKind, ResyncOutcome};
use hc_store::ChannelStore;
use hc_types::{ChannelPhase, NodeId, MAX_SECRET_LEN};
use hc_wire::{
    decode_message, EncodeError, InitHostedChannel, InvokeHostedChannel, LastCrossSignedState,
    Message, MessageType, StateOverride, StateUpdate,
};
use tracing::{debug, info, warn};

use crate::error::{OpsError, OpsResult};
use crate::manager::{ChannelManager, ChannelSlot};
use crate::transport::Transport;

/// What became of one inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// The message was applied
    Accepted(MessageType),
    /// Well formed, but refused; the channel is unchanged
    Rejected {
        message_type: MessageType,
        reason: String,
    },
    /// Understood, but not handled by this node
    Ignored(MessageType),
    /// Could not be decoded
    Discarded,
}

/// Routes decoded messages to channel operations.
pub struct Dispatcher<S, T> {
    manager: Arc<ChannelManager<S, T>>,
}

impl<S, T> Clone for Dispatcher<S, T> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
        }
    }
}

impl<S, T> Dispatcher<S, T>
where
    S: ChannelStore + Send,
    T: Transport,
{
    pub fn new(manager: ChannelManager<S, T>) -> Self {
        Self {
            manager: Arc::new(manager),
        }
    }

    pub fn manager(&self) -> &ChannelManager<S, T> {
        &self.manager
    }

    /// Handle one payload delivered by the transport.
    ///
    /// Returns `Err` only for local failures (storage, transport); anything
    /// caused by the peer's input is reported through [`InboundOutcome`].
    pub async fn handle_inbound(&self, peer: &NodeId, payload: &[u8]) -> OpsResult<InboundOutcome> {
        let message = match decode_message(payload, self.manager.config().wire) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    peer = %peer,
                    error = %e,
                    len = payload.len(),
                    "discarding malformed message"
                );
                return Ok(InboundOutcome::Discarded);
            }
        };

        let message_type = message.message_type();
        debug!(peer = %peer, message_type = %message_type, "received message");

        let result = match message {
            Message::InvokeHostedChannel(invoke) => self.handle_invoke(peer, invoke).await,
            Message::InitHostedChannel(init) => self.handle_init(peer, init).await,
            Message::LastCrossSignedState(state) => self.handle_snapshot(peer, state).await,
            Message::StateUpdate(update) => self.handle_state_update(peer, update).await,
            Message::StateOverride(message) => self.handle_state_override(peer, message).await,
            Message::UpdateAddHtlc(_)
            | Message::UpdateFulfillHtlc(_)
            | Message::UpdateFailHtlc(_)
            | Message::UpdateFailMalformedHtlc(_) => {
                debug!(peer = %peer, message_type = %message_type, "HTLC routing not handled");
                return Ok(InboundOutcome::Ignored(message_type));
            }
        };

        match result {
            Ok(()) => Ok(InboundOutcome::Accepted(message_type)),
            Err(e) if e.is_peer_fault() => {
                warn!(
                    peer = %peer,
                    message_type = %message_type,
                    error = %e,
                    "message rejected"
                );
                Ok(InboundOutcome::Rejected {
                    message_type,
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Client side: ask `peer` to host a channel.
    ///
    /// On an established channel this is a reconnect: the Host answers with
    /// its snapshot and the two are compared. An oversized refund script or
    /// secret is refused before anything is stored or sent.
    pub async fn invoke(&self, peer: &NodeId, refund_script_pub_key: Vec<u8>, secret: Vec<u8>) -> OpsResult<()> {
        if secret.len() > MAX_SECRET_LEN as usize {
            return Err(EncodeError::FieldTooLarge {
                field: "secret",
                len: secret.len(),
                max: MAX_SECRET_LEN as usize,
            }
            .into());
        }
        let manager = &self.manager;
        let chain_hash = manager.config().chain_hash()?;
        let mut slot = manager.lock_channel(peer).await?;

        let existing = slot
            .channel
            .as_ref()
            .map(|c| (c.phase(), c.refund_script_pub_key.clone()));
        let refund = match existing {
            Some((phase, refund)) if phase.is_established() => refund,
            Some((ChannelPhase::Closed, _)) => {
                return Err(OpsError::ChannelAlreadyExists(*peer));
            }
            _ => {
                let mut channel = HostedChannel::new(&manager.local_id(), *peer, chain_hash, false);
                channel.invoke(refund_script_pub_key)?;
                manager.persist(&channel)?;
                let refund = channel.refund_script_pub_key.clone();
                slot.channel = Some(channel);
                refund
            }
        };

        let message = Message::InvokeHostedChannel(InvokeHostedChannel {
            chain_hash,
            refund_script_pub_key: refund,
            secret,
        });
        manager.send(peer, &message).await?;
        info!(peer = %peer, "hosted channel invoked");
        Ok(())
    }

    // =========================================================================
    // Opening
    // =========================================================================

    async fn handle_invoke(&self, peer: &NodeId, invoke: InvokeHostedChannel) -> OpsResult<()> {
        let manager = &self.manager;
        let config = manager.config();
        if !config.host.enabled {
            return Err(OpsError::HostingDisabled);
        }
        if !config.host.accepts_secret(&invoke.secret) {
            return Err(OpsError::SecretRejected);
        }

        let mut slot = manager.lock_channel(peer).await?;
        if let Some(existing) = slot.channel.as_ref() {
            if existing.phase().is_established() {
                existing.check_chain(&invoke.chain_hash)?;
                debug!(channel_id = %existing.channel_id, "re-invoke on established channel");
                return manager.send_snapshot(existing).await;
            }
            if existing.phase() == ChannelPhase::Closed {
                return Err(OpsError::ChannelAlreadyExists(*peer));
            }
        }

        let init = config.channel.to_init()?;
        let mut channel = HostedChannel::new(&manager.local_id(), *peer, config.chain_hash()?, true);
        channel.check_chain(&invoke.chain_hash)?;
        channel.invoke(invoke.refund_script_pub_key)?;
        channel.negotiate(init.clone())?;
        manager.persist(&channel)?;
        info!(
            channel_id = %channel.channel_id,
            peer = %peer,
            capacity_msat = init.channel_capacity_msat,
            "offering hosted channel"
        );
        slot.channel = Some(channel);

        manager.send(peer, &Message::InitHostedChannel(init)).await
    }

    async fn handle_init(&self, peer: &NodeId, init: InitHostedChannel) -> OpsResult<()> {
        let manager = &self.manager;
        let mut slot = manager.lock_channel(peer).await?;
        let channel = slot
            .channel
            .as_mut()
            .ok_or(OpsError::ChannelNotFound(*peer))?;
        if channel.is_host {
            return Err(unexpected(MessageType::InitHostedChannel, channel));
        }

        let mut next = channel.clone();
        next.negotiate(init)?;
        let update = next.sign_initial(manager.blockday(), &manager.keys(peer))?;
        manager.persist(&next)?;
        *channel = next;

        manager.send(peer, &Message::StateUpdate(update)).await
    }

    /// Compare the peer's snapshot with ours.
    ///
    /// This both completes opening on the Client and resynchronizes an
    /// established channel after a reconnect.
    async fn handle_snapshot(&self, peer: &NodeId, state: LastCrossSignedState) -> OpsResult<()> {
        let manager = &self.manager;
        let mut slot = manager.lock_channel(peer).await?;
        let channel = slot
            .channel
            .as_mut()
            .ok_or(OpsError::ChannelNotFound(*peer))?;

        if channel.phase() == ChannelPhase::Negotiating
            && channel.init() != Some(&state.init_hosted_channel)
        {
            return Err(ChannelError::InvalidTransition {
                phase: channel.phase(),
                operation: "adopt snapshot with different terms",
            }
            .into());
        }

        let mut next = channel.clone();
        match next.resync(&state, &manager.keys(peer)) {
            Ok(ResyncOutcome::InSync) => Ok(()),
            Ok(ResyncOutcome::Adopted) => {
                manager.persist(&next)?;
                *channel = next;
                Ok(())
            }
            Ok(ResyncOutcome::AheadOfRemote) => manager.send_snapshot(channel).await,
            Err(e) => {
                if next.phase() != channel.phase() {
                    manager.persist(&next)?;
                    *channel = next;
                }
                Err(e.into())
            }
        }
    }

    // =========================================================================
    // Update Rounds
    // =========================================================================

    async fn handle_state_update(&self, peer: &NodeId, update: StateUpdate) -> OpsResult<()> {
        let manager = &self.manager;
        let mut guard = manager.lock_channel(peer).await?;
        let ChannelSlot {
            channel,
            expected_remote_delta,
            ..
        } = &mut *guard;
        let channel = channel.as_mut().ok_or(OpsError::ChannelNotFound(*peer))?;
        let keys = manager.keys(peer);

        // The counterparty's signature over the first snapshot
        if channel.phase() == ChannelPhase::Negotiating {
            let mut next = channel.clone();
            next.establish(&update, &keys)?;
            manager.persist(&next)?;
            *channel = next;
            if channel.is_host {
                manager.send_snapshot(channel).await?;
            }
            return Ok(());
        }

        // The reply to our own proposal
        if matches!(channel.pending(), Some(p) if p.kind == PendingKind::Proposal) {
            if let Err(e) = channel.stage_countersignature(&update, &keys) {
                channel.abandon_pending();
                return Err(e.into());
            }
            return manager.commit_staged(channel);
        }

        // A proposal from the counterparty
        let delta = std::mem::take(expected_remote_delta);
        if let Err(e) = channel.stage_update(&update, delta, &keys) {
            *expected_remote_delta = delta;
            return Err(e.into());
        }
        manager.commit_staged(channel)?;

        let reply = state_update_for(committed(channel)?);
        manager.send(peer, &Message::StateUpdate(reply)).await
    }

    async fn handle_state_override(&self, peer: &NodeId, message: StateOverride) -> OpsResult<()> {
        let manager = &self.manager;
        let mut slot = manager.lock_channel(peer).await?;
        let channel = slot
            .channel
            .as_mut()
            .ok_or(OpsError::ChannelNotFound(*peer))?;
        if channel.is_host {
            return Err(unexpected(MessageType::StateOverride, channel));
        }

        channel.stage_override(&message, &manager.keys(peer))?;
        manager.commit_staged(channel)?;

        let reply = state_update_for(committed(channel)?);
        manager.send(peer, &Message::StateUpdate(reply)).await
    }
}

fn unexpected(message_type: MessageType, channel: &HostedChannel) -> OpsError {
    OpsError::UnexpectedMessage {
        message_type,
        phase: channel.phase(),
    }
}

fn committed(channel: &HostedChannel) -> OpsResult<&LastCrossSignedState> {
    channel
        .committed()
        .ok_or(OpsError::Channel(ChannelError::NotEstablished))
}
