//! In-memory channel store.

use std::collections::BTreeMap;

use hc_channel::HostedChannel;
use hc_types::{ChannelId, NodeId};

use crate::error::{Result, StoreError};
use crate::traits::ChannelStore;

/// Channel store backed by a map. Nothing survives the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryChannelStore {
    channels: BTreeMap<ChannelId, HostedChannel>,
}

impl MemoryChannelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// A stored copy never carries a staged round.
fn committed_copy(channel: &HostedChannel) -> HostedChannel {
    HostedChannel::restore(
        channel.channel_id,
        channel.peer,
        channel.chain_hash,
        channel.is_host,
        channel.refund_script_pub_key.clone(),
        channel.phase(),
        channel.init().cloned(),
        channel.committed().cloned(),
    )
}

impl ChannelStore for MemoryChannelStore {
    fn get(&self, channel_id: &ChannelId) -> Result<Option<HostedChannel>> {
        Ok(self.channels.get(channel_id).cloned())
    }

    fn get_by_peer(&self, peer: &NodeId) -> Result<Option<HostedChannel>> {
        Ok(self.channels.values().find(|c| c.peer == *peer).cloned())
    }

    fn put(&mut self, channel: &HostedChannel) -> Result<()> {
        self.channels
            .insert(channel.channel_id, committed_copy(channel));
        Ok(())
    }

    fn list(&self) -> Result<Vec<HostedChannel>> {
        Ok(self.channels.values().cloned().collect())
    }

    fn delete(&mut self, channel_id: &ChannelId) -> Result<()> {
        self.channels
            .remove(channel_id)
            .map(|_| ())
            .ok_or(StoreError::ChannelNotFound(*channel_id))
    }
}
