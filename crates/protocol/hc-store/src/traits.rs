//! Trait definitions for storage components.
//!
//! Implementations may vary (in-memory or SQLite) but must satisfy these
//! interfaces.

use hc_channel::HostedChannel;
use hc_types::{ChannelId, NodeId};

use crate::error::Result;

// =============================================================================
// Channel Storage
// =============================================================================

/// Trait for storing hosted channel aggregates.
///
/// Only the committed part of a channel is stored. A staged round is never
/// written, so a channel read back has no pending snapshot.
pub trait ChannelStore {
    /// Get a channel by identifier.
    ///
    /// Returns `None` if the channel doesn't exist.
    fn get(&self, channel_id: &ChannelId) -> Result<Option<HostedChannel>>;

    /// Get the channel shared with a peer.
    fn get_by_peer(&self, peer: &NodeId) -> Result<Option<HostedChannel>>;

    /// Insert or replace a channel.
    ///
    /// A put is crash-consistent: the previous record is either fully
    /// replaced or left untouched.
    fn put(&mut self, channel: &HostedChannel) -> Result<()>;

    /// List all stored channels.
    fn list(&self) -> Result<Vec<HostedChannel>>;

    /// Delete a channel.
    ///
    /// Returns an error if the channel doesn't exist.
    fn delete(&mut self, channel_id: &ChannelId) -> Result<()>;
}
