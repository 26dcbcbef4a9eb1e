//! Outbound message delivery.

use async_trait::async_trait;
use hc_types::NodeId;

use crate::error::OpsResult;

/// Delivers one payload to one peer.
///
/// Sends are fire-and-forget: there is no request/response correlation, and
/// a peer that never answers is the transport's concern. Each payload is one
/// complete framed message (`[type][body]`).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a payload to a peer.
    async fn send(&self, peer: &NodeId, payload: Vec<u8>) -> OpsResult<()>;
}
