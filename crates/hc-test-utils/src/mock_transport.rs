//! Mock implementation of the `Transport` trait for testing.
//!
//! Records every payload handed to it so tests can inspect what a node
//! sent and deliver it to another node.

use async_trait::async_trait;
use hc_ops::{OpsError, OpsResult, Transport};
use hc_types::NodeId;
use hc_wire::{decode_message, DecodeLimits, Message};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockTransportInner {
    /// Sent payloads for assertion (spy pattern).
    sent: Vec<(NodeId, Vec<u8>)>,
    /// When true, every send fails.
    should_fail: bool,
}

/// A recording transport.
///
/// Uses `Arc<Mutex<...>>` internally, so it is cheap to clone and all clones
/// share the same state.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the mock to fail all sends.
    pub fn with_failure(self) -> Self {
        self.inner.lock().unwrap().should_fail = true;
        self
    }

    /// Set the failure mode at runtime.
    pub fn set_should_fail(&self, should_fail: bool) {
        self.inner.lock().unwrap().should_fail = should_fail;
    }

    // =========================================================================
    // Assertion Helpers
    // =========================================================================

    /// All payloads sent so far.
    pub fn sent(&self) -> Vec<(NodeId, Vec<u8>)> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Number of payloads sent so far.
    pub fn sent_count(&self) -> usize {
        self.inner.lock().unwrap().sent.len()
    }

    /// Remove and return every recorded payload.
    pub fn take_sent(&self) -> Vec<(NodeId, Vec<u8>)> {
        std::mem::take(&mut self.inner.lock().unwrap().sent)
    }

    /// Sent payloads decoded with default limits.
    pub fn sent_messages(&self) -> Vec<(NodeId, Message)> {
        self.sent()
            .into_iter()
            .map(|(peer, payload)| {
                let message =
                    decode_message(&payload, DecodeLimits::default()).expect("sent payload decodes");
                (peer, message)
            })
            .collect()
    }

    /// The most recent message sent, decoded.
    pub fn last_message(&self) -> Option<Message> {
        self.sent_messages().pop().map(|(_, message)| message)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, peer: &NodeId, payload: Vec<u8>) -> OpsResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.should_fail {
            return Err(OpsError::transport("mock transport configured to fail"));
        }
        inner.sent.push((*peer, payload));
        Ok(())
    }
}
