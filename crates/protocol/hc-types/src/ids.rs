//! Identifiers.
//!
//! - [`ChannelId`]: 32-byte identifier of one hosted channel
//! - [`ChainHash`]: 32-byte identifier of the target ledger
//! - [`NodeId`]: a node's public key

use hc_crypto::{tagged_hash, PublicKey};

use crate::error::ParseIdError;

/// A node is addressed by its public key.
pub type NodeId = PublicKey;

/// Domain separator for channel identifier derivation.
const DOMAIN_CHANNEL_ID: u8 = 0x03;

fn parse_32(s: &str) -> Result<[u8; 32], ParseIdError> {
    let decoded = hex::decode(s).map_err(|e| ParseIdError::InvalidHex(e.to_string()))?;
    decoded
        .as_slice()
        .try_into()
        .map_err(|_| ParseIdError::InvalidLength {
            expected: 32,
            actual: decoded.len(),
        })
}

/// Identifier of one hosted channel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ChannelId(pub [u8; 32]);

impl ChannelId {
    /// Derive the channel identifier shared by two nodes.
    ///
    /// ```text
    /// ChannelId = H(0x03 || min(a, b) || max(a, b))
    /// ```
    ///
    /// The result does not depend on argument order, so both peers compute
    /// the same identifier without exchanging it.
    pub fn from_nodes(a: &NodeId, b: &NodeId) -> Self {
        let (lo, hi) = if a.0 <= b.0 { (a, b) } else { (b, a) };
        ChannelId(tagged_hash(DOMAIN_CHANNEL_ID, &[&lo.0, &hi.0]).0)
    }

    /// Parse a hex-encoded channel identifier.
    pub fn from_hex(s: &str) -> Result<Self, ParseIdError> {
        parse_32(s).map(ChannelId)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChannelId({}...)", hex::encode(&self.0[..8]))
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Identifier of the ledger a channel is bound to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChainHash(pub [u8; 32]);

impl ChainHash {
    /// Bitcoin mainnet genesis block hash, in display byte order.
    pub const BITCOIN_MAINNET: ChainHash = ChainHash([
        0x00, 0x00, 0x00, 0x00, 0x00, 0x19, 0xd6, 0x68, 0x9c, 0x08, 0x5a, 0xe1, 0x65, 0x83, 0x1e,
        0x93, 0x4f, 0xf7, 0x63, 0xae, 0x46, 0xa2, 0xa6, 0xc1, 0x72, 0xb3, 0xf1, 0xb6, 0x0a, 0x8c,
        0xe2, 0x6f,
    ]);

    /// Parse a hex-encoded chain hash.
    pub fn from_hex(s: &str) -> Result<Self, ParseIdError> {
        parse_32(s).map(ChainHash)
    }
}

impl std::fmt::Debug for ChainHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChainHash({}...)", hex::encode(&self.0[..8]))
    }
}

impl std::fmt::Display for ChainHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
