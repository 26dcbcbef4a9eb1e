//! Domain-separated SHA-256.
//!
//! Every digest the protocol signs or derives identifiers from is computed as
//! ```text
//! H(domain || part_0 || part_1 || ...)
//! ```
//! so that a digest produced for one purpose can never be replayed as another.

use sha2::{Digest, Sha256};

use crate::Hash;

/// Plain SHA-256 of the given bytes (no domain separation).
///
/// Used where an external format mandates a bare digest, e.g. payment hashes
/// and `sha256_of_onion`.
///
/// # Example
/// ```
/// use hc_crypto::sha256;
///
/// let hash = sha256(b"preimage");
/// assert_eq!(hash.0.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> Hash {
    Hash(Sha256::digest(data).into())
}

/// SHA-256 over a domain byte followed by each part in order.
///
/// # Example
/// ```
/// use hc_crypto::tagged_hash;
///
/// let a = tagged_hash(0x01, &[b"abc"]);
/// let b = tagged_hash(0x02, &[b"abc"]);
/// assert_ne!(a, b);
/// ```
pub fn tagged_hash(domain: u8, parts: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([domain]);
    for part in parts {
        hasher.update(part);
    }
    Hash(hasher.finalize().into())
}
