//! Cryptographic primitives for hosted channels.
//!
//! This crate provides the cryptography the hosted-channel protocol relies on:
//!
//! - **Hashing**: SHA-256, bare and domain-separated
//! - **Identity**: Ed25519 keypair generation, seeded derivation, hex encoding
//! - **Signatures**: signing and verification of state digests
//!
//! # Example
//!
//! ```
//! use hc_crypto::{generate_identity, sign, tagged_hash, verify};
//!
//! let (private_key, public_key) = generate_identity();
//!
//! let digest = tagged_hash(0x04, &[b"state bytes"]);
//! let signature = sign(&private_key, &digest.0);
//! assert!(verify(&public_key, &digest.0, &signature));
//! ```

mod error;
mod hash;
mod identity;
mod signature;

pub use error::CryptoError;
pub use hash::{sha256, tagged_hash};
pub use identity::{
    generate_identity, identity_from_seed, public_key_from_hex, public_key_from_private,
    public_key_to_hex,
};
pub use signature::{sign, verify, verify_strict};

use ed25519_dalek::SigningKey;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Raw-bytes accessors, a short hex `Debug` and `AsRef<[u8]>` for a
/// public fixed-size byte newtype.
macro_rules! byte_newtype {
    ($name:ident, $len:literal) => {
        impl $name {
            pub fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({}..)", stringify!($name), hex::encode(&self.0[..8]))
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

/// A 32-byte SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Hash(pub [u8; 32]);

byte_newtype!(Hash, 32);

impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// An Ed25519 public key. Doubles as a node identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey(pub [u8; 32]);

byte_newtype!(PublicKey, 32);

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// An Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; 64]);

byte_newtype!(Signature, 64);

impl Signature {
    /// All zeroes; stands in until the counterparty has signed.
    pub const EMPTY: Signature = Signature([0u8; 64]);

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// An Ed25519 signing seed.
///
/// The bytes are wiped on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; 32]);

impl PrivateKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub(crate) fn from_signing_key(key: &SigningKey) -> Self {
        Self(key.to_bytes())
    }

    pub(crate) fn to_signing_key(&self) -> SigningKey {
        SigningKey::from_bytes(&self.0)
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}
