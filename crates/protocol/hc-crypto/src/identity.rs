//! Node identity management.
//!
//! A node is identified by its Ed25519 public key. Keys are either generated
//! from the operating system RNG or derived from an explicit 32-byte seed, so
//! callers that need reproducible identities inject the seed rather than
//! relying on ambient randomness.

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;

use crate::error::CryptoError;
use crate::{PrivateKey, PublicKey};

/// Generate a new Ed25519 identity (keypair).
///
/// Uses the operating system's cryptographically secure random number generator.
///
/// # Example
/// ```
/// use hc_crypto::generate_identity;
///
/// let (private_key, public_key) = generate_identity();
/// ```
pub fn generate_identity() -> (PrivateKey, PublicKey) {
    let mut csprng = OsRng;
    let signing_key = SigningKey::generate(&mut csprng);
    let verifying_key = signing_key.verifying_key();

    let private_key = PrivateKey::from_signing_key(&signing_key);
    let public_key = PublicKey(verifying_key.to_bytes());

    (private_key, public_key)
}

/// Derive an identity from a 32-byte seed.
///
/// The same seed always yields the same keypair.
///
/// # Example
/// ```
/// use hc_crypto::identity_from_seed;
///
/// let (_, a) = identity_from_seed([7u8; 32]);
/// let (_, b) = identity_from_seed([7u8; 32]);
/// assert_eq!(a, b);
/// ```
pub fn identity_from_seed(seed: [u8; 32]) -> (PrivateKey, PublicKey) {
    let private_key = PrivateKey::from_bytes(seed);
    let public_key = public_key_from_private(&private_key);
    (private_key, public_key)
}

/// Compute the public key belonging to a private key.
pub fn public_key_from_private(private_key: &PrivateKey) -> PublicKey {
    PublicKey(private_key.to_signing_key().verifying_key().to_bytes())
}

/// Encode a public key as lowercase hex.
pub fn public_key_to_hex(public_key: &PublicKey) -> String {
    hex::encode(public_key.0)
}

/// Parse a hex-encoded public key.
///
/// # Errors
/// - `InvalidHex` if the string is not valid hex
/// - `InvalidKeyLength` if the decoded data isn't 32 bytes
/// - `InvalidPublicKey` if the bytes are not a valid curve point
///
/// # Example
/// ```
/// use hc_crypto::{generate_identity, public_key_from_hex, public_key_to_hex};
///
/// let (_, public_key) = generate_identity();
/// let decoded = public_key_from_hex(&public_key_to_hex(&public_key)).unwrap();
/// assert_eq!(public_key, decoded);
/// ```
pub fn public_key_from_hex(s: &str) -> Result<PublicKey, CryptoError> {
    let decoded = hex::decode(s).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;

    let bytes: [u8; 32] =
        decoded
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: 32,
                actual: decoded.len(),
            })?;

    ed25519_dalek::VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
    Ok(PublicKey(bytes))
}
