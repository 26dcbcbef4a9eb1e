//! Signature creation and verification.
//!
//! Signatures are computed over the SHA-256 of the message:
//! ```text
//! signature = Ed25519_Sign(private_key, H(message))
//! ```

use ed25519_dalek::{Signature as DalekSignature, Signer, Verifier, VerifyingKey};

use crate::error::CryptoError;
use crate::hash::sha256;
use crate::{PrivateKey, PublicKey, Signature};

/// Sign a message with a private key.
///
/// The message is first hashed, then the hash is signed.
///
/// # Example
/// ```
/// use hc_crypto::{generate_identity, sign, verify};
///
/// let (private_key, public_key) = generate_identity();
/// let message = b"Hello, world!";
/// let signature = sign(&private_key, message);
/// assert!(verify(&public_key, message, &signature));
/// ```
pub fn sign(private_key: &PrivateKey, message: &[u8]) -> Signature {
    let message_hash = sha256(message);

    let signing_key = private_key.to_signing_key();
    let sig: DalekSignature = signing_key.sign(&message_hash.0);

    Signature(sig.to_bytes())
}

/// Verify a signature against a public key and message.
///
/// # Returns
/// `true` if the signature is valid, `false` otherwise.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
    verify_strict(public_key, message, signature).is_ok()
}

/// Verify a signature, reporting why it failed.
///
/// # Errors
/// - `InvalidPublicKey` if the key bytes are not a curve point
/// - `SignatureVerificationFailed` if the signature does not match
pub fn verify_strict(
    public_key: &PublicKey,
    message: &[u8],
    signature: &Signature,
) -> Result<(), CryptoError> {
    let message_hash = sha256(message);

    let verifying_key =
        VerifyingKey::from_bytes(&public_key.0).map_err(|_| CryptoError::InvalidPublicKey)?;
    let sig = DalekSignature::from_bytes(&signature.0);

    verifying_key
        .verify(&message_hash.0, &sig)
        .map_err(|_| CryptoError::SignatureVerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate_identity;

    #[test]
    fn test_sign_verify() {
        let (private_key, public_key) = generate_identity();
        let message = b"test message";
        let signature = sign(&private_key, message);
        assert!(verify(&public_key, message, &signature));
    }

    #[test]
    fn test_wrong_key_fails() {
        let (private_key1, _) = generate_identity();
        let (_, public_key2) = generate_identity();
        let message = b"test message";
        let signature = sign(&private_key1, message);
        assert!(!verify(&public_key2, message, &signature));
    }

    #[test]
    fn test_tampered_message_fails() {
        let (private_key, public_key) = generate_identity();
        let signature = sign(&private_key, b"test message");
        assert_eq!(
            verify_strict(&public_key, b"different message", &signature),
            Err(CryptoError::SignatureVerificationFailed)
        );
    }

    #[test]
    fn test_zero_signature_rejected() {
        let (_, public_key) = generate_identity();
        assert!(!verify(&public_key, b"anything", &Signature([0u8; 64])));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let (private_key, _) = generate_identity();
        assert_eq!(sign(&private_key, b"m"), sign(&private_key, b"m"));
    }
}
