//! Signatures over cross-signed state.
//!
//! ```text
//! digest    = H(0x04 || signing_bytes)
//! signature = Ed25519_Sign(key, H(digest))
//! ```
//!
//! `signing_bytes` is a fixed-order serialization of one view of the state:
//! is_host, refund script (length-prefixed), capacity, initial client balance,
//! blockday, local balance, remote balance, local updates, remote updates,
//! then every incoming and every outgoing HTLC record. Signatures are left
//! out. Each peer signs the *other* peer's view, so a valid
//! `remote_sig_of_local` proves the counterparty agreed to our view.

use hc_crypto::{sign, tagged_hash, verify, Hash, PrivateKey, PublicKey, Signature};

use crate::codec::{write_u32, write_u64, write_var_bytes};
use crate::error::EncodeError;
use crate::hosted::LastCrossSignedState;
use crate::htlc::HtlcRecord;

/// Domain separator for state signatures.
const DOMAIN_STATE_SIGNATURE: u8 = 0x04;

impl LastCrossSignedState {
    /// Serialize the signed fields of this view.
    pub fn signing_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        let mut buf = Vec::with_capacity(128);
        buf.push(u8::from(self.is_host));
        write_var_bytes(&mut buf, &self.refund_script_pub_key)?;
        write_u64(&mut buf, self.init_hosted_channel.channel_capacity_msat);
        write_u64(&mut buf, self.init_hosted_channel.initial_client_balance_msat);
        write_u32(&mut buf, self.blockday);
        write_u64(&mut buf, self.local_balance_msat);
        write_u64(&mut buf, self.remote_balance_msat);
        write_u32(&mut buf, self.local_updates);
        write_u32(&mut buf, self.remote_updates);
        for htlc in self.incoming_htlcs.iter().chain(self.outgoing_htlcs.iter()) {
            htlc.encode_record(&mut buf)?;
        }
        Ok(buf)
    }

    /// Digest a signature over this view commits to.
    pub fn signing_digest(&self) -> Result<Hash, EncodeError> {
        Ok(tagged_hash(DOMAIN_STATE_SIGNATURE, &[&self.signing_bytes()?]))
    }

    /// Sign this view as-is.
    pub fn sign_view(&self, key: &PrivateKey) -> Result<Signature, EncodeError> {
        Ok(sign(key, &self.signing_digest()?.0))
    }

    /// Our signature for the counterparty: a signature over the reversed view.
    pub fn sign_remote_view(&self, key: &PrivateKey) -> Result<Signature, EncodeError> {
        self.reverse().sign_view(key)
    }

    /// Check `signature` was made by `signer` over this view.
    pub fn verify_view(&self, signer: &PublicKey, signature: &Signature) -> bool {
        match self.signing_digest() {
            Ok(digest) => verify(signer, &digest.0, signature),
            Err(_) => false,
        }
    }

    /// Check the counterparty's signature over our view.
    pub fn verify_remote_sig(&self, remote: &PublicKey) -> bool {
        self.verify_view(remote, &self.remote_sig_of_local)
    }

    /// Check our own signature over the counterparty's view.
    pub fn verify_local_sig(&self, local: &PublicKey) -> bool {
        self.reverse().verify_view(local, &self.local_sig_of_remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hc_crypto::identity_from_seed;

    fn state() -> LastCrossSignedState {
        LastCrossSignedState {
            is_host: false,
            refund_script_pub_key: vec![0x00, 0x14],
            blockday: 100,
            local_balance_msat: 1_000,
            remote_balance_msat: 999_999_000,
            local_updates: 1,
            remote_updates: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_cross_signing() {
        let (client_key, client_pk) = identity_from_seed([1u8; 32]);
        let (host_key, host_pk) = identity_from_seed([2u8; 32]);

        // Client view, signed by both sides
        let mut client_view = state();
        client_view.local_sig_of_remote = client_view.sign_remote_view(&client_key).unwrap();
        client_view.remote_sig_of_local = client_view.sign_view(&host_key).unwrap();

        assert!(client_view.verify_remote_sig(&host_pk));
        assert!(client_view.verify_local_sig(&client_pk));

        // The host holds the mirror image and both checks still hold
        let host_view = client_view.reverse();
        assert!(host_view.verify_remote_sig(&client_pk));
        assert!(host_view.verify_local_sig(&host_pk));
    }

    #[test]
    fn test_signature_covers_role_and_counters() {
        let (key, pk) = identity_from_seed([3u8; 32]);
        let view = state();
        let sig = view.sign_view(&key).unwrap();

        assert!(view.verify_view(&pk, &sig));
        assert!(!view.clone().with_role(true).verify_view(&pk, &sig));

        let mut bumped = view.clone();
        bumped.local_updates += 1;
        assert!(!bumped.verify_view(&pk, &sig));
    }

    #[test]
    fn test_signing_bytes_exclude_signatures() {
        let a = state();
        let mut b = state();
        b.remote_sig_of_local = Signature::from_bytes([7u8; 64]);
        assert_eq!(a.signing_digest().unwrap(), b.signing_digest().unwrap());
    }
}
