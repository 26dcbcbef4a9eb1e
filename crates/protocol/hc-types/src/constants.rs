//! Protocol constants.
//!
//! These constants define wire-level limits and the default terms a Host
//! offers when it answers an `invoke_hosted_channel`.

use crate::{Blockday, MilliSatoshi, Satoshi};

// =============================================================================
// Wire Limits
// =============================================================================

/// Maximum message body size, excluding the 2-byte type code.
///
/// A transport payload is capped at 65535 bytes and the type code takes two.
pub const MAX_MESSAGE_BODY: usize = 65_533;

/// Largest length a 2-byte length prefix can describe.
pub const MAX_VAR_BYTES_LEN: usize = u16::MAX as usize;

/// Maximum refund scriptPubKey length (a P2WSH script is 34 bytes).
pub const MAX_REFUND_SCRIPT_LEN: u16 = 34;

/// Maximum length of the optional secret in `invoke_hosted_channel`.
pub const MAX_SECRET_LEN: u16 = 64;

/// Default bound on the `features` blob of `init_hosted_channel`.
///
/// Deployments may raise or lower it through configuration.
pub const DEFAULT_MAX_FEATURES_LEN: u16 = 13;

/// Length of every state signature.
pub const SIGNATURE_LEN: usize = 64;

/// Length of an onion routing packet carried by `update_add_htlc`.
pub const ONION_PACKET_LEN: usize = 1366;

/// Encoded length of an `update_add_htlc` body.
///
/// channel_id(32) + id(8) + amount(8) + payment_hash(32) + expiry(4) + onion(1366)
pub const UPDATE_ADD_HTLC_LEN: usize = 32 + 8 + 8 + 32 + 4 + ONION_PACKET_LEN;

// =============================================================================
// Default Host Terms
// =============================================================================

/// Default maximum value of HTLCs in flight: 100_000 sat.
pub const DEFAULT_MAX_HTLC_VALUE_IN_FLIGHT_MSAT: MilliSatoshi = 100_000_000;

/// Default minimum HTLC value: 1 sat.
pub const DEFAULT_HTLC_MINIMUM_MSAT: MilliSatoshi = 1_000;

/// Default maximum number of HTLCs accepted.
pub const DEFAULT_MAX_ACCEPTED_HTLCS: u16 = 30;

/// Default channel capacity: 1_000_000 sat.
pub const DEFAULT_CHANNEL_CAPACITY_MSAT: MilliSatoshi = 1_000_000_000;

/// Default liability deadline: roughly one year.
pub const DEFAULT_LIABILITY_DEADLINE_BLOCKDAYS: u16 = 360;

/// Default minimal on-chain refund amount.
pub const DEFAULT_MINIMAL_ONCHAIN_REFUND_SAT: Satoshi = 100_000;

/// Default initial client balance.
pub const DEFAULT_INITIAL_CLIENT_BALANCE_MSAT: MilliSatoshi = 0;

/// Blocks per blockday.
pub const BLOCKS_PER_BLOCKDAY: u32 = 144;

/// Convert a block height to its blockday.
pub fn blockday_from_height(height: u32) -> Blockday {
    height / BLOCKS_PER_BLOCKDAY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_add_htlc_len() {
        assert_eq!(UPDATE_ADD_HTLC_LEN, 1450);
    }

    #[test]
    fn test_message_body_fits_transport() {
        assert_eq!(MAX_MESSAGE_BODY + 2, MAX_VAR_BYTES_LEN);
    }

    #[test]
    fn test_blockday_from_height() {
        assert_eq!(blockday_from_height(0), 0);
        assert_eq!(blockday_from_height(143), 0);
        assert_eq!(blockday_from_height(144), 1);
        assert_eq!(blockday_from_height(700_000), 4861);
    }

    #[test]
    fn test_default_terms_consistent() {
        assert!(DEFAULT_HTLC_MINIMUM_MSAT <= DEFAULT_MAX_HTLC_VALUE_IN_FLIGHT_MSAT);
        assert!(DEFAULT_MAX_HTLC_VALUE_IN_FLIGHT_MSAT <= DEFAULT_CHANNEL_CAPACITY_MSAT);
        assert!(DEFAULT_INITIAL_CLIENT_BALANCE_MSAT <= DEFAULT_CHANNEL_CAPACITY_MSAT);
    }
}
