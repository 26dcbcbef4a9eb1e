//! Hosted channel control messages.

use hc_crypto::Signature;
use hc_types::{
    Blockday, ChainHash, MilliSatoshi, Satoshi, DEFAULT_CHANNEL_CAPACITY_MSAT,
    DEFAULT_HTLC_MINIMUM_MSAT, DEFAULT_INITIAL_CLIENT_BALANCE_MSAT,
    DEFAULT_LIABILITY_DEADLINE_BLOCKDAYS, DEFAULT_MAX_ACCEPTED_HTLCS,
    DEFAULT_MAX_HTLC_VALUE_IN_FLIGHT_MSAT, DEFAULT_MINIMAL_ONCHAIN_REFUND_SAT,
    MAX_REFUND_SCRIPT_LEN, MAX_SECRET_LEN, UPDATE_ADD_HTLC_LEN,
};

use crate::codec::{
    read_var_bytes, write_bounded_bytes, write_u16, write_u32, write_u64, write_var_bytes,
    WireReader,
};
use crate::error::{DecodeError, DecodeResult, EncodeError};
use crate::htlc::{HtlcRecord, UpdateAddHtlc};
use crate::message::{MessageType, WireMessage};

fn read_signature(reader: &mut WireReader<'_>) -> DecodeResult<Signature> {
    reader.read_array().map(Signature::from_bytes)
}

/// Request from a Client to open a hosted channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InvokeHostedChannel {
    /// Ledger the channel is bound to
    pub chain_hash: ChainHash,
    /// Script the Host pays out to on refund (at most 34 bytes)
    pub refund_script_pub_key: Vec<u8>,
    /// Optional secret selecting custom terms (at most 64 bytes, may be empty)
    pub secret: Vec<u8>,
}

impl WireMessage for InvokeHostedChannel {
    const TYPE: MessageType = MessageType::InvokeHostedChannel;

    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        buf.extend_from_slice(&self.chain_hash.0);
        write_bounded_bytes(
            buf,
            &self.refund_script_pub_key,
            MAX_REFUND_SCRIPT_LEN as usize,
            "refund_script_pub_key",
        )?;
        write_bounded_bytes(buf, &self.secret, MAX_SECRET_LEN as usize, "secret")
    }

    fn decode(reader: &mut WireReader<'_>) -> DecodeResult<Self> {
        let chain_hash = ChainHash(reader.read_array()?);
        let refund_script_pub_key = read_var_bytes(
            reader,
            MAX_REFUND_SCRIPT_LEN as usize,
            "refund_script_pub_key",
        )?;
        let secret = read_var_bytes(reader, MAX_SECRET_LEN as usize, "secret")?;
        Ok(Self {
            chain_hash,
            refund_script_pub_key,
            secret,
        })
    }
}

/// Channel terms offered by the Host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitHostedChannel {
    pub max_htlc_value_in_flight_msat: MilliSatoshi,
    pub htlc_minimum_msat: MilliSatoshi,
    pub max_accepted_htlcs: u16,
    pub channel_capacity_msat: MilliSatoshi,
    pub liability_deadline_blockdays: u16,
    pub minimal_onchain_refund_amount_satoshis: Satoshi,
    pub initial_client_balance_msat: MilliSatoshi,
    /// Feature bits; empty and absent share one encoding
    pub features: Vec<u8>,
}

impl Default for InitHostedChannel {
    fn default() -> Self {
        Self {
            max_htlc_value_in_flight_msat: DEFAULT_MAX_HTLC_VALUE_IN_FLIGHT_MSAT,
            htlc_minimum_msat: DEFAULT_HTLC_MINIMUM_MSAT,
            max_accepted_htlcs: DEFAULT_MAX_ACCEPTED_HTLCS,
            channel_capacity_msat: DEFAULT_CHANNEL_CAPACITY_MSAT,
            liability_deadline_blockdays: DEFAULT_LIABILITY_DEADLINE_BLOCKDAYS,
            minimal_onchain_refund_amount_satoshis: DEFAULT_MINIMAL_ONCHAIN_REFUND_SAT,
            initial_client_balance_msat: DEFAULT_INITIAL_CLIENT_BALANCE_MSAT,
            features: Vec::new(),
        }
    }
}

impl WireMessage for InitHostedChannel {
    const TYPE: MessageType = MessageType::InitHostedChannel;

    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        write_u64(buf, self.max_htlc_value_in_flight_msat);
        write_u64(buf, self.htlc_minimum_msat);
        write_u16(buf, self.max_accepted_htlcs);
        write_u64(buf, self.channel_capacity_msat);
        write_u16(buf, self.liability_deadline_blockdays);
        write_u64(buf, self.minimal_onchain_refund_amount_satoshis);
        write_u64(buf, self.initial_client_balance_msat);
        write_var_bytes(buf, &self.features)
    }

    fn decode(reader: &mut WireReader<'_>) -> DecodeResult<Self> {
        let max_features_len = reader.limits().max_features_len as usize;
        Ok(Self {
            max_htlc_value_in_flight_msat: reader.read_u64()?,
            htlc_minimum_msat: reader.read_u64()?,
            max_accepted_htlcs: reader.read_u16()?,
            channel_capacity_msat: reader.read_u64()?,
            liability_deadline_blockdays: reader.read_u16()?,
            minimal_onchain_refund_amount_satoshis: reader.read_u64()?,
            initial_client_balance_msat: reader.read_u64()?,
            features: read_var_bytes(reader, max_features_len, "features")?,
        })
    }
}

/// The latest snapshot both peers have signed.
///
/// Fields are from the point of view of the node holding the snapshot. The
/// counterparty holds the [`reverse`](LastCrossSignedState::reverse) of it.
///
/// `is_host` is not part of the wire encoding: a decoded snapshot has it
/// cleared and the owner sets it from its own role.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LastCrossSignedState {
    pub is_host: bool,
    pub refund_script_pub_key: Vec<u8>,
    pub init_hosted_channel: InitHostedChannel,
    pub blockday: Blockday,
    pub local_balance_msat: MilliSatoshi,
    pub remote_balance_msat: MilliSatoshi,
    pub local_updates: u32,
    pub remote_updates: u32,
    pub incoming_htlcs: Vec<UpdateAddHtlc>,
    pub outgoing_htlcs: Vec<UpdateAddHtlc>,
    /// Counterparty's signature over this view
    pub remote_sig_of_local: Signature,
    /// Our signature over the reversed view
    pub local_sig_of_remote: Signature,
}

impl LastCrossSignedState {
    /// Set the role flag, which decoding cannot recover.
    pub fn with_role(mut self, is_host: bool) -> Self {
        self.is_host = is_host;
        self
    }

    /// The same snapshot as the counterparty sees it.
    pub fn reverse(&self) -> Self {
        Self {
            is_host: !self.is_host,
            refund_script_pub_key: self.refund_script_pub_key.clone(),
            init_hosted_channel: self.init_hosted_channel.clone(),
            blockday: self.blockday,
            local_balance_msat: self.remote_balance_msat,
            remote_balance_msat: self.local_balance_msat,
            local_updates: self.remote_updates,
            remote_updates: self.local_updates,
            incoming_htlcs: self.outgoing_htlcs.clone(),
            outgoing_htlcs: self.incoming_htlcs.clone(),
            remote_sig_of_local: self.local_sig_of_remote,
            local_sig_of_remote: self.remote_sig_of_local,
        }
    }

    /// Sum of both balances and every pending HTLC.
    pub fn total_msat(&self) -> u128 {
        let htlcs: u128 = self
            .incoming_htlcs
            .iter()
            .chain(self.outgoing_htlcs.iter())
            .map(|h| h.amount_msat as u128)
            .sum();
        self.local_balance_msat as u128 + self.remote_balance_msat as u128 + htlcs
    }
}

fn write_htlcs(buf: &mut Vec<u8>, htlcs: &[UpdateAddHtlc]) -> Result<(), EncodeError> {
    let count = u16::try_from(htlcs.len()).map_err(|_| EncodeError::ValueTooLarge {
        len: htlcs.len(),
        max: u16::MAX as usize,
    })?;
    write_u16(buf, count);
    for htlc in htlcs {
        htlc.encode_record(buf)?;
    }
    Ok(())
}

fn read_htlcs(reader: &mut WireReader<'_>) -> DecodeResult<Vec<UpdateAddHtlc>> {
    let count = reader.read_u16()? as usize;
    // A hostile count must not drive allocation beyond what the input holds
    let needed = count * UPDATE_ADD_HTLC_LEN;
    if needed > reader.remaining() {
        return Err(DecodeError::Truncated {
            needed,
            available: reader.remaining(),
        });
    }
    let mut htlcs = Vec::with_capacity(count);
    for _ in 0..count {
        htlcs.push(UpdateAddHtlc::decode_record(reader)?);
    }
    Ok(htlcs)
}

impl WireMessage for LastCrossSignedState {
    const TYPE: MessageType = MessageType::LastCrossSignedState;

    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        write_bounded_bytes(
            buf,
            &self.refund_script_pub_key,
            MAX_REFUND_SCRIPT_LEN as usize,
            "last_refund_script_pub_key",
        )?;
        self.init_hosted_channel.encode(buf)?;
        write_u32(buf, self.blockday);
        write_u64(buf, self.local_balance_msat);
        write_u64(buf, self.remote_balance_msat);
        write_u32(buf, self.local_updates);
        write_u32(buf, self.remote_updates);
        write_htlcs(buf, &self.incoming_htlcs)?;
        write_htlcs(buf, &self.outgoing_htlcs)?;
        buf.extend_from_slice(self.remote_sig_of_local.as_bytes());
        buf.extend_from_slice(self.local_sig_of_remote.as_bytes());
        Ok(())
    }

    fn decode(reader: &mut WireReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            is_host: false,
            refund_script_pub_key: read_var_bytes(
                reader,
                MAX_REFUND_SCRIPT_LEN as usize,
                "last_refund_script_pub_key",
            )?,
            init_hosted_channel: InitHostedChannel::decode(reader)?,
            blockday: reader.read_u32()?,
            local_balance_msat: reader.read_u64()?,
            remote_balance_msat: reader.read_u64()?,
            local_updates: reader.read_u32()?,
            remote_updates: reader.read_u32()?,
            incoming_htlcs: read_htlcs(reader)?,
            outgoing_htlcs: read_htlcs(reader)?,
            remote_sig_of_local: read_signature(reader)?,
            local_sig_of_remote: read_signature(reader)?,
        })
    }
}

/// Proposal to advance the snapshot.
///
/// Counters are from the sender's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateUpdate {
    pub blockday: Blockday,
    pub local_updates: u32,
    pub remote_updates: u32,
    /// Sender's signature over the receiver's resulting view
    pub local_sig_of_remote: Signature,
}

impl WireMessage for StateUpdate {
    const TYPE: MessageType = MessageType::StateUpdate;

    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        write_u32(buf, self.blockday);
        write_u32(buf, self.local_updates);
        write_u32(buf, self.remote_updates);
        buf.extend_from_slice(self.local_sig_of_remote.as_bytes());
        Ok(())
    }

    fn decode(reader: &mut WireReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            blockday: reader.read_u32()?,
            local_updates: reader.read_u32()?,
            remote_updates: reader.read_u32()?,
            local_sig_of_remote: read_signature(reader)?,
        })
    }
}

/// Host-issued balance correction used to resolve a dispute.
///
/// `local_balance_msat` is the sender's balance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateOverride {
    pub blockday: Blockday,
    pub local_balance_msat: MilliSatoshi,
    pub local_updates: u32,
    pub remote_updates: u32,
    pub local_sig_of_remote: Signature,
}

impl WireMessage for StateOverride {
    const TYPE: MessageType = MessageType::StateOverride;

    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        write_u32(buf, self.blockday);
        write_u64(buf, self.local_balance_msat);
        write_u32(buf, self.local_updates);
        write_u32(buf, self.remote_updates);
        buf.extend_from_slice(self.local_sig_of_remote.as_bytes());
        Ok(())
    }

    fn decode(reader: &mut WireReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            blockday: reader.read_u32()?,
            local_balance_msat: reader.read_u64()?,
            local_updates: reader.read_u32()?,
            remote_updates: reader.read_u32()?,
            local_sig_of_remote: read_signature(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DecodeLimits;

    fn roundtrip<M: WireMessage + PartialEq + std::fmt::Debug>(msg: &M) -> M {
        let mut buf = Vec::new();
        msg.encode(&mut buf).unwrap();
        let mut reader = WireReader::new(&buf);
        let decoded = M::decode(&mut reader).unwrap();
        assert!(reader.is_empty());
        decoded
    }

    #[test]
    fn test_invoke_layout() {
        let msg = InvokeHostedChannel {
            chain_hash: ChainHash([0x11; 32]),
            refund_script_pub_key: vec![0x08],
            secret: vec![0x0a],
        };
        let mut buf = Vec::new();
        msg.encode(&mut buf).unwrap();

        assert_eq!(buf.len(), 32 + 3 + 3);
        assert_eq!(&buf[32..], &[0x00, 0x01, 0x08, 0x00, 0x01, 0x0a]);
        assert_eq!(roundtrip(&msg), msg);
    }

    #[test]
    fn test_invoke_secret_too_long() {
        let msg = InvokeHostedChannel {
            secret: vec![0u8; 65],
            ..Default::default()
        };
        let mut buf = Vec::new();
        assert_eq!(
            msg.encode(&mut buf),
            Err(EncodeError::FieldTooLarge {
                field: "secret",
                len: 65,
                max: 64
            })
        );

        // A peer that skips the check is still refused on decode
        let mut buf = vec![0u8; 32];
        write_var_bytes(&mut buf, &[]).unwrap();
        write_var_bytes(&mut buf, &[0u8; 65]).unwrap();
        let err = InvokeHostedChannel::decode(&mut WireReader::new(&buf)).unwrap_err();
        assert_eq!(
            err,
            DecodeError::FieldTooLarge {
                field: "secret",
                len: 65,
                max: 64
            }
        );
    }

    #[test]
    fn test_refund_script_bound_on_encode() {
        let invoke = InvokeHostedChannel {
            refund_script_pub_key: vec![0u8; 35],
            ..Default::default()
        };
        assert!(matches!(
            invoke.encode(&mut Vec::new()),
            Err(EncodeError::FieldTooLarge { len: 35, max: 34, .. })
        ));

        let state = LastCrossSignedState {
            refund_script_pub_key: vec![0u8; 35],
            ..Default::default()
        };
        assert!(matches!(
            state.encode(&mut Vec::new()),
            Err(EncodeError::FieldTooLarge {
                field: "last_refund_script_pub_key",
                ..
            })
        ));

        let at_limit = InvokeHostedChannel {
            refund_script_pub_key: vec![0u8; 34],
            secret: vec![0u8; 64],
            ..Default::default()
        };
        assert_eq!(roundtrip(&at_limit), at_limit);
    }

    #[test]
    fn test_init_encoded_len() {
        let mut buf = Vec::new();
        InitHostedChannel::default().encode(&mut buf).unwrap();
        // five u64, two u16, empty features prefix
        assert_eq!(buf.len(), 5 * 8 + 2 * 2 + 2);
    }

    #[test]
    fn test_init_features_respect_limits() {
        let msg = InitHostedChannel {
            features: vec![0xff; 20],
            ..Default::default()
        };
        let mut buf = Vec::new();
        msg.encode(&mut buf).unwrap();

        let err = InitHostedChannel::decode(&mut WireReader::new(&buf)).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::FieldTooLarge {
                field: "features",
                len: 20,
                max: 13
            }
        ));

        let limits = DecodeLimits::default().with_max_features_len(32);
        let decoded =
            InitHostedChannel::decode(&mut WireReader::with_limits(&buf, limits)).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_lcss_reverse_is_involution() {
        let state = LastCrossSignedState {
            is_host: true,
            local_balance_msat: 10,
            remote_balance_msat: 20,
            local_updates: 3,
            remote_updates: 4,
            remote_sig_of_local: Signature::from_bytes([1u8; 64]),
            local_sig_of_remote: Signature::from_bytes([2u8; 64]),
            ..Default::default()
        };
        let reversed = state.reverse();
        assert!(!reversed.is_host);
        assert_eq!(reversed.local_balance_msat, 20);
        assert_eq!(reversed.remote_updates, 3);
        assert_eq!(reversed.remote_sig_of_local, state.local_sig_of_remote);
        assert_eq!(reversed.reverse(), state);
    }

    #[test]
    fn test_lcss_role_not_on_wire() {
        let state = LastCrossSignedState::default().with_role(true);
        let decoded = roundtrip(&state);
        assert!(!decoded.is_host);
        assert_eq!(decoded.with_role(true), state);
    }

    #[test]
    fn test_lcss_hostile_htlc_count() {
        let mut buf = Vec::new();
        LastCrossSignedState::default().encode(&mut buf).unwrap();
        // Patch the incoming count (right after the scalars) to 0xffff
        let count_at = 2 + 46 + 4 + 8 + 8 + 4 + 4;
        buf[count_at] = 0xff;
        buf[count_at + 1] = 0xff;

        let err = LastCrossSignedState::decode(&mut WireReader::new(&buf)).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));
    }

    #[test]
    fn test_state_update_and_override_lengths() {
        let mut buf = Vec::new();
        StateUpdate::default().encode(&mut buf).unwrap();
        assert_eq!(buf.len(), 4 + 4 + 4 + 64);

        buf.clear();
        StateOverride::default().encode(&mut buf).unwrap();
        assert_eq!(buf.len(), 4 + 8 + 4 + 4 + 64);

        let update = StateUpdate {
            blockday: 122,
            local_updates: 1,
            remote_updates: 2,
            local_sig_of_remote: Signature::from_bytes([9u8; 64]),
        };
        assert_eq!(roundtrip(&update), update);
    }
}
