//! HTLC records and the hosted messages that carry them.
//!
//! The records follow the external payment-channel format. A hosted HTLC
//! message owns one record and forwards encoding to it; only the type code
//! differs from the external protocol.

use hc_crypto::Hash;
use hc_types::{ChannelId, MilliSatoshi, ONION_PACKET_LEN};

use crate::codec::{read_var_bytes, write_u16, write_u32, write_u64, write_var_bytes, WireReader};
use crate::error::{DecodeResult, EncodeError};
use crate::message::{MessageType, WireMessage};

/// An externally defined HTLC record.
pub trait HtlcRecord: Sized {
    /// Code used when the record travels as a hosted message.
    const HOSTED_TYPE: MessageType;

    fn encode_record(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError>;

    fn decode_record(reader: &mut WireReader<'_>) -> DecodeResult<Self>;
}

/// Hosted message owning one HTLC record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HtlcMessage<R> {
    pub record: R,
}

impl<R> HtlcMessage<R> {
    pub fn new(record: R) -> Self {
        Self { record }
    }
}

impl<R: HtlcRecord> WireMessage for HtlcMessage<R> {
    const TYPE: MessageType = R::HOSTED_TYPE;

    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        self.record.encode_record(buf)
    }

    fn decode(reader: &mut WireReader<'_>) -> DecodeResult<Self> {
        R::decode_record(reader).map(Self::new)
    }
}

/// Fixed-size onion routing packet.
#[derive(Clone, PartialEq, Eq)]
pub struct OnionPacket(pub Box<[u8; ONION_PACKET_LEN]>);

impl OnionPacket {
    pub fn from_bytes(bytes: [u8; ONION_PACKET_LEN]) -> Self {
        Self(Box::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; ONION_PACKET_LEN] {
        &self.0
    }
}

impl Default for OnionPacket {
    fn default() -> Self {
        Self(Box::new([0u8; ONION_PACKET_LEN]))
    }
}

impl std::fmt::Debug for OnionPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OnionPacket({} bytes)", ONION_PACKET_LEN)
    }
}

fn read_hash(reader: &mut WireReader<'_>) -> DecodeResult<Hash> {
    reader.read_array().map(Hash)
}

fn read_channel_id(reader: &mut WireReader<'_>) -> DecodeResult<ChannelId> {
    reader.read_array().map(ChannelId)
}

/// Offer of a conditional payment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateAddHtlc {
    pub channel_id: ChannelId,
    pub id: u64,
    pub amount_msat: MilliSatoshi,
    pub payment_hash: Hash,
    pub cltv_expiry: u32,
    pub onion_routing_packet: OnionPacket,
}

impl HtlcRecord for UpdateAddHtlc {
    const HOSTED_TYPE: MessageType = MessageType::UpdateAddHtlc;

    fn encode_record(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        buf.extend_from_slice(self.channel_id.as_bytes());
        write_u64(buf, self.id);
        write_u64(buf, self.amount_msat);
        buf.extend_from_slice(&self.payment_hash.0);
        write_u32(buf, self.cltv_expiry);
        buf.extend_from_slice(self.onion_routing_packet.as_bytes());
        Ok(())
    }

    fn decode_record(reader: &mut WireReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            channel_id: read_channel_id(reader)?,
            id: reader.read_u64()?,
            amount_msat: reader.read_u64()?,
            payment_hash: read_hash(reader)?,
            cltv_expiry: reader.read_u32()?,
            onion_routing_packet: OnionPacket::from_bytes(reader.read_array()?),
        })
    }
}

/// Settlement of an HTLC.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateFulfillHtlc {
    pub channel_id: ChannelId,
    pub id: u64,
    pub payment_preimage: [u8; 32],
}

impl HtlcRecord for UpdateFulfillHtlc {
    const HOSTED_TYPE: MessageType = MessageType::UpdateFulfillHtlc;

    fn encode_record(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        buf.extend_from_slice(self.channel_id.as_bytes());
        write_u64(buf, self.id);
        buf.extend_from_slice(&self.payment_preimage);
        Ok(())
    }

    fn decode_record(reader: &mut WireReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            channel_id: read_channel_id(reader)?,
            id: reader.read_u64()?,
            payment_preimage: reader.read_array()?,
        })
    }
}

/// Failure of an HTLC with an encrypted reason.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateFailHtlc {
    pub channel_id: ChannelId,
    pub id: u64,
    pub reason: Vec<u8>,
}

impl HtlcRecord for UpdateFailHtlc {
    const HOSTED_TYPE: MessageType = MessageType::UpdateFailHtlc;

    fn encode_record(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        buf.extend_from_slice(self.channel_id.as_bytes());
        write_u64(buf, self.id);
        write_var_bytes(buf, &self.reason)
    }

    fn decode_record(reader: &mut WireReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            channel_id: read_channel_id(reader)?,
            id: reader.read_u64()?,
            reason: read_var_bytes(reader, u16::MAX as usize, "reason")?,
        })
    }
}

/// Failure of an HTLC whose onion could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateFailMalformedHtlc {
    pub channel_id: ChannelId,
    pub id: u64,
    pub sha256_of_onion: Hash,
    pub failure_code: u16,
}

impl HtlcRecord for UpdateFailMalformedHtlc {
    const HOSTED_TYPE: MessageType = MessageType::UpdateFailMalformedHtlc;

    fn encode_record(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        buf.extend_from_slice(self.channel_id.as_bytes());
        write_u64(buf, self.id);
        buf.extend_from_slice(&self.sha256_of_onion.0);
        write_u16(buf, self.failure_code);
        Ok(())
    }

    fn decode_record(reader: &mut WireReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            channel_id: read_channel_id(reader)?,
            id: reader.read_u64()?,
            sha256_of_onion: read_hash(reader)?,
            failure_code: reader.read_u16()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hc_types::UPDATE_ADD_HTLC_LEN;

    #[test]
    fn test_update_add_htlc_fixed_len() {
        let mut onion = [0u8; ONION_PACKET_LEN];
        onion[0] = 0x01;
        onion[ONION_PACKET_LEN - 1] = 0xee;
        let htlc = UpdateAddHtlc {
            channel_id: ChannelId([3u8; 32]),
            id: 7,
            amount_msat: 50_000,
            payment_hash: Hash([4u8; 32]),
            cltv_expiry: 800_000,
            onion_routing_packet: OnionPacket::from_bytes(onion),
        };
        let mut buf = Vec::new();
        htlc.encode_record(&mut buf).unwrap();
        assert_eq!(buf.len(), UPDATE_ADD_HTLC_LEN);

        let decoded = UpdateAddHtlc::decode_record(&mut WireReader::new(&buf)).unwrap();
        assert_eq!(decoded, htlc);
    }

    #[test]
    fn test_hosted_message_forwards_to_record() {
        let record = UpdateFailMalformedHtlc {
            channel_id: ChannelId([1u8; 32]),
            id: 2,
            sha256_of_onion: Hash([5u8; 32]),
            failure_code: 0x8002,
        };
        let msg = HtlcMessage::new(record.clone());

        let mut direct = Vec::new();
        record.encode_record(&mut direct).unwrap();
        let mut wrapped = Vec::new();
        msg.encode(&mut wrapped).unwrap();
        assert_eq!(direct, wrapped);
        assert_eq!(
            <HtlcMessage<UpdateFailMalformedHtlc> as WireMessage>::TYPE,
            MessageType::UpdateFailMalformedHtlc
        );
    }

    #[test]
    fn test_fail_and_fulfill_roundtrip() {
        let fail = HtlcMessage::new(UpdateFailHtlc {
            channel_id: ChannelId([9u8; 32]),
            id: 11,
            reason: vec![0xde, 0xad],
        });
        let mut buf = Vec::new();
        fail.encode(&mut buf).unwrap();
        let decoded = HtlcMessage::<UpdateFailHtlc>::decode(&mut WireReader::new(&buf)).unwrap();
        assert_eq!(decoded, fail);

        let fulfill = HtlcMessage::new(UpdateFulfillHtlc {
            channel_id: ChannelId([9u8; 32]),
            id: 11,
            payment_preimage: [0x42; 32],
        });
        buf.clear();
        fulfill.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), 32 + 8 + 32);
    }
}
