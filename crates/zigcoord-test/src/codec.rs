//! Minimal frame codecs for tests
//!
//! Cluster frames: `[tsn, command_lo, command_hi, flags, args...]` where
//! bit 0 of `flags` marks a reply.
//!
//! Device management frames: `[tsn, args...]`; the cluster id is the
//! command and bit 15 of it marks a response.

use bytes::{BufMut, Bytes, BytesMut};

use zigcoord_core::{ApsFrame, CoordError, CoordResult, Tsn};
use zigcoord_ncp::{DecodedFrame, FrameCodec};

const HEADER_LEN: usize = 4;
const FLAG_REPLY: u8 = 0x01;

#[derive(Clone, Copy, Debug, Default)]
pub struct TestCodec;

impl TestCodec {
    pub fn encode(tsn: Tsn, command_id: u16, is_reply: bool, args: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + args.len());
        buf.put_u8(tsn.0);
        buf.put_u16_le(command_id);
        buf.put_u8(if is_reply { FLAG_REPLY } else { 0 });
        buf.put_slice(args);
        buf.freeze()
    }
}

impl FrameCodec for TestCodec {
    fn decode(&self, _aps: &ApsFrame, payload: &[u8]) -> CoordResult<DecodedFrame> {
        if payload.len() < HEADER_LEN {
            return Err(CoordError::Decode(format!(
                "frame too short: {} bytes",
                payload.len()
            )));
        }
        Ok(DecodedFrame {
            tsn: Tsn(payload[0]),
            command_id: u16::from_le_bytes([payload[1], payload[2]]),
            is_reply: payload[3] & FLAG_REPLY != 0,
            args: Bytes::copy_from_slice(&payload[HEADER_LEN..]),
        })
    }
}

/// Response bit of a device management cluster id
pub const ZDO_RESPONSE: u16 = 0x8000;

#[derive(Clone, Copy, Debug, Default)]
pub struct ZdoTestCodec;

impl ZdoTestCodec {
    pub fn encode(tsn: Tsn, args: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(1 + args.len());
        buf.put_u8(tsn.0);
        buf.put_slice(args);
        buf.freeze()
    }
}

impl FrameCodec for ZdoTestCodec {
    fn decode(&self, aps: &ApsFrame, payload: &[u8]) -> CoordResult<DecodedFrame> {
        let (&tsn, args) = payload
            .split_first()
            .ok_or_else(|| CoordError::Decode("empty ZDO frame".into()))?;
        Ok(DecodedFrame {
            tsn: Tsn(tsn),
            command_id: aps.cluster_id,
            is_reply: aps.cluster_id & ZDO_RESPONSE != 0,
            args: Bytes::copy_from_slice(args),
        })
    }
}
