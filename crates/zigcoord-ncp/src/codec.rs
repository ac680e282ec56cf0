//! Application frame decoding seam
//!
//! Frames addressed to endpoint zero belong to the device management
//! (ZDO) sub-protocol; everything else is an application cluster (ZCL)
//! frame. Both decoders live outside the coordinator.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use zigcoord_core::{ApsFrame, CoordResult, Tsn};

/// Sub-protocol that owns a frame
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubProtocol {
    Zdo,
    Zcl,
}

impl SubProtocol {
    pub fn for_frame(aps: &ApsFrame) -> Self {
        if aps.is_zdo() {
            SubProtocol::Zdo
        } else {
            SubProtocol::Zcl
        }
    }
}

impl fmt::Display for SubProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubProtocol::Zdo => write!(f, "zdo"),
            SubProtocol::Zcl => write!(f, "zcl"),
        }
    }
}

/// Result of decoding an application frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedFrame {
    pub tsn: Tsn,
    pub command_id: u16,
    /// Set when the frame answers one of our requests
    pub is_reply: bool,
    /// Decoded arguments, opaque to the coordinator
    pub args: Bytes,
}

/// Decoder for one sub-protocol
pub trait FrameCodec: Send + Sync {
    fn decode(&self, aps: &ApsFrame, payload: &[u8]) -> CoordResult<DecodedFrame>;
}

/// The pair of decoders the dispatcher chooses between
#[derive(Clone)]
pub struct Codecs {
    zdo: Arc<dyn FrameCodec>,
    zcl: Arc<dyn FrameCodec>,
}

impl Codecs {
    pub fn new(zdo: Arc<dyn FrameCodec>, zcl: Arc<dyn FrameCodec>) -> Self {
        Codecs { zdo, zcl }
    }

    /// Decode with whichever codec owns the destination endpoint
    pub fn decode(&self, aps: &ApsFrame, payload: &[u8]) -> CoordResult<(SubProtocol, DecodedFrame)> {
        let protocol = SubProtocol::for_frame(aps);
        let codec = match protocol {
            SubProtocol::Zdo => &self.zdo,
            SubProtocol::Zcl => &self.zcl,
        };
        codec.decode(aps, payload).map(|frame| (protocol, frame))
    }
}

impl fmt::Debug for Codecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codecs").finish_non_exhaustive()
    }
}
