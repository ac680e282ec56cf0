//! NCP callback stream
//!
//! Callbacks are pushed by the co-processor independently of any command
//! and are delivered over a bounded channel in arrival order.

use bytes::Bytes;
use tokio::sync::mpsc;

use zigcoord_core::{
    ApsFrame, DeviceUpdate, Eui64, IncomingMessageType, JoinDecision, NodeId,
    OutgoingMessageType, Status,
};

/// Unsolicited event pushed by the NCP
#[derive(Clone, Debug, PartialEq)]
pub enum NcpCallback {
    /// `incomingMessageHandler`
    IncomingMessage {
        kind: IncomingMessageType,
        aps: ApsFrame,
        lqi: u8,
        rssi: i8,
        sender: NodeId,
        binding_index: u8,
        address_index: u8,
        payload: Bytes,
    },
    /// `messageSentHandler`
    MessageSent {
        kind: OutgoingMessageType,
        destination: NodeId,
        aps: ApsFrame,
        message_tag: u8,
        status: Status,
        payload: Bytes,
    },
    /// `trustCenterJoinHandler`
    TrustCenterJoin {
        nwk: NodeId,
        ieee: Eui64,
        update: DeviceUpdate,
        decision: JoinDecision,
        parent: NodeId,
    },
    /// Any callback the coordinator does not act on
    Other { name: String },
}

impl NcpCallback {
    /// Unicast data frame from `sender`
    pub fn incoming_unicast(aps: ApsFrame, sender: NodeId, lqi: u8, rssi: i8, payload: Bytes) -> Self {
        NcpCallback::IncomingMessage {
            kind: IncomingMessageType::Unicast,
            aps,
            lqi,
            rssi,
            sender,
            binding_index: 0xff,
            address_index: 0xff,
            payload,
        }
    }

    /// Delivery report for a unicast sent with `message_tag`
    pub fn unicast_sent(destination: NodeId, aps: ApsFrame, message_tag: u8, status: Status) -> Self {
        NcpCallback::MessageSent {
            kind: OutgoingMessageType::Direct,
            destination,
            aps,
            message_tag,
            status,
            payload: Bytes::new(),
        }
    }

    /// Trust center notification with no particular decision or parent
    pub fn device_update(nwk: NodeId, ieee: Eui64, update: DeviceUpdate) -> Self {
        NcpCallback::TrustCenterJoin {
            nwk,
            ieee,
            update,
            decision: JoinDecision::UsePreconfiguredKey,
            parent: NodeId::COORDINATOR,
        }
    }

    /// Frame name as used by the EZSP documentation
    pub fn frame_name(&self) -> &str {
        match self {
            NcpCallback::IncomingMessage { .. } => "incomingMessageHandler",
            NcpCallback::MessageSent { .. } => "messageSentHandler",
            NcpCallback::TrustCenterJoin { .. } => "trustCenterJoinHandler",
            NcpCallback::Other { name } => name,
        }
    }
}

/// Callback receiver channel
pub type CallbackReceiver = mpsc::Receiver<NcpCallback>;

/// Callback sender channel
pub type CallbackSender = mpsc::Sender<NcpCallback>;

/// Create a callback channel for a driver to push into
pub fn callback_channel(buffer_size: usize) -> (CallbackSender, CallbackReceiver) {
    mpsc::channel(buffer_size.max(1))
}
