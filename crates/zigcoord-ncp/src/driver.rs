//! NCP command surface
//!
//! Every command is a request/response exchange with the co-processor.
//! Responses lead with a status byte; callers decide what non-success means.

use async_trait::async_trait;

use zigcoord_core::{
    ApsFrame, ConfigId, CoordResult, DecisionId, Eui64, NodeId, NodeType, OutgoingMessageType,
    PolicyId, Status,
};

use crate::CallbackReceiver;

/// Reply to the `version` handshake
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VersionInfo {
    /// Protocol version the NCP will speak
    pub protocol_version: u8,
    pub stack_type: u8,
    pub stack_version: u16,
}

/// Radio and PAN parameters of the network the NCP is part of
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct NetworkParameters {
    pub extended_pan_id: u64,
    pub pan_id: u16,
    pub radio_tx_power: i8,
    pub radio_channel: u8,
    pub join_method: u8,
    pub nwk_manager_id: NodeId,
    pub nwk_update_id: u8,
    pub channels: u32,
}

/// Reply to `getNetworkParameters`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkParametersResponse {
    pub status: Status,
    pub node_type: NodeType,
    pub parameters: NetworkParameters,
}

/// Reply to `sendUnicast`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SendResult {
    pub status: Status,
    /// APS sequence assigned by the NCP
    pub sequence: u8,
}

/// Command interface of a network co-processor driver
///
/// Implementations own the serial link and the frame codec. An `Err`
/// means the exchange itself failed; an `Ok` carrying a non-success
/// status means the NCP answered and refused.
#[async_trait]
pub trait Ncp: Send + Sync + 'static {
    async fn reset(&self) -> CoordResult<Status>;

    /// Negotiate the protocol version
    async fn version(&self, desired_protocol_version: u8) -> CoordResult<VersionInfo>;

    async fn set_configuration_value(&self, id: ConfigId, value: u16) -> CoordResult<Status>;

    /// Resume the network stored in the NCP's tokens
    async fn network_init(&self) -> CoordResult<Status>;

    async fn get_network_parameters(&self) -> CoordResult<NetworkParametersResponse>;

    async fn get_node_id(&self) -> CoordResult<NodeId>;

    async fn get_eui64(&self) -> CoordResult<Eui64>;

    async fn set_policy(&self, policy: PolicyId, decision: DecisionId) -> CoordResult<Status>;

    /// Queue a unicast; `message_tag` comes back in the matching
    /// `MessageSent` callback
    async fn send_unicast(
        &self,
        kind: OutgoingMessageType,
        destination: NodeId,
        aps: &ApsFrame,
        message_tag: u8,
        payload: &[u8],
    ) -> CoordResult<SendResult>;

    async fn permit_joining(&self, seconds: u8) -> CoordResult<Status>;

    /// Attach to the stream of unsolicited callbacks
    fn subscribe(&self) -> CallbackReceiver;
}
