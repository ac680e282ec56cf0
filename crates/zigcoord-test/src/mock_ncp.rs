//! Scriptable in-memory NCP
//!
//! Every command answers from a [`NcpScript`] and is appended to a call
//! log. Callbacks are injected with [`MockNcp::push`].

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, MutexGuard};

use zigcoord_core::{
    ApsFrame, ConfigId, CoordError, CoordResult, DecisionId, Eui64, NodeId, NodeType,
    OutgoingMessageType, PolicyId, StartupStep, Status,
};
use zigcoord_ncp::{
    callback_channel, CallbackReceiver, CallbackSender, Ncp, NcpCallback, NetworkParameters,
    NetworkParametersResponse, SendResult, VersionInfo,
};

/// EUI-64 the mock reports for itself
pub const MOCK_EUI64: Eui64 = Eui64(0x00_12_4b_00_1c_a1_b2_c3);

/// One command as seen by the mock
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NcpCall {
    Reset,
    Version(u8),
    SetConfiguration(ConfigId, u16),
    NetworkInit,
    GetNetworkParameters,
    SetPolicy(PolicyId, DecisionId),
    GetNodeId,
    GetEui64,
    SendUnicast {
        destination: NodeId,
        aps: ApsFrame,
        message_tag: u8,
        payload: Bytes,
    },
    PermitJoining(u8),
}

/// Answers the mock gives
#[derive(Clone, Debug)]
pub struct NcpScript {
    pub reset: Status,
    /// `None` echoes the requested version
    pub protocol_version: Option<u8>,
    pub config_failures: HashMap<ConfigId, Status>,
    pub network_init: Status,
    pub parameters: Status,
    pub node_type: NodeType,
    pub policy_failures: HashMap<PolicyId, Status>,
    pub node_id: NodeId,
    pub eui64: Eui64,
    pub send: Status,
    /// Fail the send exchange itself instead of returning a status
    pub send_error: Option<CoordError>,
    pub permit: Status,
    /// Bring-up command whose exchange fails outright
    pub broken_exchange: Option<StartupStep>,
}

impl Default for NcpScript {
    fn default() -> Self {
        NcpScript {
            reset: Status::SUCCESS,
            protocol_version: None,
            config_failures: HashMap::new(),
            network_init: Status::SUCCESS,
            parameters: Status::SUCCESS,
            node_type: NodeType::Coordinator,
            policy_failures: HashMap::new(),
            node_id: NodeId::COORDINATOR,
            eui64: MOCK_EUI64,
            send: Status::SUCCESS,
            send_error: None,
            permit: Status::SUCCESS,
            broken_exchange: None,
        }
    }
}

pub struct MockNcp {
    script: Mutex<NcpScript>,
    calls: Mutex<Vec<NcpCall>>,
    callbacks: Mutex<CallbackSender>,
    send_sequence: Mutex<u8>,
}

impl MockNcp {
    pub fn new() -> Self {
        Self::with_script(NcpScript::default())
    }

    pub fn with_script(script: NcpScript) -> Self {
        let (tx, _) = callback_channel(1);
        MockNcp {
            script: Mutex::new(script),
            calls: Mutex::new(Vec::new()),
            callbacks: Mutex::new(tx),
            send_sequence: Mutex::new(0),
        }
    }

    /// Change answers mid-test
    pub fn script(&self) -> MutexGuard<'_, NcpScript> {
        self.script.lock()
    }

    pub fn calls(&self) -> Vec<NcpCall> {
        self.calls.lock().clone()
    }

    /// Only the unicast sends, in order
    pub fn sends(&self) -> Vec<NcpCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, NcpCall::SendUnicast { .. }))
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Deliver a callback to the current subscriber
    ///
    /// Returns false when nobody is subscribed.
    pub async fn push(&self, callback: NcpCallback) -> bool {
        let tx = self.callbacks.lock().clone();
        tx.send(callback).await.is_ok()
    }

    fn record(&self, call: NcpCall) {
        self.calls.lock().push(call);
    }

    fn exchange(&self, step: StartupStep) -> CoordResult<()> {
        if self.script.lock().broken_exchange == Some(step) {
            return Err(CoordError::Ncp(format!("no response to {}", step)));
        }
        Ok(())
    }
}

impl Default for MockNcp {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ncp for MockNcp {
    async fn reset(&self) -> CoordResult<Status> {
        self.record(NcpCall::Reset);
        self.exchange(StartupStep::Reset)?;
        Ok(self.script.lock().reset)
    }

    async fn version(&self, desired_protocol_version: u8) -> CoordResult<VersionInfo> {
        self.record(NcpCall::Version(desired_protocol_version));
        self.exchange(StartupStep::Version)?;
        let reported = self
            .script
            .lock()
            .protocol_version
            .unwrap_or(desired_protocol_version);
        Ok(VersionInfo {
            protocol_version: reported,
            stack_type: 2,
            stack_version: 0x6a10,
        })
    }

    async fn set_configuration_value(&self, id: ConfigId, value: u16) -> CoordResult<Status> {
        self.record(NcpCall::SetConfiguration(id, value));
        self.exchange(StartupStep::SetConfiguration(id))?;
        Ok(self
            .script
            .lock()
            .config_failures
            .get(&id)
            .copied()
            .unwrap_or(Status::SUCCESS))
    }

    async fn network_init(&self) -> CoordResult<Status> {
        self.record(NcpCall::NetworkInit);
        self.exchange(StartupStep::NetworkInit)?;
        Ok(self.script.lock().network_init)
    }

    async fn get_network_parameters(&self) -> CoordResult<NetworkParametersResponse> {
        self.record(NcpCall::GetNetworkParameters);
        self.exchange(StartupStep::GetNetworkParameters)?;
        let script = self.script.lock();
        Ok(NetworkParametersResponse {
            status: script.parameters,
            node_type: script.node_type,
            parameters: NetworkParameters {
                extended_pan_id: 0xdd_dd_dd_dd_dd_dd_dd_dd,
                pan_id: 0x1a62,
                radio_tx_power: 8,
                radio_channel: 15,
                channels: 1 << 15,
                ..NetworkParameters::default()
            },
        })
    }

    async fn get_node_id(&self) -> CoordResult<NodeId> {
        self.record(NcpCall::GetNodeId);
        self.exchange(StartupStep::GetNodeId)?;
        Ok(self.script.lock().node_id)
    }

    async fn get_eui64(&self) -> CoordResult<Eui64> {
        self.record(NcpCall::GetEui64);
        self.exchange(StartupStep::GetEui64)?;
        Ok(self.script.lock().eui64)
    }

    async fn set_policy(&self, policy: PolicyId, decision: DecisionId) -> CoordResult<Status> {
        self.record(NcpCall::SetPolicy(policy, decision));
        self.exchange(StartupStep::SetPolicy(policy))?;
        Ok(self
            .script
            .lock()
            .policy_failures
            .get(&policy)
            .copied()
            .unwrap_or(Status::SUCCESS))
    }

    async fn send_unicast(
        &self,
        _kind: OutgoingMessageType,
        destination: NodeId,
        aps: &ApsFrame,
        message_tag: u8,
        payload: &[u8],
    ) -> CoordResult<SendResult> {
        self.record(NcpCall::SendUnicast {
            destination,
            aps: *aps,
            message_tag,
            payload: Bytes::copy_from_slice(payload),
        });

        let (status, error) = {
            let script = self.script.lock();
            (script.send, script.send_error.clone())
        };
        if let Some(e) = error {
            return Err(e);
        }

        let mut sequence = self.send_sequence.lock();
        *sequence = sequence.wrapping_add(1);
        Ok(SendResult {
            status,
            sequence: *sequence,
        })
    }

    async fn permit_joining(&self, seconds: u8) -> CoordResult<Status> {
        self.record(NcpCall::PermitJoining(seconds));
        Ok(self.script.lock().permit)
    }

    fn subscribe(&self) -> CallbackReceiver {
        let (tx, rx) = callback_channel(64);
        *self.callbacks.lock() = tx;
        rx
    }
}
