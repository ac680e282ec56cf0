//! Controller wired to the mock NCP

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use zigcoord_core::{ApsFrame, DeviceUpdate, Eui64, NodeId, Tsn, ZDO_ENDPOINT};
use zigcoord_ncp::{Codecs, NcpCallback};
use zigcoord_runtime::{Controller, ControllerConfig};

use crate::codec::{TestCodec, ZdoTestCodec};
use crate::mock_device::RecordingFactory;
use crate::mock_ncp::MockNcp;
use crate::recorder::RecordingListener;

/// Home automation profile
pub const HA_PROFILE: u16 = 0x0104;
/// On/Off cluster
pub const ON_OFF_CLUSTER: u16 = 0x0006;

pub struct Harness {
    pub ncp: Arc<MockNcp>,
    pub factory: Arc<RecordingFactory>,
    pub listener: Arc<RecordingListener>,
    pub controller: Controller,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ControllerConfig::default())
    }

    pub fn with_config(config: ControllerConfig) -> Self {
        let ncp = Arc::new(MockNcp::new());
        let factory = Arc::new(RecordingFactory::new());
        let listener = Arc::new(RecordingListener::new());
        let codecs = Codecs::new(Arc::new(ZdoTestCodec), Arc::new(TestCodec));

        let controller = Controller::new(ncp.clone(), codecs, factory.clone(), config);
        controller.add_listener(listener.clone());

        Harness {
            ncp,
            factory,
            listener,
            controller,
        }
    }

    /// Default harness after a successful startup
    pub async fn started() -> Self {
        Self::started_with(ControllerConfig::default()).await
    }

    pub async fn started_with(config: ControllerConfig) -> Self {
        let harness = Self::with_config(config);
        if let Err(e) = harness.controller.startup().await {
            panic!("startup failed: {}", e);
        }
        harness
    }

    pub fn join(&self, ieee: Eui64, nwk: NodeId) {
        self.controller
            .handle_callback(NcpCallback::device_update(
                nwk,
                ieee,
                DeviceUpdate::StandardSecurityUnsecuredJoin,
            ));
    }

    pub fn leave(&self, ieee: Eui64, nwk: NodeId) {
        self.controller
            .handle_callback(NcpCallback::device_update(nwk, ieee, DeviceUpdate::DeviceLeft));
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// APS frame for an On/Off cluster exchange on endpoint 1
pub fn on_off_frame(tsn: Tsn) -> ApsFrame {
    ApsFrame::new(HA_PROFILE, ON_OFF_CLUSTER, 1, tsn)
}

/// Device management frame for `cluster` on endpoint 0
pub fn zdo_frame(cluster: u16, tsn: Tsn) -> ApsFrame {
    ApsFrame::new(0x0000, cluster, ZDO_ENDPOINT, tsn)
}

/// Incoming device management frame from `sender`
pub fn zdo_from(sender: NodeId, cluster: u16, tsn: Tsn, args: &[u8]) -> NcpCallback {
    NcpCallback::incoming_unicast(
        zdo_frame(cluster, tsn),
        sender,
        160,
        -60,
        ZdoTestCodec::encode(tsn, args),
    )
}

/// Incoming reply from `sender` for `tsn`
pub fn reply_from(sender: NodeId, tsn: Tsn, args: &[u8]) -> NcpCallback {
    NcpCallback::incoming_unicast(
        on_off_frame(tsn),
        sender,
        180,
        -52,
        TestCodec::encode(tsn, 0x000b, true, args),
    )
}

/// Incoming request from `sender`
pub fn request_from(sender: NodeId, tsn: Tsn, command_id: u16, args: &[u8]) -> NcpCallback {
    NcpCallback::incoming_unicast(
        on_off_frame(tsn),
        sender,
        200,
        -40,
        TestCodec::encode(tsn, command_id, false, args),
    )
}

/// Malformed frame from `sender`
pub fn garbage_from(sender: NodeId) -> NcpCallback {
    NcpCallback::incoming_unicast(on_off_frame(Tsn(0)), sender, 90, -80, Bytes::from_static(&[0x01]))
}

/// Poll `condition` until it holds or two seconds pass
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
