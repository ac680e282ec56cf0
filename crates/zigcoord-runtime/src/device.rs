//! Device records and the device-object seam
//!
//! The coordinator tracks addressing and radio metrics for each joined
//! device. Everything protocol-specific (endpoints, clusters, interviews)
//! belongs to the [`DeviceHandler`] created for it by a [`DeviceFactory`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use zigcoord_core::{ApsFrame, CoordResult, Eui64, NodeId, Tsn};

use crate::WeakController;

/// Per-device protocol logic supplied by the application
#[async_trait]
pub trait DeviceHandler: Send + Sync {
    /// Latest link quality and signal strength seen from the device
    fn radio_details(&self, lqi: u8, rssi: i8);

    /// An inbound request addressed to us by this device
    fn handle_request(&self, aps: &ApsFrame, tsn: Tsn, command_id: u16, args: Bytes);

    /// Interview the device after it joins
    ///
    /// Runs on its own task; failures are logged and otherwise left to
    /// the handler.
    async fn initialize(&self) -> CoordResult<()>;
}

/// Builds the handler for a newly observed device
pub trait DeviceFactory: Send + Sync {
    fn create(&self, ieee: Eui64, nwk: NodeId, controller: WeakController) -> Arc<dyn DeviceHandler>;
}

/// Registry entry for one joined device
#[derive(Clone)]
pub struct Device {
    ieee: Eui64,
    nwk: NodeId,
    lqi: Option<u8>,
    rssi: Option<i8>,
    handler: Arc<dyn DeviceHandler>,
}

impl Device {
    pub fn new(ieee: Eui64, nwk: NodeId, handler: Arc<dyn DeviceHandler>) -> Self {
        Device {
            ieee,
            nwk,
            lqi: None,
            rssi: None,
            handler,
        }
    }

    pub fn ieee(&self) -> Eui64 {
        self.ieee
    }

    pub fn nwk(&self) -> NodeId {
        self.nwk
    }

    pub fn lqi(&self) -> Option<u8> {
        self.lqi
    }

    pub fn rssi(&self) -> Option<i8> {
        self.rssi
    }

    pub fn handler(&self) -> &Arc<dyn DeviceHandler> {
        &self.handler
    }

    pub(crate) fn set_nwk(&mut self, nwk: NodeId) {
        self.nwk = nwk;
    }

    pub(crate) fn set_radio(&mut self, lqi: u8, rssi: i8) {
        self.lqi = Some(lqi);
        self.rssi = Some(rssi);
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("ieee", &self.ieee)
            .field("nwk", &self.nwk)
            .field("lqi", &self.lqi)
            .field("rssi", &self.rssi)
            .finish_non_exhaustive()
    }
}
