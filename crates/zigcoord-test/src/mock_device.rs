//! Recording device handlers

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use zigcoord_core::{ApsFrame, CoordError, CoordResult, Eui64, NodeId, Tsn};
use zigcoord_runtime::{DeviceFactory, DeviceHandler, WeakController};

/// An inbound request as the handler received it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceivedRequest {
    pub cluster_id: u16,
    pub tsn: Tsn,
    pub command_id: u16,
    pub args: Bytes,
}

pub struct RecordingDevice {
    pub ieee: Eui64,
    pub nwk: NodeId,
    controller: WeakController,
    fail_init: bool,
    inits: AtomicUsize,
    requests: Mutex<Vec<ReceivedRequest>>,
    radio: Mutex<Option<(u8, i8)>>,
    saw_ready: Mutex<Option<bool>>,
}

impl RecordingDevice {
    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.requests.lock().clone()
    }

    pub fn radio(&self) -> Option<(u8, i8)> {
        *self.radio.lock()
    }

    /// Whether the controller was reachable and ready during `initialize`
    pub fn saw_ready(&self) -> Option<bool> {
        *self.saw_ready.lock()
    }
}

#[async_trait]
impl DeviceHandler for RecordingDevice {
    fn radio_details(&self, lqi: u8, rssi: i8) {
        *self.radio.lock() = Some((lqi, rssi));
    }

    fn handle_request(&self, aps: &ApsFrame, tsn: Tsn, command_id: u16, args: Bytes) {
        self.requests.lock().push(ReceivedRequest {
            cluster_id: aps.cluster_id,
            tsn,
            command_id,
            args,
        });
    }

    async fn initialize(&self) -> CoordResult<()> {
        *self.saw_ready.lock() = Some(
            self.controller
                .upgrade()
                .map(|c| c.is_ready())
                .unwrap_or(false),
        );
        self.inits.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            return Err(CoordError::NoReply(Tsn(0)));
        }
        Ok(())
    }
}

/// Creates [`RecordingDevice`]s and keeps every one it made
#[derive(Default)]
pub struct RecordingFactory {
    fail_init: AtomicBool,
    created: Mutex<Vec<Arc<RecordingDevice>>>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Devices created from now on fail their interview
    pub fn fail_init(&self, fail: bool) {
        self.fail_init.store(fail, Ordering::SeqCst);
    }

    pub fn created(&self) -> Vec<Arc<RecordingDevice>> {
        self.created.lock().clone()
    }

    /// Most recent handler made for `ieee`
    pub fn device(&self, ieee: Eui64) -> Option<Arc<RecordingDevice>> {
        self.created
            .lock()
            .iter()
            .rev()
            .find(|d| d.ieee == ieee)
            .cloned()
    }

    pub fn total_inits(&self) -> usize {
        self.created.lock().iter().map(|d| d.inits()).sum()
    }
}

impl DeviceFactory for RecordingFactory {
    fn create(&self, ieee: Eui64, nwk: NodeId, controller: WeakController) -> Arc<dyn DeviceHandler> {
        let device = Arc::new(RecordingDevice {
            ieee,
            nwk,
            controller,
            fail_init: self.fail_init.load(Ordering::SeqCst),
            inits: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            radio: Mutex::new(None),
            saw_ready: Mutex::new(None),
        });
        self.created.lock().push(device.clone());
        device
    }
}
