//! Persistence seam
//!
//! A [`DeviceStore`] is read once before bring-up to repopulate the
//! registry, then kept current by observing lifecycle events.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use zigcoord_core::{CoordResult, Eui64, NodeId};

use crate::listener::{LifecycleEvent, Listener};

/// Persisted addressing for one device
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub ieee: Eui64,
    pub nwk: NodeId,
}

/// Durable registry storage supplied by the application
pub trait DeviceStore: Send + Sync {
    fn load(&self) -> CoordResult<Vec<DeviceRecord>>;

    fn device_joined(&self, record: DeviceRecord) -> CoordResult<()>;

    fn device_left(&self, ieee: Eui64) -> CoordResult<()>;
}

/// Adapts a store to the listener bus
pub(crate) struct StoreListener {
    store: Arc<dyn DeviceStore>,
}

impl StoreListener {
    pub(crate) fn new(store: Arc<dyn DeviceStore>) -> Self {
        StoreListener { store }
    }
}

impl Listener for StoreListener {
    fn on_event(&self, event: &LifecycleEvent) -> CoordResult<()> {
        match event {
            LifecycleEvent::DeviceJoined(device) => self.store.device_joined(DeviceRecord {
                ieee: device.ieee(),
                nwk: device.nwk(),
            }),
            LifecycleEvent::DeviceLeft(device) => self.store.device_left(device.ieee()),
        }
    }
}
