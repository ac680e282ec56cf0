//! Recording listener and in-memory device store

use std::collections::BTreeMap;

use parking_lot::Mutex;

use zigcoord_core::{CoordError, CoordResult, Eui64, NodeId};
use zigcoord_runtime::{DeviceRecord, DeviceStore, LifecycleEvent, Listener};

/// One observed lifecycle event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeenEvent {
    pub name: &'static str,
    pub ieee: Eui64,
    pub nwk: NodeId,
}

#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<SeenEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SeenEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| e.name == name).count()
    }
}

impl Listener for RecordingListener {
    fn on_event(&self, event: &LifecycleEvent) -> CoordResult<()> {
        self.events.lock().push(SeenEvent {
            name: event.name(),
            ieee: event.device().ieee(),
            nwk: event.device().nwk(),
        });
        Ok(())
    }
}

/// Always fails
pub struct FailingListener;

impl Listener for FailingListener {
    fn on_event(&self, event: &LifecycleEvent) -> CoordResult<()> {
        Err(CoordError::Listener(format!("refusing {}", event.name())))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<Eui64, NodeId>>,
}

impl MemoryStore {
    pub fn with_records(records: impl IntoIterator<Item = DeviceRecord>) -> Self {
        MemoryStore {
            records: Mutex::new(records.into_iter().map(|r| (r.ieee, r.nwk)).collect()),
        }
    }

    pub fn records(&self) -> Vec<DeviceRecord> {
        self.records
            .lock()
            .iter()
            .map(|(&ieee, &nwk)| DeviceRecord { ieee, nwk })
            .collect()
    }
}

impl DeviceStore for MemoryStore {
    fn load(&self) -> CoordResult<Vec<DeviceRecord>> {
        Ok(self.records())
    }

    fn device_joined(&self, record: DeviceRecord) -> CoordResult<()> {
        self.records.lock().insert(record.ieee, record.nwk);
        Ok(())
    }

    fn device_left(&self, ieee: Eui64) -> CoordResult<()> {
        self.records.lock().remove(&ieee);
        Ok(())
    }
}
