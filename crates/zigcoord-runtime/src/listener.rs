//! Lifecycle event bus
//!
//! Observers are called synchronously, in registration order, from within
//! the call that emits the event. A failing observer is logged and does
//! not stop delivery to the ones after it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::error;

use zigcoord_core::CoordResult;

use crate::device::Device;

/// Device lifecycle events
#[derive(Clone, Debug)]
pub enum LifecycleEvent {
    DeviceJoined(Device),
    DeviceLeft(Device),
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::DeviceJoined(_) => "device_joined",
            LifecycleEvent::DeviceLeft(_) => "device_left",
        }
    }

    pub fn device(&self) -> &Device {
        match self {
            LifecycleEvent::DeviceJoined(d) | LifecycleEvent::DeviceLeft(d) => d,
        }
    }
}

/// Observer of lifecycle events
pub trait Listener: Send + Sync {
    fn on_event(&self, event: &LifecycleEvent) -> CoordResult<()>;
}

/// Handle returned by [`ListenerBus::add`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered set of observers
#[derive(Default)]
pub struct ListenerBus {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn Listener>)>>,
}

impl ListenerBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn Listener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Deliver `event` to every observer; returns how many succeeded
    pub fn emit(&self, event: &LifecycleEvent) -> usize {
        // Snapshot so observers may add or remove listeners re-entrantly
        let listeners: Vec<(ListenerId, Arc<dyn Listener>)> = self.listeners.read().clone();

        let mut delivered = 0;
        for (id, listener) in listeners {
            match listener.on_event(event) {
                Ok(()) => delivered += 1,
                Err(e) => error!(
                    listener = ?id,
                    event = event.name(),
                    ieee = %event.device().ieee(),
                    "listener failed: {}",
                    e
                ),
            }
        }
        delivered
    }
}
