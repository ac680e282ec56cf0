//! Device registry
//!
//! The EUI-64 map is the single source of truth. The short-address index
//! is a derived view that is checked against the primary entry on every
//! lookup and falls back to a scan when stale.

use std::collections::HashMap;
use std::sync::Arc;

use zigcoord_core::{Eui64, NodeId};

use crate::device::{Device, DeviceHandler};

/// Result of applying a join notification to the registry
#[derive(Debug)]
pub enum JoinOutcome {
    /// Same identity, same short address: nothing changed
    Duplicate(Device),
    /// Known identity under a new short address
    Rejoined { device: Device, previous: NodeId },
    /// First time we see this identity
    Created(Device),
}

/// Joined devices by stable identity
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<Eui64, Device>,
    by_nwk: HashMap<NodeId, Eui64>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ieee: Eui64) -> Option<&Device> {
        self.devices.get(&ieee)
    }

    /// Look up by current short address
    pub fn get_by_nwk(&self, nwk: NodeId) -> Option<&Device> {
        if let Some(device) = self
            .by_nwk
            .get(&nwk)
            .and_then(|ieee| self.devices.get(ieee))
            .filter(|d| d.nwk() == nwk)
        {
            return Some(device);
        }
        self.devices.values().find(|d| d.nwk() == nwk)
    }

    /// Insert a device unless its identity is already known
    ///
    /// Returns the registered record either way.
    pub fn add(
        &mut self,
        ieee: Eui64,
        nwk: NodeId,
        create: impl FnOnce() -> Arc<dyn DeviceHandler>,
    ) -> Device {
        if let Some(existing) = self.devices.get(&ieee) {
            return existing.clone();
        }
        let device = Device::new(ieee, nwk, create());
        self.devices.insert(ieee, device.clone());
        self.by_nwk.insert(nwk, ieee);
        device
    }

    /// Apply a join notification
    pub fn join(
        &mut self,
        ieee: Eui64,
        nwk: NodeId,
        create: impl FnOnce() -> Arc<dyn DeviceHandler>,
    ) -> JoinOutcome {
        match self.devices.get_mut(&ieee) {
            Some(device) if device.nwk() == nwk => JoinOutcome::Duplicate(device.clone()),
            Some(device) => {
                let previous = device.nwk();
                device.set_nwk(nwk);
                let device = device.clone();
                if self.by_nwk.get(&previous) == Some(&ieee) {
                    self.by_nwk.remove(&previous);
                }
                self.by_nwk.insert(nwk, ieee);
                JoinOutcome::Rejoined { device, previous }
            }
            None => JoinOutcome::Created(self.add(ieee, nwk, create)),
        }
    }

    /// Remove by stable identity
    pub fn remove(&mut self, ieee: Eui64) -> Option<Device> {
        let device = self.devices.remove(&ieee)?;
        if self.by_nwk.get(&device.nwk()) == Some(&ieee) {
            self.by_nwk.remove(&device.nwk());
        }
        Some(device)
    }

    /// Record radio metrics for whichever device owns `nwk`
    pub fn record_radio(&mut self, nwk: NodeId, lqi: u8, rssi: i8) -> Option<Device> {
        let ieee = self.get_by_nwk(nwk)?.ieee();
        let device = self.devices.get_mut(&ieee)?;
        device.set_radio(lqi, rssi);
        Some(device.clone())
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Snapshot of every registered device, ordered by identity
    pub fn snapshot(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.devices.values().cloned().collect();
        devices.sort_by_key(|d| d.ieee());
        devices
    }
}
