//! zigcoord Runtime - Coordinator controller
//!
//! This crate drives a network co-processor as a Zigbee coordinator:
//! 1. Bring the NCP up (reset, version, configuration, network, role, policies)
//! 2. Correlate outgoing requests with replies by transaction sequence number
//! 3. Route inbound requests to per-device handlers
//! 4. Track joins and leaves in the device registry
//! 5. Notify lifecycle listeners and schedule device initialization

pub mod config;
pub mod controller;
pub mod device;
pub mod listener;
pub mod pending;
pub mod registry;
pub mod sequence;
pub mod startup;
pub mod store;
pub mod telemetry;

mod dispatch;
mod init;

pub use config::{
    ConfigValue, ControllerConfig, LoggingConfig, PolicySetting, StartupConfig,
    MAX_PERMIT_SECONDS,
};
pub use controller::{Controller, WeakController};
pub use device::{Device, DeviceFactory, DeviceHandler};
pub use listener::{LifecycleEvent, Listener, ListenerBus, ListenerId};
pub use pending::{Outcome, PendingHandle, PendingTable};
pub use registry::{DeviceRegistry, JoinOutcome};
pub use sequence::SequenceAllocator;
pub use startup::{NetworkSession, StartupSequencer};
pub use store::{DeviceRecord, DeviceStore};
pub use telemetry::init_tracing;
