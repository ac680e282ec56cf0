//! zigcoord Test Harness - Coordinator validation without hardware
//!
//! This crate provides:
//! - A scriptable mock NCP with a call log and callback injection
//! - Recording device handlers and factory
//! - Byte-level test codecs for cluster and device management frames
//! - Recording listener and in-memory device store
//! - End-to-end controller scenarios

pub mod codec;
pub mod harness;
pub mod mock_device;
pub mod mock_ncp;
pub mod recorder;

#[cfg(test)]
mod scenarios;

pub use codec::*;
pub use harness::*;
pub use mock_device::*;
pub use mock_ncp::*;
pub use recorder::*;
