//! zigcoord NCP Layer - Boundary to the network co-processor
//!
//! This crate provides:
//! - The command surface of the NCP driver
//! - The callback stream pushed by the NCP
//! - The decoder seam for the ZDO and ZCL sub-protocols

pub mod driver;
pub mod callback;
pub mod codec;

pub use driver::*;
pub use callback::*;
pub use codec::*;
