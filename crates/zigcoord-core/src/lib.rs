//! zigcoord Core - Fundamental types shared by every layer
//!
//! This crate defines the types used throughout the coordinator:
//! - Identifiers (Eui64, NodeId, Tsn)
//! - NCP status and enumeration codes
//! - APS frame metadata
//! - Startup stages and the error taxonomy

pub mod id;
pub mod codes;
pub mod aps;
pub mod stage;
pub mod error;

pub use id::*;
pub use codes::*;
pub use aps::*;
pub use stage::*;
pub use error::*;
