//! Identity types for the coordinator
//!
//! Devices carry two addresses: a permanent 64-bit EUI-64 and a 16-bit
//! network address assigned on join. Outbound commands are correlated
//! with their replies by an 8-bit transaction sequence number.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoordError;

/// Stable device identity (IEEE EUI-64)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Eui64(pub u64);

impl Eui64 {
    pub const ZERO: Eui64 = Eui64(0);

    #[inline]
    pub fn new(id: u64) -> Self {
        Eui64(id)
    }

    /// Bytes as transmitted by the NCP (little-endian)
    #[inline]
    pub fn to_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Eui64(u64::from_le_bytes(bytes))
    }
}

impl fmt::Debug for Eui64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Eui64({})", self)
    }
}

impl fmt::Display for Eui64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0.to_be_bytes();
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]
        )
    }
}

impl FromStr for Eui64 {
    type Err = CoordError;

    /// Parses the colon-separated form produced by `Display`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 8 {
            return Err(CoordError::InvalidAddress(s.to_string()));
        }

        let mut bytes = [0u8; 8];
        for (slot, part) in bytes.iter_mut().zip(parts) {
            *slot = u8::from_str_radix(part, 16)
                .map_err(|_| CoordError::InvalidAddress(s.to_string()))?;
        }
        Ok(Eui64(u64::from_be_bytes(bytes)))
    }
}

/// Short network address, reassigned across re-joins
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u16);

impl NodeId {
    /// The coordinator always owns address zero
    pub const COORDINATOR: NodeId = NodeId(0x0000);

    #[inline]
    pub fn new(id: u16) -> Self {
        NodeId(id)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nwk(0x{:04x})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// Transaction sequence number
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tsn(pub u8);

impl Tsn {
    #[inline]
    pub fn new(id: u8) -> Self {
        Tsn(id)
    }

    /// Successor modulo 256
    #[inline]
    pub fn next(self) -> Self {
        Tsn(self.0.wrapping_add(1))
    }
}

impl fmt::Debug for Tsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tsn({})", self.0)
    }
}

impl fmt::Display for Tsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
