//! APS frame metadata
//!
//! Addressing context carried alongside every application message. The
//! coordinator threads it through untouched, apart from reading the
//! destination endpoint and the sequence number.

use crate::Tsn;

/// Endpoint reserved for the device management (ZDO) sub-protocol
pub const ZDO_ENDPOINT: u8 = 0x00;

/// Application support frame header
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct ApsFrame {
    /// Application profile of the message
    pub profile_id: u16,
    /// Cluster within the profile
    pub cluster_id: u16,
    pub source_endpoint: u8,
    pub destination_endpoint: u8,
    /// APS option bitmask
    pub options: u16,
    /// Group id for multicast addressing
    pub group_id: u16,
    /// Transaction sequence number
    pub sequence: u8,
}

impl ApsFrame {
    pub fn new(profile_id: u16, cluster_id: u16, endpoint: u8, sequence: Tsn) -> Self {
        ApsFrame {
            profile_id,
            cluster_id,
            source_endpoint: endpoint,
            destination_endpoint: endpoint,
            options: 0,
            group_id: 0,
            sequence: sequence.0,
        }
    }

    #[inline]
    pub fn tsn(&self) -> Tsn {
        Tsn(self.sequence)
    }

    /// Device management frames are addressed to endpoint zero
    #[inline]
    pub fn is_zdo(&self) -> bool {
        self.destination_endpoint == ZDO_ENDPOINT
    }

    pub fn with_sequence(mut self, tsn: Tsn) -> Self {
        self.sequence = tsn.0;
        self
    }
}
