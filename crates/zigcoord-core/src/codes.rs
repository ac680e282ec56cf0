//! NCP status and enumeration codes
//!
//! Only the codes the coordinator actually inspects or sends are modeled.
//! Values follow the EZSP numbering.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status byte returned as the first element of every NCP response
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Status(pub u8);

impl Status {
    pub const SUCCESS: Status = Status(0x00);
    pub const ERR_FATAL: Status = Status(0x01);
    pub const DELIVERY_FAILED: Status = Status(0x66);
    pub const INVALID_CALL: Status = Status(0x70);
    pub const NETWORK_DOWN: Status = Status(0x91);
    pub const NOT_JOINED: Status = Status(0x93);

    #[inline]
    pub fn is_success(self) -> bool {
        self == Status::SUCCESS
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Status(0x{:02x})", self.0)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Status::SUCCESS => write!(f, "SUCCESS"),
            Status::ERR_FATAL => write!(f, "ERR_FATAL"),
            Status::DELIVERY_FAILED => write!(f, "DELIVERY_FAILED"),
            Status::INVALID_CALL => write!(f, "INVALID_CALL"),
            Status::NETWORK_DOWN => write!(f, "NETWORK_DOWN"),
            Status::NOT_JOINED => write!(f, "NOT_JOINED"),
            Status(other) => write!(f, "0x{:02x}", other),
        }
    }
}

/// Role of a node in the network
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum NodeType {
    #[default]
    Unknown = 0x00,
    Coordinator = 0x01,
    Router = 0x02,
    EndDevice = 0x03,
    SleepyEndDevice = 0x04,
}

impl NodeType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(NodeType::Unknown),
            0x01 => Some(NodeType::Coordinator),
            0x02 => Some(NodeType::Router),
            0x03 => Some(NodeType::EndDevice),
            0x04 => Some(NodeType::SleepyEndDevice),
            _ => None,
        }
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeType::Unknown => "unknown",
            NodeType::Coordinator => "coordinator",
            NodeType::Router => "router",
            NodeType::EndDevice => "end device",
            NodeType::SleepyEndDevice => "sleepy end device",
        };
        f.write_str(name)
    }
}

/// Kind of topology change reported by the trust center
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DeviceUpdate {
    StandardSecuritySecuredRejoin = 0x00,
    StandardSecurityUnsecuredJoin = 0x01,
    DeviceLeft = 0x02,
    StandardSecurityUnsecuredRejoin = 0x03,
}

impl DeviceUpdate {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(DeviceUpdate::StandardSecuritySecuredRejoin),
            0x01 => Some(DeviceUpdate::StandardSecurityUnsecuredJoin),
            0x02 => Some(DeviceUpdate::DeviceLeft),
            0x03 => Some(DeviceUpdate::StandardSecurityUnsecuredRejoin),
            _ => None,
        }
    }

    #[inline]
    pub fn is_leave(self) -> bool {
        self == DeviceUpdate::DeviceLeft
    }
}

/// Trust center decision attached to a join notification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum JoinDecision {
    UsePreconfiguredKey = 0x00,
    SendKeyInTheClear = 0x01,
    DenyJoin = 0x02,
    NoAction = 0x03,
}

impl JoinDecision {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(JoinDecision::UsePreconfiguredKey),
            0x01 => Some(JoinDecision::SendKeyInTheClear),
            0x02 => Some(JoinDecision::DenyJoin),
            0x03 => Some(JoinDecision::NoAction),
            _ => None,
        }
    }
}

/// NCP configuration keys written during bring-up
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ConfigId {
    PacketBufferCount = 0x01,
    StackProfile = 0x0C,
    SecurityLevel = 0x0D,
    TrustCenterAddressCacheSize = 0x19,
    ApplicationZdoFlags = 0x2A,
    SupportedNetworks = 0x2D,
}

impl ConfigId {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(ConfigId::PacketBufferCount),
            0x0C => Some(ConfigId::StackProfile),
            0x0D => Some(ConfigId::SecurityLevel),
            0x19 => Some(ConfigId::TrustCenterAddressCacheSize),
            0x2A => Some(ConfigId::ApplicationZdoFlags),
            0x2D => Some(ConfigId::SupportedNetworks),
            _ => None,
        }
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Bits of the `ApplicationZdoFlags` configuration value
pub mod zdo_flags {
    pub const APP_RECEIVES_SUPPORTED_ZDO_REQUESTS: u16 = 0x01;
    pub const APP_HANDLES_UNSUPPORTED_ZDO_REQUESTS: u16 = 0x02;
    pub const APP_HANDLES_ZDO_ENDPOINT_REQUESTS: u16 = 0x04;
    pub const APP_HANDLES_ZDO_BINDING_REQUESTS: u16 = 0x08;
}

/// NCP policy identifiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PolicyId {
    TrustCenterPolicy = 0x00,
    BindingModificationPolicy = 0x01,
    UnicastRepliesPolicy = 0x02,
    TcKeyRequestPolicy = 0x05,
    AppKeyRequestPolicy = 0x06,
}

impl PolicyId {
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Decisions that can be installed for a policy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum DecisionId {
    AllowJoins = 0x00,
    AllowPreconfiguredKeyJoins = 0x01,
    AllowRejoinsOnly = 0x02,
    DisallowAllJoinsAndRejoins = 0x03,
    DenyTcKeyRequests = 0x50,
    AllowTcKeyRequests = 0x51,
    DenyAppKeyRequests = 0x60,
    AllowAppKeyRequests = 0x61,
}

impl DecisionId {
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Addressing mode of an outgoing message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum OutgoingMessageType {
    #[default]
    Direct = 0x00,
    ViaAddressTable = 0x01,
    ViaBinding = 0x02,
    Multicast = 0x03,
    Broadcast = 0x04,
}

/// Addressing mode of an incoming message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum IncomingMessageType {
    #[default]
    Unicast = 0x00,
    UnicastReply = 0x01,
    Multicast = 0x02,
    MulticastLoopback = 0x03,
    Broadcast = 0x04,
    BroadcastLoopback = 0x05,
}
