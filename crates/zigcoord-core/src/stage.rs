//! Startup stages
//!
//! Bring-up is a strictly ordered chain; each stage names the NCP call
//! that moves the sequencer out of it.

use std::fmt;

use crate::{ConfigId, PolicyId};

/// Position of the startup sequencer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum StartupStage {
    #[default]
    Idle,
    Reset,
    VersionChecked,
    /// k-th configuration value written
    Configured(usize),
    NetworkInitialized,
    RoleVerified,
    PoliciesSet,
    Ready,
}

impl StartupStage {
    pub fn is_ready(self) -> bool {
        self == StartupStage::Ready
    }
}

impl fmt::Display for StartupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupStage::Idle => write!(f, "idle"),
            StartupStage::Reset => write!(f, "reset"),
            StartupStage::VersionChecked => write!(f, "version checked"),
            StartupStage::Configured(k) => write!(f, "configured({})", k),
            StartupStage::NetworkInitialized => write!(f, "network initialized"),
            StartupStage::RoleVerified => write!(f, "role verified"),
            StartupStage::PoliciesSet => write!(f, "policies set"),
            StartupStage::Ready => write!(f, "ready"),
        }
    }
}

/// The NCP call that failed during bring-up
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartupStep {
    Reset,
    Version,
    SetConfiguration(ConfigId),
    NetworkInit,
    GetNetworkParameters,
    SetPolicy(PolicyId),
    GetNodeId,
    GetEui64,
}

impl fmt::Display for StartupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupStep::Reset => write!(f, "reset"),
            StartupStep::Version => write!(f, "version"),
            StartupStep::SetConfiguration(id) => write!(f, "setConfigurationValue({:?})", id),
            StartupStep::NetworkInit => write!(f, "networkInit"),
            StartupStep::GetNetworkParameters => write!(f, "getNetworkParameters"),
            StartupStep::SetPolicy(id) => write!(f, "setPolicy({:?})", id),
            StartupStep::GetNodeId => write!(f, "getNodeId"),
            StartupStep::GetEui64 => write!(f, "getEui64"),
        }
    }
}
