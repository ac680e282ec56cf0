//! Startup sequencer
//!
//! Brings the NCP into coordinator mode:
//!
//! `Idle -> Reset -> VersionChecked -> Configured(k) -> NetworkInitialized
//!  -> RoleVerified -> PoliciesSet -> Ready`
//!
//! Every transition is one NCP call whose status is checked before moving
//! on. The first failure is terminal; retrying means running the whole
//! sequence again.

use tracing::{debug, info};

use zigcoord_core::{
    CoordError, CoordResult, Eui64, NodeId, NodeType, StartupStage, StartupStep, Status,
};
use zigcoord_ncp::{NetworkParameters, Ncp};

use crate::config::StartupConfig;

/// The coordinator's own identity once bring-up has succeeded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkSession {
    pub nwk: NodeId,
    pub ieee: Eui64,
    pub parameters: NetworkParameters,
    pub ready: bool,
}

/// Drives the bring-up handshake
pub struct StartupSequencer<'a> {
    ncp: &'a dyn Ncp,
    config: &'a StartupConfig,
    stage: StartupStage,
}

impl<'a> StartupSequencer<'a> {
    pub fn new(ncp: &'a dyn Ncp, config: &'a StartupConfig) -> Self {
        StartupSequencer {
            ncp,
            config,
            stage: StartupStage::Idle,
        }
    }

    /// Where the sequencer got to
    pub fn stage(&self) -> StartupStage {
        self.stage
    }

    /// Run every step in order
    pub async fn run(&mut self) -> CoordResult<NetworkSession> {
        self.reset().await?;
        self.check_version().await?;
        self.configure().await?;
        self.init_network().await?;
        let parameters = self.verify_role().await?;
        self.set_policies().await?;
        self.latch_identity(parameters).await
    }

    async fn reset(&mut self) -> CoordResult<()> {
        let status = self.exchange(StartupStep::Reset, self.ncp.reset().await)?;
        self.check(StartupStep::Reset, status)?;
        self.advance(StartupStage::Reset);
        Ok(())
    }

    async fn check_version(&mut self) -> CoordResult<()> {
        let requested = self.config.protocol_version;
        let info = self.exchange(StartupStep::Version, self.ncp.version(requested).await)?;
        if info.protocol_version != requested {
            return Err(CoordError::VersionMismatch {
                requested,
                reported: info.protocol_version,
            });
        }
        debug!(
            protocol = info.protocol_version,
            stack_type = info.stack_type,
            stack_version = format_args!("0x{:04x}", info.stack_version),
            "NCP version"
        );
        self.advance(StartupStage::VersionChecked);
        Ok(())
    }

    async fn configure(&mut self) -> CoordResult<()> {
        for (k, entry) in self.config.configuration.iter().enumerate() {
            let step = StartupStep::SetConfiguration(entry.id);
            let status = self.exchange(
                step,
                self.ncp.set_configuration_value(entry.id, entry.value).await,
            )?;
            self.check(step, status)?;
            debug!(id = ?entry.id, value = entry.value, "configuration value set");
            self.advance(StartupStage::Configured(k));
        }
        Ok(())
    }

    async fn init_network(&mut self) -> CoordResult<()> {
        let status = self.exchange(StartupStep::NetworkInit, self.ncp.network_init().await)?;
        self.check(StartupStep::NetworkInit, status)?;
        self.advance(StartupStage::NetworkInitialized);
        Ok(())
    }

    async fn verify_role(&mut self) -> CoordResult<NetworkParameters> {
        let response = self.exchange(
            StartupStep::GetNetworkParameters,
            self.ncp.get_network_parameters().await,
        )?;
        self.check(StartupStep::GetNetworkParameters, response.status)?;
        if response.node_type != NodeType::Coordinator {
            return Err(CoordError::NotCoordinator(response.node_type));
        }
        self.advance(StartupStage::RoleVerified);
        Ok(response.parameters)
    }

    async fn set_policies(&mut self) -> CoordResult<()> {
        for setting in &self.config.policies {
            let step = StartupStep::SetPolicy(setting.policy);
            let status = self.exchange(
                step,
                self.ncp.set_policy(setting.policy, setting.decision).await,
            )?;
            self.check(step, status)?;
        }
        self.advance(StartupStage::PoliciesSet);
        Ok(())
    }

    async fn latch_identity(&mut self, parameters: NetworkParameters) -> CoordResult<NetworkSession> {
        let nwk = self.exchange(StartupStep::GetNodeId, self.ncp.get_node_id().await)?;
        let ieee = self.exchange(StartupStep::GetEui64, self.ncp.get_eui64().await)?;
        self.advance(StartupStage::Ready);

        info!(
            nwk = %nwk,
            ieee = %ieee,
            pan_id = format_args!("0x{:04x}", parameters.pan_id),
            channel = parameters.radio_channel,
            "coordinator ready"
        );

        Ok(NetworkSession {
            nwk,
            ieee,
            parameters,
            ready: true,
        })
    }

    /// Tag a failed exchange with the step it belongs to
    fn exchange<T>(&self, step: StartupStep, result: CoordResult<T>) -> CoordResult<T> {
        result.map_err(|e| CoordError::StartupExchange {
            stage: self.stage,
            step,
            source: Box::new(e),
        })
    }

    fn check(&self, step: StartupStep, status: Status) -> CoordResult<()> {
        if status.is_success() {
            Ok(())
        } else {
            Err(CoordError::StartupFailed {
                stage: self.stage,
                step,
                status,
            })
        }
    }

    fn advance(&mut self, next: StartupStage) {
        debug!(from = %self.stage, to = %next, "startup transition");
        self.stage = next;
    }
}
