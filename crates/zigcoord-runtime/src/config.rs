//! Controller configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use zigcoord_core::{zdo_flags, ConfigId, CoordError, CoordResult, DecisionId, PolicyId};

/// Largest permit-joining window the protocol accepts, in seconds
pub const MAX_PERMIT_SECONDS: i32 = 254;

/// One `setConfigurationValue` written during bring-up
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct ConfigValue {
    pub id: ConfigId,
    pub value: u16,
}

/// One `setPolicy` installed during bring-up
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct PolicySetting {
    pub policy: PolicyId,
    pub decision: DecisionId,
}

/// Bring-up settings
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    /// Protocol version requested in the `version` handshake
    pub protocol_version: u8,
    /// Written in order; every one must succeed
    pub configuration: Vec<ConfigValue>,
    /// Installed in order after the role check
    pub policies: Vec<PolicySetting>,
}

impl Default for StartupConfig {
    fn default() -> Self {
        StartupConfig {
            protocol_version: 4,
            configuration: vec![
                ConfigValue {
                    id: ConfigId::StackProfile,
                    value: 2,
                },
                ConfigValue {
                    id: ConfigId::SecurityLevel,
                    value: 5,
                },
                ConfigValue {
                    id: ConfigId::SupportedNetworks,
                    value: 1,
                },
                ConfigValue {
                    id: ConfigId::ApplicationZdoFlags,
                    value: zdo_flags::APP_RECEIVES_SUPPORTED_ZDO_REQUESTS
                        | zdo_flags::APP_HANDLES_UNSUPPORTED_ZDO_REQUESTS,
                },
                ConfigValue {
                    id: ConfigId::TrustCenterAddressCacheSize,
                    value: 2,
                },
                ConfigValue {
                    id: ConfigId::PacketBufferCount,
                    value: 0xff,
                },
            ],
            policies: vec![
                PolicySetting {
                    policy: PolicyId::TcKeyRequestPolicy,
                    decision: DecisionId::DenyTcKeyRequests,
                },
                PolicySetting {
                    policy: PolicyId::AppKeyRequestPolicy,
                    decision: DecisionId::AllowAppKeyRequests,
                },
                PolicySetting {
                    policy: PolicyId::TrustCenterPolicy,
                    decision: DecisionId::AllowPreconfiguredKeyJoins,
                },
            ],
        }
    }
}

/// Log output settings
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: "info".to_string(),
            json: false,
        }
    }
}

/// Controller configuration
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub startup: StartupConfig,
    /// How long `request` waits for a reply; `None` waits forever
    #[serde(deserialize_with = "deserialize_timeout")]
    pub request_timeout: Option<Duration>,
    /// Used by `permit_default`
    pub default_permit_seconds: u8,
    pub logging: LoggingConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            startup: StartupConfig::default(),
            request_timeout: Some(Duration::from_secs(10)),
            default_permit_seconds: 60,
            logging: LoggingConfig::default(),
        }
    }
}

impl ControllerConfig {
    pub fn from_json_str(json: &str) -> CoordResult<Self> {
        let config: ControllerConfig =
            serde_json::from_str(json).map_err(|e| CoordError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> CoordResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CoordError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> CoordResult<()> {
        if i32::from(self.default_permit_seconds) > MAX_PERMIT_SECONDS {
            return Err(CoordError::Config(format!(
                "default_permit_seconds {} exceeds {}",
                self.default_permit_seconds, MAX_PERMIT_SECONDS
            )));
        }
        if self.request_timeout == Some(Duration::ZERO) {
            return Err(CoordError::Config("request_timeout must be non-zero".into()));
        }
        Ok(())
    }
}

fn deserialize_timeout<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
        .transpose()
}
