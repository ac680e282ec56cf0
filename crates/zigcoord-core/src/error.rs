//! Error types for the coordinator

use thiserror::Error;

use crate::{NodeType, StartupStage, StartupStep, Status, Tsn};

/// Core coordinator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordError {
    // Startup errors
    #[error("Startup failed at {stage}: {step} returned {status}")]
    StartupFailed {
        stage: StartupStage,
        step: StartupStep,
        status: Status,
    },

    #[error("Startup failed at {stage}: {step} exchange failed: {source}")]
    StartupExchange {
        stage: StartupStage,
        step: StartupStep,
        source: Box<CoordError>,
    },

    #[error("NCP speaks protocol version {reported}, expected {requested}")]
    VersionMismatch { requested: u8, reported: u8 },

    #[error("Network not configured as coordinator (NCP reports {0})")]
    NotCoordinator(NodeType),

    #[error("Controller not ready")]
    NotReady,

    #[error("Controller already started")]
    AlreadyStarted,

    // Correlation errors
    #[error("Transaction {0} is already pending")]
    DuplicateTransaction(Tsn),

    #[error("All 256 transaction ids are pending")]
    SequenceExhausted,

    #[error("Message send failure: TSN={tsn} status={status}")]
    SendFailure { tsn: Tsn, status: Status },

    #[error("No reply for TSN={0}")]
    NoReply(Tsn),

    #[error("Controller shut down before TSN={0} completed")]
    Shutdown(Tsn),

    // Caller errors
    #[error("Permit duration {0}s outside 0..=254")]
    PermitOutOfRange(i32),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // Codec errors
    #[error("Decode failed: {0}")]
    Decode(String),

    // Transport errors
    #[error("NCP error: {0}")]
    Ncp(String),

    #[error("{command} returned {status}")]
    CommandFailed {
        command: &'static str,
        status: Status,
    },

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    // Listener errors
    #[error("Listener failed: {0}")]
    Listener(String),
}

impl CoordError {
    /// Startup failures are terminal; the caller restarts from scratch
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            CoordError::StartupFailed { .. }
                | CoordError::StartupExchange { .. }
                | CoordError::VersionMismatch { .. }
                | CoordError::NotCoordinator(_)
        )
    }

    /// Violations of the allocator/table contract
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            CoordError::DuplicateTransaction(_) | CoordError::SequenceExhausted
        )
    }
}

/// Result type for coordinator operations
pub type CoordResult<T> = Result<T, CoordError>;
