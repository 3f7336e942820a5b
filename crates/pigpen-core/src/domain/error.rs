//! Domain-level error taxonomy for PigPenOS.

use crate::gateway::GatewayError;
use crate::tracker::TrackerError;
use crate::workspace::WorkspaceError;

/// PigPenOS domain errors.
#[derive(Debug, thiserror::Error)]
pub enum PigpenError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("issue tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("patch service error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for PigPenOS domain operations.
pub type Result<T> = std::result::Result<T, PigpenError>;
