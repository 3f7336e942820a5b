//! Error types for the patch service gateway.
//!
//! Display strings are embedded verbatim in refusal comments.

use crate::domain::Risk;

/// Errors produced by the patch service gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Patch service not configured: PIGPEN_LLM_ENDPOINT / PIGPEN_API_KEY missing.")]
    Configuration,

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Patch service error {status}: {body}")]
    ServiceError { status: u16, body: String },

    #[error("Patch refused: {reason} (risk={risk})")]
    PatchRefused { reason: String, risk: Risk },

    #[error("Patch error: {reason}")]
    PatchError { reason: String },

    #[error("patch service transport error: {0}")]
    Transport(String),

    #[error("patch service returned a malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err.to_string())
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
