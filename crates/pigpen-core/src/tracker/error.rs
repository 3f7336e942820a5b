//! Error types for the issue tracker.

/// Errors produced by issue tracker calls.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("GitHub API error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("GitHub API transport error: {0}")]
    Transport(String),

    #[error("GitHub API returned a malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TrackerError {
    fn from(err: reqwest::Error) -> Self {
        TrackerError::Transport(err.to_string())
    }
}

/// Result type for issue tracker operations.
pub type TrackerResult<T> = std::result::Result<T, TrackerError>;
