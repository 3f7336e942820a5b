//! Error types for working-tree operations.

/// Errors produced by git and test-runner invocations.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("command is empty")]
    EmptyCommand,

    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} timed out after {secs} seconds")]
    Timeout { command: String, secs: u64 },

    #[error("{command} failed (exit {exit_code}): {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for workspace operations.
pub type WorkspaceResult<T> = std::result::Result<T, WorkspaceError>;
