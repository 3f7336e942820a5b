//! Working-tree capability: read context, branch, apply, test, commit, push.
//!
//! # Modules
//!
//! - [`command`]: subprocess runner (`run_command`, `CommandOutput`)
//! - [`git`]: `GitWorkspace`, `PushRemote`
//! - [`error`]: `WorkspaceError` / `WorkspaceResult`

pub mod command;
pub mod error;
pub mod git;

use async_trait::async_trait;

pub use command::{run_command, CommandOutput};
pub use error::{WorkspaceError, WorkspaceResult};
pub use git::{GitWorkspace, PushRemote};

/// The repository checkout a run mutates.
///
/// Only `read_context_file` may be called before every governance gate has
/// passed; the rest mutate the tree or the remote.
#[async_trait]
pub trait Workspace: Send + Sync {
    /// Best-effort read of a repository-relative file; empty when unreadable.
    async fn read_context_file(&self, path: &str) -> String;

    /// Create and check out `branch`.
    async fn create_branch(&self, branch: &str) -> WorkspaceResult<()>;

    /// Point `origin` at the authenticated URL for `repo`.
    async fn configure_push_remote(&self, repo: &str) -> WorkspaceResult<()>;

    /// Apply a literal unified diff to the working tree.
    async fn apply_patch(&self, patch: &str) -> WorkspaceResult<()>;

    /// Run the project's test command. A failing suite is `Ok` with a
    /// non-passing output; `Err` means the command could not run.
    async fn run_tests(&self) -> WorkspaceResult<CommandOutput>;

    /// Stage everything and commit with `message`.
    async fn commit_all(&self, message: &str) -> WorkspaceResult<()>;

    /// Push `branch` to `origin` with upstream tracking.
    async fn push_branch(&self, branch: &str) -> WorkspaceResult<()>;
}
