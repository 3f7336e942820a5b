//! Issue tracker capability: comments, permission lookup, pull requests.

pub mod error;
pub mod github;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use error::{TrackerError, TrackerResult};
pub use github::{GitHubConfig, GitHubTracker};

/// A collaborator's permission level on a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    None,
    Read,
    Triage,
    Write,
    Maintain,
    Admin,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Read => "read",
            Self::Triage => "triage",
            Self::Write => "write",
            Self::Maintain => "maintain",
            Self::Admin => "admin",
        }
    }

    /// Write, maintain and admin may trigger mutating runs.
    pub fn can_implement(self) -> bool {
        matches!(self, Self::Write | Self::Maintain | Self::Admin)
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pull request to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestDraft {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
}

/// An opened pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub html_url: String,
    pub number: u64,
}

/// Issue tracker bound to one repository.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Post `body` as a comment on an issue.
    async fn post_comment(&self, issue_number: u64, body: &str) -> TrackerResult<()>;

    /// Look up `username`'s permission on the repository.
    async fn user_permission(&self, username: &str) -> TrackerResult<Permission>;

    /// Open a pull request.
    async fn create_pull_request(&self, draft: &PullRequestDraft) -> TrackerResult<PullRequest>;
}
