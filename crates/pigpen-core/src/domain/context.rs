//! Explicit per-run context, constructed once at process start.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{PigpenError, Result};
use crate::protected::ProtectedPrefixSet;

/// Bounds sent to the patch service with every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchLimits {
    pub max_files: u32,
    pub max_diff_lines: u32,
    pub must_include_tests: bool,
}

impl Default for PatchLimits {
    fn default() -> Self {
        Self {
            max_files: 10,
            max_diff_lines: 400,
            must_include_tests: true,
        }
    }
}

/// Everything a run knows about its triggering event.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Log correlation only; never sent anywhere.
    pub run_id: Uuid,
    /// `owner/name`.
    pub repo: String,
    pub issue_number: u64,
    pub issue_title: String,
    pub issue_body: String,
    pub comment_body: String,
    pub actor: String,
    pub base_branch: String,
    pub protected_prefixes: ProtectedPrefixSet,
    pub limits: PatchLimits,
}

impl RunContext {
    /// Create a context for `repo` (`owner/name`) and an issue number.
    pub fn new(repo: impl Into<String>, issue_number: u64) -> Result<Self> {
        let repo = repo.into();
        let valid = repo
            .split_once('/')
            .map(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'))
            .unwrap_or(false);
        if !valid {
            return Err(PigpenError::Config(format!(
                "repository must be 'owner/name', got '{repo}'"
            )));
        }
        if issue_number == 0 {
            return Err(PigpenError::Config(
                "issue number must be positive".to_string(),
            ));
        }

        Ok(Self {
            run_id: Uuid::new_v4(),
            repo,
            issue_number,
            issue_title: String::new(),
            issue_body: String::new(),
            comment_body: String::new(),
            actor: String::new(),
            base_branch: "main".to_string(),
            protected_prefixes: ProtectedPrefixSet::default(),
            limits: PatchLimits::default(),
        })
    }

    pub fn with_issue(mut self, title: impl Into<String>, body: impl Into<String>) -> Self {
        self.issue_title = title.into();
        self.issue_body = body.into();
        self
    }

    pub fn with_comment(mut self, body: impl Into<String>) -> Self {
        self.comment_body = body.into();
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    /// Set the base branch; blank values keep the default `main`.
    pub fn with_base_branch(mut self, base: impl Into<String>) -> Self {
        let base = base.into();
        if !base.trim().is_empty() {
            self.base_branch = base.trim().to_string();
        }
        self
    }

    pub fn with_protected_prefixes(mut self, prefixes: ProtectedPrefixSet) -> Self {
        self.protected_prefixes = prefixes;
        self
    }

    pub fn with_limits(mut self, limits: PatchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Branch a successful run pushes to.
    pub fn branch_name(&self) -> String {
        format!("pigpen/issue-{}", self.issue_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_malformed_repo() {
        assert!(RunContext::new("just-a-name", 1).is_err());
        assert!(RunContext::new("/name", 1).is_err());
        assert!(RunContext::new("owner/", 1).is_err());
        assert!(RunContext::new("a/b/c", 1).is_err());
    }

    #[test]
    fn test_new_rejects_zero_issue() {
        let err = RunContext::new("acme/api", 0).unwrap_err();
        assert!(err.to_string().contains("issue number"));
    }

    #[test]
    fn test_defaults() {
        let ctx = RunContext::new("acme/api", 42).unwrap();
        assert_eq!(ctx.base_branch, "main");
        assert_eq!(ctx.limits, PatchLimits::default());
        assert_eq!(ctx.branch_name(), "pigpen/issue-42");
        assert!(ctx.protected_prefixes.contains("01_CANON/"));
    }

    #[test]
    fn test_blank_base_branch_keeps_main() {
        let ctx = RunContext::new("acme/api", 1)
            .unwrap()
            .with_base_branch("   ");
        assert_eq!(ctx.base_branch, "main");

        let ctx = ctx.with_base_branch("develop");
        assert_eq!(ctx.base_branch, "develop");
    }
}
