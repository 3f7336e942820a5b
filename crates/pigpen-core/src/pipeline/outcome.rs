//! Terminal outcomes of a governance run.

use serde::{Deserialize, Serialize};

use crate::domain::{Action, GovernanceOutcome, Plan};
use crate::tracker::{Permission, PullRequest};

/// A policy decline. Never fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Refusal {
    InsufficientPermission { actor: String, permission: Permission },
    PermissionLookupFailed { actor: String, reason: String },
    ServiceUnhealthy { reason: String },
    PatchRequestFailed { reason: String },
    TestsNotIncluded,
    ForbiddenPathsReported,
    ProtectedPathsTouched { paths: Vec<String> },
}

impl Refusal {
    /// Stable code humans and tests search comment history for.
    pub fn code(&self) -> &'static str {
        match self {
            Refusal::InsufficientPermission { .. } => "TAID-PPOS-REFUSAL-0005",
            Refusal::PermissionLookupFailed { .. } => "TAID-PPOS-REFUSAL-0006",
            Refusal::ServiceUnhealthy { .. } => "TAID-PPOS-REFUSAL-0007",
            Refusal::PatchRequestFailed { .. } => "TAID-PPOS-REFUSAL-0008",
            Refusal::TestsNotIncluded => "TAID-PPOS-REFUSAL-0009",
            Refusal::ForbiddenPathsReported => "TAID-PPOS-REFUSAL-0010",
            Refusal::ProtectedPathsTouched { .. } => "TAID-PPOS-REFUSAL-0011",
        }
    }
}

impl std::fmt::Display for Refusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Refusal::InsufficientPermission { actor, permission } => write!(
                f,
                "@{actor} permission is '{permission}'. Required: write/maintain/admin."
            ),
            Refusal::PermissionLookupFailed { actor, .. } => {
                write!(f, "unable to verify actor permission for @{actor}.")
            }
            Refusal::ServiceUnhealthy { .. } => f.write_str("patch service health check failed."),
            Refusal::PatchRequestFailed { .. } => f.write_str("patch request failed."),
            Refusal::TestsNotIncluded => {
                f.write_str("patch service indicates tests were not included.")
            }
            Refusal::ForbiddenPathsReported => {
                f.write_str("patch service indicates forbidden paths touched.")
            }
            Refusal::ProtectedPathsTouched { .. } => {
                f.write_str("protected paths detected in patch.")
            }
        }
    }
}

/// The step of the publish stage that broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStep {
    Commit,
    Push,
    PullRequest,
}

impl std::fmt::Display for PublishStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PublishStep::Commit => "commit",
            PublishStep::Push => "push",
            PublishStep::PullRequest => "pull request creation",
        })
    }
}

/// An execution defect after every gate passed. Fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    BranchSetup { reason: String },
    PatchApply { reason: String },
    /// `reason` is set when the test command could not run at all.
    TestsFailed { reason: Option<String> },
    Publish { step: PublishStep, reason: String },
}

impl Failure {
    pub fn code(&self) -> &'static str {
        match self {
            Failure::BranchSetup { .. } => "TAID-PPOS-FAIL-0002",
            Failure::PatchApply { .. } => "TAID-PPOS-FAIL-0003",
            Failure::TestsFailed { .. } => "TAID-PPOS-FAIL-0004",
            Failure::Publish { .. } => "TAID-PPOS-FAIL-0005",
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::BranchSetup { .. } => f.write_str("Branch setup failed; nothing was pushed."),
            Failure::PatchApply { .. } => f.write_str("Patch apply failed."),
            Failure::TestsFailed { .. } => f.write_str("Tests failed; PR not created."),
            Failure::Publish { step, .. } => {
                write!(f, "Publishing failed at {step}; tests passed but no PR was opened.")
            }
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// A non-implement action: the plan comment was the whole run.
    PlanOnly { action: Action },
    Refused { refusal: Refusal },
    Failed { failure: Failure },
    Opened { pull_request: PullRequest },
}

impl RunOutcome {
    /// Process exit code: 1 for execution failures, 0 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Failed { .. } => 1,
            _ => 0,
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub plan: Plan,
    pub outcome: RunOutcome,
    /// Names of the states the run passed through, in order.
    pub stages: Vec<String>,
}

impl RunReport {
    /// Escalation state derived from the outcome; the plan itself never changes.
    pub fn governance(&self) -> GovernanceOutcome {
        match &self.outcome {
            RunOutcome::Refused {
                refusal: Refusal::ProtectedPathsTouched { paths },
            } => GovernanceOutcome::escalated(paths.clone()),
            _ => GovernanceOutcome::default(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}
