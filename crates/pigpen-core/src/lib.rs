//! PigPenOS Core Library
//!
//! Issue-comment-driven patch governance: classify a comment, post a plan,
//! and on an implement request gate a machine-generated patch through
//! permission, service and protected-path checks before it may become a pull
//! request.

pub mod domain;
pub mod fakes;
pub mod gateway;
pub mod messages;
pub mod ntl;
pub mod obs;
pub mod pipeline;
pub mod protected;
pub mod router;
pub mod telemetry;
pub mod tracker;
pub mod workspace;

pub use domain::{
    Action, Domain, GovernanceOutcome, Intent, PatchLimits, PigpenError, Plan, PlanIds, Result,
    Risk, RunContext, PIGPEN_VERSION,
};

pub use gateway::{
    GatewayError, HttpPatchService, PatchProposal, PatchRequest, PatchResponse, PatchService,
    PatchServiceConfig,
};

pub use ntl::classify;
pub use router::{route, RouteInput};

pub use pipeline::{
    plan_for, Failure, GovernancePipeline, PublishStep, Refusal, RunOutcome, RunReport,
    VerifiedPatch,
};

pub use protected::{
    extract_touched_paths, is_protected, protected_paths_in, scan_patch, PatchScan, ProtectedPrefixSet,
};

pub use tracker::{
    GitHubConfig, GitHubTracker, IssueTracker, Permission, PullRequest, PullRequestDraft,
    TrackerError,
};

pub use workspace::{GitWorkspace, PushRemote, Workspace, WorkspaceError};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
