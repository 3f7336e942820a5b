//! The governance pipeline.
//!
//! A run posts its plan, then walks an explicit state machine:
//!
//! ```text
//! planned -> authorized -> service_healthy -> patch_received
//!   -> claims_accepted -> verified -> branch_ready -> applied -> tested
//!   -> (pull request opened)
//! ```
//!
//! Every transition either advances or finishes the run with a
//! [`RunOutcome`]. Gate failures finish with a [`Refusal`]; execution
//! failures after the gates finish with a [`Failure`]. Only a
//! [`VerifiedPatch`] can reach `branch_ready`, so nothing touches the working
//! tree or the remote before every gate has passed.
//!
//! # Modules
//!
//! - [`outcome`]: `Refusal`, `Failure`, `RunOutcome`, `RunReport`
//! - [`verify`]: mechanical protected-path verification

pub mod outcome;
pub mod verify;

use std::sync::Arc;

use tracing::{warn, Instrument};

use crate::domain::{GovernanceOutcome, Plan, Result, RunContext};
use crate::gateway::{ContextFile, PatchProposal, PatchRequest, PatchService};
use crate::messages;
use crate::ntl::classify;
use crate::obs;
use crate::router::{route, RouteInput};
use crate::tracker::{IssueTracker, PullRequestDraft};
use crate::workspace::Workspace;

pub use outcome::{Failure, PublishStep, Refusal, RunOutcome, RunReport};
pub use verify::{verify, VerifiedPatch};

/// Lines of failing test output kept in the log.
const TEST_LOG_TAIL_LINES: usize = 40;

/// Classify the triggering comment and route the run into a plan.
///
/// Pure: no network, no git.
pub fn plan_for(ctx: &RunContext) -> Plan {
    route(RouteInput {
        action: classify(&ctx.comment_body),
        issue_title: &ctx.issue_title,
        issue_body: &ctx.issue_body,
        comment_body: &ctx.comment_body,
    })
}

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Stage {
    Planned,
    Authorized,
    ServiceHealthy,
    PatchReceived(PatchProposal),
    ClaimsAccepted(PatchProposal),
    Verified(VerifiedPatch),
    BranchReady(VerifiedPatch),
    Applied(VerifiedPatch),
    Tested(VerifiedPatch),
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Stage::Planned => "planned",
            Stage::Authorized => "authorized",
            Stage::ServiceHealthy => "service_healthy",
            Stage::PatchReceived(_) => "patch_received",
            Stage::ClaimsAccepted(_) => "claims_accepted",
            Stage::Verified(_) => "verified",
            Stage::BranchReady(_) => "branch_ready",
            Stage::Applied(_) => "applied",
            Stage::Tested(_) => "tested",
        }
    }
}

enum Step {
    Advance(Stage),
    Finish(RunOutcome),
}

fn refuse(refusal: Refusal) -> Step {
    Step::Finish(RunOutcome::Refused { refusal })
}

fn fail(failure: Failure) -> Step {
    Step::Finish(RunOutcome::Failed { failure })
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// One governance run over explicit collaborators.
pub struct GovernancePipeline {
    ctx: RunContext,
    tracker: Arc<dyn IssueTracker>,
    patch_service: Arc<dyn PatchService>,
    workspace: Arc<dyn Workspace>,
}

impl GovernancePipeline {
    pub fn new(
        ctx: RunContext,
        tracker: Arc<dyn IssueTracker>,
        patch_service: Arc<dyn PatchService>,
        workspace: Arc<dyn Workspace>,
    ) -> Self {
        Self {
            ctx,
            tracker,
            patch_service,
            workspace,
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Run to completion.
    ///
    /// Refusals and failures are reported on the issue and returned as the
    /// report's outcome. `Err` means a comment could not be posted, so the
    /// run could not report at all.
    pub async fn run(&self) -> Result<RunReport> {
        let span = obs::run_span(
            &self.ctx.run_id.to_string(),
            &self.ctx.repo,
            self.ctx.issue_number,
        );
        self.drive().instrument(span).await
    }

    async fn drive(&self) -> Result<RunReport> {
        let plan = plan_for(&self.ctx);
        let body = messages::plan_comment(&plan, &GovernanceOutcome::default());
        self.tracker
            .post_comment(self.ctx.issue_number, &body)
            .await?;
        obs::emit_plan_posted(plan.action.as_str(), plan.intent.as_str(), plan.risk.as_str());

        let mut stages = vec![Stage::Planned.name().to_string()];
        if !plan.action.is_mutating() {
            return Ok(RunReport {
                outcome: RunOutcome::PlanOnly {
                    action: plan.action,
                },
                plan,
                stages,
            });
        }

        let mut stage = Stage::Planned;
        let outcome = loop {
            let step = match stage {
                Stage::Planned => self.authorize().await,
                Stage::Authorized => self.probe_service().await,
                Stage::ServiceHealthy => self.request_patch(&plan).await,
                Stage::PatchReceived(proposal) => self.check_claims(proposal),
                Stage::ClaimsAccepted(proposal) => self.verify_mechanically(proposal),
                Stage::Verified(patch) => self.prepare_branch(patch).await,
                Stage::BranchReady(patch) => self.apply(patch).await,
                Stage::Applied(patch) => self.test(patch).await,
                Stage::Tested(patch) => self.publish(&plan, patch).await,
            };
            match step {
                Step::Advance(next) => {
                    stages.push(next.name().to_string());
                    stage = next;
                }
                Step::Finish(outcome) => break outcome,
            }
        };

        self.report(&outcome).await?;
        Ok(RunReport {
            plan,
            outcome,
            stages,
        })
    }

    /// Post the terminal comment for an outcome.
    async fn report(&self, outcome: &RunOutcome) -> Result<()> {
        let body = match outcome {
            RunOutcome::PlanOnly { .. } => return Ok(()),
            RunOutcome::Refused { refusal } => {
                obs::emit_refusal(refusal.code(), refusal);
                messages::refusal_comment(refusal)
            }
            RunOutcome::Failed { failure } => {
                obs::emit_failure(failure.code(), failure);
                messages::failure_comment(failure)
            }
            RunOutcome::Opened { pull_request } => {
                obs::emit_pull_request_opened(&pull_request.html_url, pull_request.number);
                messages::result_comment(pull_request)
            }
        };
        self.tracker
            .post_comment(self.ctx.issue_number, &body)
            .await?;
        Ok(())
    }

    // -- gates --------------------------------------------------------------

    async fn authorize(&self) -> Step {
        let actor = self.ctx.actor.clone();
        if actor.trim().is_empty() {
            return refuse(Refusal::PermissionLookupFailed {
                actor,
                reason: "no triggering actor".to_string(),
            });
        }
        match self.tracker.user_permission(&actor).await {
            Ok(permission) if permission.can_implement() => {
                obs::emit_gate_passed("permission");
                Step::Advance(Stage::Authorized)
            }
            Ok(permission) => refuse(Refusal::InsufficientPermission { actor, permission }),
            Err(e) => refuse(Refusal::PermissionLookupFailed {
                actor,
                reason: e.to_string(),
            }),
        }
    }

    async fn probe_service(&self) -> Step {
        match self.patch_service.health_check().await {
            Ok(()) => {
                obs::emit_gate_passed("service_health");
                Step::Advance(Stage::ServiceHealthy)
            }
            Err(e) => refuse(Refusal::ServiceUnhealthy {
                reason: e.to_string(),
            }),
        }
    }

    async fn request_patch(&self, plan: &Plan) -> Step {
        let mut context_files = Vec::with_capacity(plan.files_likely.len());
        for path in &plan.files_likely {
            context_files.push(ContextFile {
                path: path.clone(),
                content: self.workspace.read_context_file(path).await,
            });
        }
        let request = PatchRequest::for_run(&self.ctx, plan, context_files);

        match self.patch_service.request_patch(&request).await {
            Ok(proposal) => {
                obs::emit_patch_received(
                    &proposal.digest(),
                    proposal.files_changed.len(),
                    proposal.validation.estimated_diff_lines,
                );
                Step::Advance(Stage::PatchReceived(proposal))
            }
            Err(e) => refuse(Refusal::PatchRequestFailed {
                reason: e.to_string(),
            }),
        }
    }

    /// Gate on the service's own claims about its patch.
    fn check_claims(&self, proposal: PatchProposal) -> Step {
        let validation = &proposal.validation;
        if !validation.tests_included {
            return refuse(Refusal::TestsNotIncluded);
        }
        if validation.forbidden_paths_touched {
            return refuse(Refusal::ForbiddenPathsReported);
        }
        let max = self.ctx.limits.max_diff_lines;
        if validation.estimated_diff_lines > max {
            obs::emit_diff_budget_exceeded(validation.estimated_diff_lines, max);
        }
        obs::emit_gate_passed("service_validation");
        Step::Advance(Stage::ClaimsAccepted(proposal))
    }

    fn verify_mechanically(&self, proposal: PatchProposal) -> Step {
        match verify(proposal, &self.ctx.protected_prefixes) {
            Ok(patch) => {
                obs::emit_gate_passed("protected_paths");
                Step::Advance(Stage::Verified(patch))
            }
            Err(paths) => refuse(Refusal::ProtectedPathsTouched { paths }),
        }
    }

    // -- execution ----------------------------------------------------------

    async fn prepare_branch(&self, patch: VerifiedPatch) -> Step {
        let branch = self.ctx.branch_name();
        if let Err(e) = self.workspace.create_branch(&branch).await {
            return fail(Failure::BranchSetup {
                reason: e.to_string(),
            });
        }
        obs::emit_branch_created(&branch);
        if let Err(e) = self.workspace.configure_push_remote(&self.ctx.repo).await {
            return fail(Failure::BranchSetup {
                reason: e.to_string(),
            });
        }
        Step::Advance(Stage::BranchReady(patch))
    }

    async fn apply(&self, patch: VerifiedPatch) -> Step {
        match self.workspace.apply_patch(patch.patch()).await {
            Ok(()) => Step::Advance(Stage::Applied(patch)),
            Err(e) => fail(Failure::PatchApply {
                reason: e.to_string(),
            }),
        }
    }

    async fn test(&self, patch: VerifiedPatch) -> Step {
        match self.workspace.run_tests().await {
            Ok(output) if output.passed() => Step::Advance(Stage::Tested(patch)),
            Ok(output) => {
                warn!(
                    command = %output.command,
                    exit_code = output.exit_code,
                    duration_ms = output.duration_ms,
                    tail = %output.tail(TEST_LOG_TAIL_LINES),
                    "test command failed"
                );
                fail(Failure::TestsFailed { reason: None })
            }
            Err(e) => fail(Failure::TestsFailed {
                reason: Some(e.to_string()),
            }),
        }
    }

    async fn publish(&self, plan: &Plan, patch: VerifiedPatch) -> Step {
        let n = self.ctx.issue_number;
        let branch = self.ctx.branch_name();

        if let Err(e) = self
            .workspace
            .commit_all(&messages::commit_message(plan, n))
            .await
        {
            return fail(Failure::Publish {
                step: PublishStep::Commit,
                reason: e.to_string(),
            });
        }
        if let Err(e) = self.workspace.push_branch(&branch).await {
            return fail(Failure::Publish {
                step: PublishStep::Push,
                reason: e.to_string(),
            });
        }

        let draft = PullRequestDraft {
            title: messages::pull_request_title(plan, n),
            body: messages::pull_request_body(plan, patch.proposal()),
            head: branch,
            base: self.ctx.base_branch.clone(),
        };
        match self.tracker.create_pull_request(&draft).await {
            Ok(pull_request) => Step::Finish(RunOutcome::Opened { pull_request }),
            Err(e) => fail(Failure::Publish {
                step: PublishStep::PullRequest,
                reason: e.to_string(),
            }),
        }
    }
}
