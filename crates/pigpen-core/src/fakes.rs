//! In-memory fakes for the collaborator traits (testing only)
//!
//! Provides `FakeTracker`, `FakePatchService` and `FakeWorkspace`. All three
//! append to one shared [`CallLog`], so a test can assert ordering across
//! collaborators, e.g. that no branch was created before a refusal.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::Risk;
use crate::gateway::{
    GatewayError, GatewayResult, PatchProposal, PatchRequest, PatchResponse, PatchService,
    PatchValidation,
};
use crate::tracker::{
    IssueTracker, Permission, PullRequest, PullRequestDraft, TrackerError, TrackerResult,
};
use crate::workspace::{CommandOutput, Workspace, WorkspaceError, WorkspaceResult};

// ---------------------------------------------------------------------------
// CallLog
// ---------------------------------------------------------------------------

/// One recorded collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    PostComment { issue_number: u64, body: String },
    UserPermission { username: String },
    CreatePullRequest(PullRequestDraft),
    HealthCheck,
    RequestPatch(Box<PatchRequest>),
    ReadContextFile { path: String },
    CreateBranch { branch: String },
    ConfigurePushRemote { repo: String },
    ApplyPatch { patch: String },
    RunTests,
    CommitAll { message: String },
    PushBranch { branch: String },
}

impl Call {
    /// Short operation name, matching the trait method.
    pub fn name(&self) -> &'static str {
        match self {
            Call::PostComment { .. } => "post_comment",
            Call::UserPermission { .. } => "user_permission",
            Call::CreatePullRequest(_) => "create_pull_request",
            Call::HealthCheck => "health_check",
            Call::RequestPatch(_) => "request_patch",
            Call::ReadContextFile { .. } => "read_context_file",
            Call::CreateBranch { .. } => "create_branch",
            Call::ConfigurePushRemote { .. } => "configure_push_remote",
            Call::ApplyPatch { .. } => "apply_patch",
            Call::RunTests => "run_tests",
            Call::CommitAll { .. } => "commit_all",
            Call::PushBranch { .. } => "push_branch",
        }
    }

    /// Whether this call changes the working tree, the remote or the tracker's
    /// pull requests.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::CreateBranch { .. }
                | Call::ConfigurePushRemote { .. }
                | Call::ApplyPatch { .. }
                | Call::RunTests
                | Call::CommitAll { .. }
                | Call::PushBranch { .. }
                | Call::CreatePullRequest(_)
        )
    }
}

/// Ordered, shared record of collaborator calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Call>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, call: Call) {
        self.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().clone()
    }

    /// Operation names in call order.
    pub fn names(&self) -> Vec<&'static str> {
        self.lock().iter().map(Call::name).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().iter().any(|c| c.name() == name)
    }

    /// Bodies of every posted comment, in order.
    pub fn comments(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|c| match c {
                Call::PostComment { body, .. } => Some(body.clone()),
                _ => None,
            })
            .collect()
    }

    /// The patch request sent, if any.
    pub fn patch_request(&self) -> Option<PatchRequest> {
        self.lock().iter().find_map(|c| match c {
            Call::RequestPatch(req) => Some(req.as_ref().clone()),
            _ => None,
        })
    }

    pub fn any_mutation(&self) -> bool {
        self.lock().iter().any(Call::is_mutation)
    }
}

// ---------------------------------------------------------------------------
// FakeTracker
// ---------------------------------------------------------------------------

/// Tracker returning a scripted permission and pull request.
#[derive(Debug)]
pub struct FakeTracker {
    log: CallLog,
    permission: Result<Permission, (u16, String)>,
    pull_request: Result<PullRequest, (u16, String)>,
    fail_comments: bool,
}

impl FakeTracker {
    /// Grants `write`; opens pull request #1.
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            permission: Ok(Permission::Write),
            pull_request: Ok(PullRequest {
                html_url: "https://github.com/acme/api/pull/1".to_string(),
                number: 1,
            }),
            fail_comments: false,
        }
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = Ok(permission);
        self
    }

    /// Permission lookup fails with an HTTP error.
    pub fn with_permission_error(mut self, status: u16, body: impl Into<String>) -> Self {
        self.permission = Err((status, body.into()));
        self
    }

    pub fn with_pull_request(mut self, pull_request: PullRequest) -> Self {
        self.pull_request = Ok(pull_request);
        self
    }

    pub fn with_pull_request_error(mut self, status: u16, body: impl Into<String>) -> Self {
        self.pull_request = Err((status, body.into()));
        self
    }

    /// Every `post_comment` fails (the call is still recorded).
    pub fn failing_comments(mut self) -> Self {
        self.fail_comments = true;
        self
    }
}

fn http_error((status, body): &(u16, String)) -> TrackerError {
    TrackerError::Http {
        status: *status,
        body: body.clone(),
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn post_comment(&self, issue_number: u64, body: &str) -> TrackerResult<()> {
        self.log.record(Call::PostComment {
            issue_number,
            body: body.to_string(),
        });
        if self.fail_comments {
            return Err(TrackerError::Http {
                status: 403,
                body: "Resource not accessible by integration".to_string(),
            });
        }
        Ok(())
    }

    async fn user_permission(&self, username: &str) -> TrackerResult<Permission> {
        self.log.record(Call::UserPermission {
            username: username.to_string(),
        });
        self.permission.clone().map_err(|e| http_error(&e))
    }

    async fn create_pull_request(&self, draft: &PullRequestDraft) -> TrackerResult<PullRequest> {
        self.log.record(Call::CreatePullRequest(draft.clone()));
        self.pull_request.clone().map_err(|e| http_error(&e))
    }
}

// ---------------------------------------------------------------------------
// FakePatchService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Scripted {
    Response(PatchResponse),
    HttpError { status: u16, body: String },
}

/// Patch service answering with a scripted health result and response.
#[derive(Debug)]
pub struct FakePatchService {
    log: CallLog,
    health: Result<(), String>,
    unconfigured: bool,
    response: Scripted,
}

impl FakePatchService {
    /// Healthy; answers `ok` with [`FakePatchService::clean_proposal`].
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            health: Ok(()),
            unconfigured: false,
            response: Scripted::Response(PatchResponse::Ok(Self::clean_proposal())),
        }
    }

    /// A small, tested patch touching only `src/` and `test/`.
    pub fn clean_proposal() -> PatchProposal {
        PatchProposal {
            summary: "Add a token-bucket rate limiter".to_string(),
            risk: Risk::Low,
            files_changed: vec![
                "src/rateLimiter.ts".to_string(),
                "test/rateLimiter.test.ts".to_string(),
            ],
            patch: "diff --git a/src/rateLimiter.ts b/src/rateLimiter.ts\n\
                    new file mode 100644\n\
                    --- /dev/null\n\
                    +++ b/src/rateLimiter.ts\n\
                    @@ -0,0 +1 @@\n\
                    +export const limit = 10;\n\
                    diff --git a/test/rateLimiter.test.ts b/test/rateLimiter.test.ts\n\
                    new file mode 100644\n\
                    --- /dev/null\n\
                    +++ b/test/rateLimiter.test.ts\n\
                    @@ -0,0 +1 @@\n\
                    +import { limit } from '../src/rateLimiter';\n"
                .to_string(),
            validation: PatchValidation {
                tests_included: true,
                forbidden_paths_touched: false,
                estimated_diff_lines: 2,
            },
        }
    }

    /// Health probe fails with `reason`.
    pub fn unhealthy(mut self, reason: impl Into<String>) -> Self {
        self.health = Err(reason.into());
        self
    }

    /// Behave like a service with no endpoint or key configured.
    pub fn unconfigured(mut self) -> Self {
        self.unconfigured = true;
        self
    }

    pub fn with_response(mut self, response: PatchResponse) -> Self {
        self.response = Scripted::Response(response);
        self
    }

    pub fn with_proposal(self, proposal: PatchProposal) -> Self {
        self.with_response(PatchResponse::Ok(proposal))
    }

    /// Patch POST answers with a non-2xx status.
    pub fn with_http_error(mut self, status: u16, body: impl Into<String>) -> Self {
        self.response = Scripted::HttpError {
            status,
            body: body.into(),
        };
        self
    }
}

#[async_trait]
impl PatchService for FakePatchService {
    async fn health_check(&self) -> GatewayResult<()> {
        self.log.record(Call::HealthCheck);
        if self.unconfigured {
            return Err(GatewayError::Configuration);
        }
        self.health
            .clone()
            .map_err(GatewayError::ServiceUnavailable)
    }

    async fn request_patch(&self, request: &PatchRequest) -> GatewayResult<PatchProposal> {
        self.log.record(Call::RequestPatch(Box::new(request.clone())));
        if self.unconfigured {
            return Err(GatewayError::Configuration);
        }
        match &self.response {
            Scripted::Response(response) => response.clone().into_proposal(),
            Scripted::HttpError { status, body } => Err(GatewayError::ServiceError {
                status: *status,
                body: body.clone(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// FakeWorkspace
// ---------------------------------------------------------------------------

/// Workspace serving context files from memory and failing on request.
#[derive(Debug)]
pub struct FakeWorkspace {
    log: CallLog,
    files: HashMap<String, String>,
    failing: HashSet<&'static str>,
    tests_pass: bool,
}

impl FakeWorkspace {
    /// Every operation succeeds; tests pass.
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            files: HashMap::new(),
            failing: HashSet::new(),
            tests_pass: true,
        }
    }

    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Make the named operation (`create_branch`, `apply_patch`, ...) fail
    /// with a non-zero exit.
    pub fn failing(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    /// The test command runs but exits non-zero.
    pub fn with_failing_tests(mut self) -> Self {
        self.tests_pass = false;
        self
    }

    fn outcome(&self, operation: &'static str) -> WorkspaceResult<()> {
        if self.failing.contains(operation) {
            return Err(WorkspaceError::CommandFailed {
                command: operation.to_string(),
                exit_code: 1,
                stderr: format!("{operation} rejected by fake"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Workspace for FakeWorkspace {
    async fn read_context_file(&self, path: &str) -> String {
        self.log.record(Call::ReadContextFile {
            path: path.to_string(),
        });
        self.files.get(path).cloned().unwrap_or_default()
    }

    async fn create_branch(&self, branch: &str) -> WorkspaceResult<()> {
        self.log.record(Call::CreateBranch {
            branch: branch.to_string(),
        });
        self.outcome("create_branch")
    }

    async fn configure_push_remote(&self, repo: &str) -> WorkspaceResult<()> {
        self.log.record(Call::ConfigurePushRemote {
            repo: repo.to_string(),
        });
        self.outcome("configure_push_remote")
    }

    async fn apply_patch(&self, patch: &str) -> WorkspaceResult<()> {
        self.log.record(Call::ApplyPatch {
            patch: patch.to_string(),
        });
        self.outcome("apply_patch")
    }

    async fn run_tests(&self) -> WorkspaceResult<CommandOutput> {
        self.log.record(Call::RunTests);
        self.outcome("run_tests")?;
        let exit_code = if self.tests_pass { 0 } else { 1 };
        Ok(CommandOutput {
            command: "npm test".to_string(),
            exit_code,
            stdout: String::new(),
            stderr: if self.tests_pass {
                String::new()
            } else {
                "1 failing".to_string()
            },
            duration_ms: 0,
            success: self.tests_pass,
        })
    }

    async fn commit_all(&self, message: &str) -> WorkspaceResult<()> {
        self.log.record(Call::CommitAll {
            message: message.to_string(),
        });
        self.outcome("commit_all")
    }

    async fn push_branch(&self, branch: &str) -> WorkspaceResult<()> {
        self.log.record(Call::PushBranch {
            branch: branch.to_string(),
        });
        self.outcome("push_branch")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_is_shared_across_fakes() {
        let log = CallLog::new();
        let tracker = FakeTracker::new(log.clone());
        let workspace = FakeWorkspace::new(log.clone());

        tracker.post_comment(1, "hi").await.unwrap();
        workspace.create_branch("pigpen/issue-1").await.unwrap();

        assert_eq!(log.names(), vec!["post_comment", "create_branch"]);
        assert_eq!(log.comments(), vec!["hi"]);
        assert!(log.any_mutation());
    }

    #[tokio::test]
    async fn test_failing_operation() {
        let log = CallLog::new();
        let workspace = FakeWorkspace::new(log.clone()).failing("apply_patch");
        let err = workspace.apply_patch("x").await.unwrap_err();
        assert!(err.to_string().contains("apply_patch"));
        assert!(log.contains("apply_patch"));
    }

    #[tokio::test]
    async fn test_scripted_refusal_becomes_typed_error() {
        let service = FakePatchService::new(CallLog::new()).with_response(PatchResponse::Refused {
            reason: "too broad".into(),
            risk: Risk::High,
        });
        let ctx = crate::domain::RunContext::new("acme/api", 1).unwrap();
        let plan = crate::pipeline::plan_for(&ctx);
        let err = service
            .request_patch(&PatchRequest::for_run(&ctx, &plan, vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Patch refused: too broad (risk=high)");
    }

    #[test]
    fn test_clean_proposal_touches_no_protected_path() {
        let proposal = FakePatchService::clean_proposal();
        let prefixes = crate::protected::ProtectedPrefixSet::default();
        assert!(crate::protected::protected_paths_in(&proposal.patch, &prefixes).is_empty());
    }
}
