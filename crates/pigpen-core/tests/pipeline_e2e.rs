//! End-to-end governance runs over the in-memory collaborators.

use std::sync::Arc;

use pigpen_core::domain::{Action, Risk, RunContext};
use pigpen_core::fakes::{Call, CallLog, FakePatchService, FakeTracker, FakeWorkspace};
use pigpen_core::gateway::{PatchResponse, PatchValidation};
use pigpen_core::pipeline::{
    Failure, GovernancePipeline, PublishStep, Refusal, RunOutcome, RunReport,
};
use pigpen_core::tracker::{Permission, PullRequest};

fn context(comment: &str) -> RunContext {
    RunContext::new("acme/api", 42)
        .unwrap()
        .with_issue("Add rate limit to login", "The login endpoint is hammered.")
        .with_comment(comment)
        .with_actor("octo")
}

struct Harness {
    log: CallLog,
    tracker: FakeTracker,
    service: FakePatchService,
    workspace: FakeWorkspace,
}

impl Harness {
    fn new() -> Self {
        let log = CallLog::new();
        Self {
            tracker: FakeTracker::new(log.clone()),
            service: FakePatchService::new(log.clone()),
            workspace: FakeWorkspace::new(log.clone()),
            log,
        }
    }

    async fn run(self, ctx: RunContext) -> (RunReport, CallLog) {
        let pipeline = GovernancePipeline::new(
            ctx,
            Arc::new(self.tracker),
            Arc::new(self.service),
            Arc::new(self.workspace),
        );
        let report = pipeline.run().await.unwrap();
        (report, self.log)
    }
}

fn refusal(report: &RunReport) -> &Refusal {
    match &report.outcome {
        RunOutcome::Refused { refusal } => refusal,
        other => panic!("expected refusal, got {other:?}"),
    }
}

fn failure(report: &RunReport) -> &Failure {
    match &report.outcome {
        RunOutcome::Failed { failure } => failure,
        other => panic!("expected failure, got {other:?}"),
    }
}

/// No branch, apply, test, commit, push or PR happened.
fn assert_untouched(log: &CallLog) {
    assert!(
        !log.any_mutation(),
        "refused run must not mutate anything: {:?}",
        log.names()
    );
}

fn last_comment(log: &CallLog) -> String {
    log.comments().pop().unwrap()
}

// -------------------------------------------------------------------------
// Plan-only runs
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_plan_request_posts_plan_only() {
    let (report, log) = Harness::new().run(context("can you plan this?")).await;

    assert_eq!(
        report.outcome,
        RunOutcome::PlanOnly {
            action: Action::Plan
        }
    );
    assert_eq!(log.names(), vec!["post_comment"]);
    assert!(log.comments()[0].contains("Action: PLAN"));
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn test_unknown_and_fix_ci_post_plan_only() {
    for (comment, action) in [("thanks!", Action::Unknown), ("fix ci please", Action::FixCi)] {
        let (report, log) = Harness::new().run(context(comment)).await;
        assert_eq!(report.outcome, RunOutcome::PlanOnly { action });
        assert_eq!(log.names(), vec!["post_comment"]);
    }
}

// -------------------------------------------------------------------------
// Gates
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_read_permission_refused_before_any_service_call() {
    let mut h = Harness::new();
    h.tracker = h.tracker.with_permission(Permission::Read);
    let (report, log) = h.run(context("implement")).await;

    assert_eq!(refusal(&report).code(), "TAID-PPOS-REFUSAL-0005");
    assert_eq!(
        log.names(),
        vec!["post_comment", "user_permission", "post_comment"]
    );
    assert!(last_comment(&log).contains("@octo permission is 'read'"));
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn test_maintain_and_admin_pass_permission_gate() {
    for permission in [Permission::Maintain, Permission::Admin] {
        let mut h = Harness::new();
        h.tracker = h.tracker.with_permission(permission);
        let (report, _) = h.run(context("implement")).await;
        assert!(matches!(report.outcome, RunOutcome::Opened { .. }));
    }
}

#[tokio::test]
async fn test_permission_lookup_error_refuses() {
    let mut h = Harness::new();
    h.tracker = h.tracker.with_permission_error(404, "Not Found");
    let (report, log) = h.run(context("implement")).await;

    assert_eq!(refusal(&report).code(), "TAID-PPOS-REFUSAL-0006");
    assert!(last_comment(&log).contains("Reason: GitHub API error 404: Not Found"));
    assert!(!log.contains("health_check"));
    assert_untouched(&log);
}

#[tokio::test]
async fn test_unconfigured_service_refused_at_health() {
    let mut h = Harness::new();
    h.service = h.service.unconfigured();
    let (report, log) = h.run(context("implement")).await;

    assert_eq!(refusal(&report).code(), "TAID-PPOS-REFUSAL-0007");
    assert!(last_comment(&log)
        .contains("Patch service not configured: PIGPEN_LLM_ENDPOINT / PIGPEN_API_KEY missing."));
    assert!(!log.contains("request_patch"));
    assert_untouched(&log);
}

#[tokio::test]
async fn test_unhealthy_service_refused() {
    let mut h = Harness::new();
    h.service = h
        .service
        .unhealthy("Patch service unhealthy: {\"status\":\"degraded\"}");
    let (report, log) = h.run(context("implement")).await;

    assert_eq!(refusal(&report).code(), "TAID-PPOS-REFUSAL-0007");
    assert_untouched(&log);
}

#[tokio::test]
async fn test_service_refusal_and_errors_refuse_request() {
    let cases = [
        PatchResponse::Refused {
            reason: "touches billing".into(),
            risk: Risk::High,
        },
        PatchResponse::Error {
            reason: "model timeout".into(),
        },
    ];
    for response in cases {
        let mut h = Harness::new();
        h.service = h.service.with_response(response);
        let (report, log) = h.run(context("implement")).await;
        assert_eq!(refusal(&report).code(), "TAID-PPOS-REFUSAL-0008");
        assert_untouched(&log);
    }

    let mut h = Harness::new();
    h.service = h.service.with_http_error(502, "bad gateway");
    let (report, log) = h.run(context("implement")).await;
    assert_eq!(refusal(&report).code(), "TAID-PPOS-REFUSAL-0008");
    assert!(last_comment(&log).contains("Reason: Patch service error 502: bad gateway"));
}

#[tokio::test]
async fn test_missing_tests_refused() {
    let mut proposal = FakePatchService::clean_proposal();
    proposal.validation.tests_included = false;
    let mut h = Harness::new();
    h.service = h.service.with_proposal(proposal);
    let (report, log) = h.run(context("implement")).await;

    assert_eq!(refusal(&report), &Refusal::TestsNotIncluded);
    assert!(last_comment(&log).contains("TAID-PPOS-REFUSAL-0009"));
    assert_untouched(&log);
}

#[tokio::test]
async fn test_service_reported_forbidden_paths_refused() {
    let mut proposal = FakePatchService::clean_proposal();
    proposal.validation.forbidden_paths_touched = true;
    let mut h = Harness::new();
    h.service = h.service.with_proposal(proposal);
    let (report, log) = h.run(context("implement")).await;

    assert_eq!(refusal(&report), &Refusal::ForbiddenPathsReported);
    assert_untouched(&log);
}

#[tokio::test]
async fn test_mechanical_scan_overrides_service_claim() {
    let mut proposal = FakePatchService::clean_proposal();
    proposal.patch.push_str(
        "diff --git a/.github/workflows/ci.yml b/.github/workflows/ci.yml\n\
         --- a/.github/workflows/ci.yml\n\
         +++ b/.github/workflows/ci.yml\n\
         @@ -1 +1 @@\n\
         -on: push\n\
         +on: [push, pull_request]\n",
    );
    proposal.validation = PatchValidation {
        tests_included: true,
        forbidden_paths_touched: false,
        estimated_diff_lines: 4,
    };
    let mut h = Harness::new();
    h.service = h.service.with_proposal(proposal);
    let (report, log) = h.run(context("implement")).await;

    assert_eq!(
        refusal(&report),
        &Refusal::ProtectedPathsTouched {
            paths: vec![".github/workflows/ci.yml".into()]
        }
    );
    let governance = report.governance();
    assert!(governance.two_key_required());
    assert_eq!(
        governance.protected_paths_touched,
        vec![".github/workflows/ci.yml"]
    );

    let comment = last_comment(&log);
    assert!(comment.contains("- .github/workflows/ci.yml"));
    assert!(comment.contains("Two-Key Required: YES"));
    assert!(comment.contains("TAID-PPOS-REFUSAL-0011"));
    assert_untouched(&log);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn test_custom_protected_prefixes_apply() {
    let ctx = context("implement").with_protected_prefixes(
        pigpen_core::protected::ProtectedPrefixSet::new(["src/"]),
    );
    let (report, log) = Harness::new().run(ctx).await;

    assert_eq!(refusal(&report).code(), "TAID-PPOS-REFUSAL-0011");
    assert_untouched(&log);
}

// -------------------------------------------------------------------------
// Patch request contents
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_patch_request_carries_context_and_constraints() {
    let mut h = Harness::new();
    h.workspace = h
        .workspace
        .with_file("src/index.ts", "import express from 'express';\n");
    let (_, log) = h.run(context("implement")).await;

    let request = log.patch_request().unwrap();
    assert_eq!(request.meta.repo, "acme/api");
    assert_eq!(request.meta.issue_number, 42);
    assert_eq!(request.meta.base_branch, "main");
    assert_eq!(request.constraints.max_files, 10);
    assert_eq!(request.constraints.max_diff_lines, 400);
    assert!(request.constraints.must_include_tests);
    assert!(request
        .constraints
        .forbidden_paths
        .contains(&"01_CANON/".to_string()));

    let paths: Vec<&str> = request
        .context_files
        .iter()
        .map(|f| f.path.as_str())
        .collect();
    assert_eq!(
        paths,
        vec!["src/rateLimiter.ts", "src/index.ts", "test/rateLimiter.test.ts"]
    );
    assert_eq!(request.context_files[0].content, "");
    assert_eq!(
        request.context_files[1].content,
        "import express from 'express';\n"
    );
}

// -------------------------------------------------------------------------
// Execution
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_success_opens_pull_request() {
    let mut h = Harness::new();
    h.tracker = h.tracker.with_pull_request(PullRequest {
        html_url: "https://github.com/acme/api/pull/77".into(),
        number: 77,
    });
    let (report, log) = h.run(context("please open a PR")).await;

    assert_eq!(
        log.names(),
        vec![
            "post_comment",
            "user_permission",
            "health_check",
            "read_context_file",
            "read_context_file",
            "read_context_file",
            "request_patch",
            "create_branch",
            "configure_push_remote",
            "apply_patch",
            "run_tests",
            "commit_all",
            "push_branch",
            "create_pull_request",
            "post_comment",
        ]
    );
    assert_eq!(
        report.stages,
        vec![
            "planned",
            "authorized",
            "service_healthy",
            "patch_received",
            "claims_accepted",
            "verified",
            "branch_ready",
            "applied",
            "tested",
        ]
    );

    let calls = log.calls();
    assert!(calls.contains(&Call::CreateBranch {
        branch: "pigpen/issue-42".into()
    }));
    assert!(calls.contains(&Call::CommitAll {
        message: "PigPenOS: add_rate_limiter (issue #42)".into()
    }));
    let draft = calls
        .iter()
        .find_map(|c| match c {
            Call::CreatePullRequest(d) => Some(d.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(draft.title, "PigPenOS: add_rate_limiter (fixes #42)");
    assert_eq!(draft.head, "pigpen/issue-42");
    assert_eq!(draft.base, "main");
    assert!(draft.body.contains("Risk: low"));

    assert_eq!(
        last_comment(&log),
        "PigPenOS Result\n\nPR created: https://github.com/acme/api/pull/77\n\n\
         TAID: TAID-PPOS-RESULT-0002\nVersion: v0.5.0"
    );
    assert!(!report.governance().two_key_required());
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn test_applied_patch_is_the_verified_text() {
    let (_, log) = Harness::new().run(context("implement")).await;
    let applied = log
        .calls()
        .into_iter()
        .find_map(|c| match c {
            Call::ApplyPatch { patch } => Some(patch),
            _ => None,
        })
        .unwrap();
    assert_eq!(applied, FakePatchService::clean_proposal().patch);
}

#[tokio::test]
async fn test_branch_setup_failure() {
    let mut h = Harness::new();
    h.workspace = h.workspace.failing("create_branch");
    let (report, log) = h.run(context("implement")).await;

    assert!(matches!(failure(&report), Failure::BranchSetup { .. }));
    assert!(!log.contains("apply_patch"));
    assert!(last_comment(&log).contains("TAID-PPOS-FAIL-0002"));
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn test_apply_failure_stops_before_tests() {
    let mut h = Harness::new();
    h.workspace = h.workspace.failing("apply_patch");
    let (report, log) = h.run(context("implement")).await;

    assert_eq!(failure(&report).code(), "TAID-PPOS-FAIL-0003");
    assert!(!log.contains("run_tests"));
    assert!(last_comment(&log).starts_with("PigPenOS Failure\n\nPatch apply failed.\nReason: "));
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn test_failing_tests_stop_before_commit() {
    let mut h = Harness::new();
    h.workspace = h.workspace.with_failing_tests();
    let (report, log) = h.run(context("implement")).await;

    assert_eq!(failure(&report), &Failure::TestsFailed { reason: None });
    assert!(!log.contains("commit_all"));
    assert!(!log.contains("push_branch"));
    assert!(!log.contains("create_pull_request"));
    assert_eq!(
        last_comment(&log),
        "PigPenOS Failure\n\nTests failed; PR not created.\n\n\
         TAID: TAID-PPOS-FAIL-0004\nVersion: v0.5.0"
    );
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn test_push_failure_is_publish_failure() {
    let mut h = Harness::new();
    h.workspace = h.workspace.failing("push_branch");
    let (report, log) = h.run(context("implement")).await;

    assert!(matches!(
        failure(&report),
        Failure::Publish {
            step: PublishStep::Push,
            ..
        }
    ));
    assert!(!log.contains("create_pull_request"));
    assert!(last_comment(&log).contains("TAID-PPOS-FAIL-0005"));
}

#[tokio::test]
async fn test_pull_request_failure_is_reported() {
    let mut h = Harness::new();
    h.tracker = h
        .tracker
        .with_pull_request_error(422, "A pull request already exists");
    let (report, log) = h.run(context("implement")).await;

    assert!(matches!(
        failure(&report),
        Failure::Publish {
            step: PublishStep::PullRequest,
            ..
        }
    ));
    assert!(last_comment(&log).contains("A pull request already exists"));
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn test_comment_failure_propagates() {
    let log = CallLog::new();
    let pipeline = GovernancePipeline::new(
        context("implement"),
        Arc::new(FakeTracker::new(log.clone()).failing_comments()),
        Arc::new(FakePatchService::new(log.clone())),
        Arc::new(FakeWorkspace::new(log.clone())),
    );
    let err = pipeline.run().await.unwrap_err();
    assert!(err.to_string().contains("403"));
    assert_eq!(log.names(), vec!["post_comment"]);
}

#[tokio::test]
async fn test_custom_base_branch_reaches_pull_request() {
    let ctx = context("implement").with_base_branch("develop");
    let (_, log) = Harness::new().run(ctx).await;
    let base = log.calls().into_iter().find_map(|c| match c {
        Call::CreatePullRequest(d) => Some(d.base),
        _ => None,
    });
    assert_eq!(base.as_deref(), Some("develop"));
}
