//! Structured observability hooks for the governance pipeline.
//!
//! This module provides:
//! - Run-scoped tracing spans: [`run_span`] for async code (via
//!   `tracing::Instrument`) and the `RunSpan` RAII guard for sync code
//! - Emission functions for pipeline milestones: plan, gates, refusal,
//!   failure, branch, pull request
//!
//! Every event carries an `event = "..."` field so log pipelines can filter on
//! it. Secrets and patch contents are never emitted; patches are identified
//! by digest.

use tracing::{info, warn};

/// The `pigpen.run` span every event of a run is recorded under.
pub fn run_span(run_id: &str, repo: &str, issue_number: u64) -> tracing::Span {
    tracing::info_span!(
        "pigpen.run",
        run_id = %run_id,
        repo = %repo,
        issue = issue_number,
    )
}

/// RAII guard that enters a run-scoped tracing span for the duration of a run.
///
/// ```ignore
/// let _span = RunSpan::enter("0b0f…", "acme/api", 42);
/// // every event below is tagged with run_id, repo and issue
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    pub fn enter(run_id: &str, repo: &str, issue_number: u64) -> Self {
        Self {
            _span: run_span(run_id, repo, issue_number).entered(),
        }
    }
}

pub fn emit_plan_posted(action: &str, intent: &str, risk: &str) {
    info!(event = "plan.posted", action = %action, intent = %intent, risk = %risk);
}

pub fn emit_gate_passed(gate: &str) {
    info!(event = "gate.passed", gate = %gate);
}

pub fn emit_patch_received(digest: &str, files_changed: usize, estimated_diff_lines: u32) {
    info!(
        event = "patch.received",
        digest = %digest,
        files_changed = files_changed,
        estimated_diff_lines = estimated_diff_lines,
    );
}

/// The service's estimate exceeds the requested bound. Logged, not enforced.
pub fn emit_diff_budget_exceeded(estimated: u32, max: u32) {
    warn!(
        event = "patch.diff_budget_exceeded",
        estimated_diff_lines = estimated,
        max_diff_lines = max,
    );
}

pub fn emit_refusal(code: &str, reason: &dyn std::fmt::Display) {
    warn!(event = "run.refused", code = %code, reason = %reason);
}

pub fn emit_failure(code: &str, reason: &dyn std::fmt::Display) {
    warn!(event = "run.failed", code = %code, reason = %reason);
}

pub fn emit_branch_created(branch: &str) {
    info!(event = "branch.created", branch = %branch);
}

pub fn emit_pull_request_opened(url: &str, number: u64) {
    info!(event = "pr.opened", url = %url, number = number);
}
