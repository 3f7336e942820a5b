//! Deterministic text for every comment, commit and pull request a run writes.
//!
//! Same inputs, same bytes. Each human-facing message ends with the code it
//! is searchable by and the pipeline version.

use crate::domain::{GovernanceOutcome, Plan, PIGPEN_VERSION};
use crate::gateway::PatchProposal;
use crate::pipeline::{Failure, Refusal};
use crate::tracker::PullRequest;

pub const RESULT_TAID: &str = "TAID-PPOS-RESULT-0002";
pub const PR_TAID: &str = "TAID-PPOS-PR-0006";
pub const PR_TAI_D: &str = "TAI-D-PPOS-0006";

/// `- a\n- b`. An empty list still renders a lone bullet.
fn bullets<S: AsRef<str>>(items: &[S]) -> String {
    let joined: Vec<&str> = items.iter().map(AsRef::as_ref).collect();
    format!("- {}", joined.join("\n- "))
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "YES"
    } else {
        "NO"
    }
}

fn footer(code: &str) -> String {
    format!("TAID: {code}\nVersion: {PIGPEN_VERSION}")
}

/// The plan comment, wrapped in a ```text fence.
pub fn plan_comment(plan: &Plan, governance: &GovernanceOutcome) -> String {
    let text = format!(
        "PigPenOS Plan (NTL)\n\
         TID: {tid}\n\
         TAID: {taid}\n\
         Version: {version}\n\
         \n\
         Action: {action}\n\
         Intent: {intent}\n\
         Domain: {domain}\n\
         Risk: {risk}\n\
         Two-Key Required: {two_key}\n\
         \n\
         Files likely:\n{files}\n\
         \n\
         Steps:\n{steps}\n\
         \n\
         Tests:\n{tests}\n\
         \n\
         Rollback:\n- {rollback}\n\
         \n\
         NTL Next:\n\
         - Reply in plain English with 'implement' / 'open a PR' to execute.\n\
         - Or reply with 'plan' / 'breakdown' to refine scope.\n",
        tid = plan.ids.tid,
        taid = plan.ids.taid,
        version = plan.ids.version,
        action = plan.action,
        intent = plan.intent,
        domain = plan.domain,
        risk = plan.risk,
        two_key = yes_no(governance.two_key_required()),
        files = bullets(&plan.files_likely),
        steps = bullets(&plan.steps),
        tests = bullets(&plan.tests),
        rollback = plan.rollback,
    );
    format!("```text\n{text}\n```")
}

pub fn refusal_comment(refusal: &Refusal) -> String {
    let detail = match refusal {
        Refusal::PermissionLookupFailed { reason, .. }
        | Refusal::ServiceUnhealthy { reason }
        | Refusal::PatchRequestFailed { reason } => format!("{refusal}\nReason: {reason}"),
        Refusal::ProtectedPathsTouched { paths } => format!(
            "{refusal}\n\nProtected paths touched:\n{}\n\nTwo-Key Required: YES",
            bullets(paths)
        ),
        _ => refusal.to_string(),
    };
    format!(
        "PigPenOS Refusal\n\nIMPLEMENT refused: {detail}\n\n{}",
        footer(refusal.code())
    )
}

pub fn failure_comment(failure: &Failure) -> String {
    let detail = match failure {
        Failure::BranchSetup { reason }
        | Failure::PatchApply { reason }
        | Failure::Publish { reason, .. } => format!("{failure}\nReason: {reason}"),
        Failure::TestsFailed {
            reason: Some(reason),
        } => format!("{failure}\nReason: {reason}"),
        Failure::TestsFailed { reason: None } => failure.to_string(),
    };
    format!("PigPenOS Failure\n\n{detail}\n\n{}", footer(failure.code()))
}

pub fn result_comment(pull_request: &PullRequest) -> String {
    format!(
        "PigPenOS Result\n\nPR created: {}\n\n{}",
        pull_request.html_url,
        footer(RESULT_TAID)
    )
}

pub fn commit_message(plan: &Plan, issue_number: u64) -> String {
    format!("PigPenOS: {} (issue #{issue_number})", plan.intent)
}

pub fn pull_request_title(plan: &Plan, issue_number: u64) -> String {
    format!("PigPenOS: {} (fixes #{issue_number})", plan.intent)
}

/// Risk comes from the service's proposal; tests and rollback from the plan.
pub fn pull_request_body(plan: &Plan, proposal: &PatchProposal) -> String {
    format!(
        "TID: {tid}\n\
         TAID: {PR_TAID}\n\
         TAI-D: {PR_TAI_D}\n\
         Version: {PIGPEN_VERSION}\n\
         Risk: {risk}\n\
         \n\
         Summary:\n{summary}\n\
         \n\
         Files Changed:\n{files}\n\
         \n\
         Tests:\n{tests}\n\
         \n\
         Rollback:\n- {rollback}\n",
        tid = plan.ids.tid,
        risk = proposal.risk,
        summary = proposal.summary,
        files = bullets(&proposal.files_changed),
        tests = bullets(&plan.tests),
        rollback = plan.rollback,
    )
}
