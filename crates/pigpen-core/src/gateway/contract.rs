//! Patch contract v1.0: request and response shapes exchanged with the
//! patch-generation service.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::{GatewayError, GatewayResult};
use crate::domain::{Plan, Risk, RunContext, PIGPEN_VERSION};

/// Value of the `X-PigPen-Version` header.
pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchMeta {
    pub tid: String,
    pub taid: String,
    pub version: String,
    pub repo: String,
    pub issue_number: u64,
    pub base_branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchIntent {
    pub issue_title: String,
    pub issue_body: String,
    pub comment_body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchConstraints {
    pub max_files: u32,
    pub max_diff_lines: u32,
    pub must_include_tests: bool,
    pub forbidden_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextFile {
    pub path: String,
    /// File contents, or an empty string when the file could not be read.
    pub content: String,
}

/// Body of `POST {endpoint}/pigpen/patch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRequest {
    pub meta: PatchMeta,
    pub intent: PatchIntent,
    pub constraints: PatchConstraints,
    pub context_files: Vec<ContextFile>,
}

impl PatchRequest {
    /// Build the request for a run. Forbidden paths are the protected prefixes.
    pub fn for_run(ctx: &RunContext, plan: &Plan, context_files: Vec<ContextFile>) -> Self {
        Self {
            meta: PatchMeta {
                tid: plan.ids.tid.clone(),
                taid: plan.ids.taid.clone(),
                version: PIGPEN_VERSION.to_string(),
                repo: ctx.repo.clone(),
                issue_number: ctx.issue_number,
                base_branch: ctx.base_branch.clone(),
            },
            intent: PatchIntent {
                issue_title: ctx.issue_title.clone(),
                issue_body: ctx.issue_body.clone(),
                comment_body: ctx.comment_body.clone(),
            },
            constraints: PatchConstraints {
                max_files: ctx.limits.max_files,
                max_diff_lines: ctx.limits.max_diff_lines,
                must_include_tests: ctx.limits.must_include_tests,
                forbidden_paths: ctx.protected_prefixes.as_slice().to_vec(),
            },
            context_files,
        }
    }
}

/// The service's own claims about its patch. Untrusted.
///
/// Missing fields default to the unsafe-looking answer (`tests_included =
/// false`) so an incomplete record is refused rather than waved through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchValidation {
    pub tests_included: bool,
    pub forbidden_paths_touched: bool,
    pub estimated_diff_lines: u32,
}

/// An `ok` response: a proposed patch plus the service's self-report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchProposal {
    pub summary: String,
    pub risk: Risk,
    #[serde(default)]
    pub files_changed: Vec<String>,
    /// Literal unified diff.
    pub patch: String,
    #[serde(default)]
    pub validation: PatchValidation,
}

impl PatchProposal {
    /// SHA-256 hex of the literal patch text, for log correlation.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.patch.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Response of `POST {endpoint}/pigpen/patch`, tagged by `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PatchResponse {
    Ok(PatchProposal),
    Refused { reason: String, risk: Risk },
    Error { reason: String },
}

impl PatchResponse {
    /// Only `ok` is a value; every other status becomes a typed error.
    pub fn into_proposal(self) -> GatewayResult<PatchProposal> {
        match self {
            PatchResponse::Ok(proposal) => Ok(proposal),
            PatchResponse::Refused { reason, risk } => {
                Err(GatewayError::PatchRefused { reason, risk })
            }
            PatchResponse::Error { reason } => Err(GatewayError::PatchError { reason }),
        }
    }
}

/// Interpret a health probe response.
pub fn interpret_health(status: u16, body: &str) -> GatewayResult<()> {
    if !(200..300).contains(&status) {
        return Err(GatewayError::ServiceUnavailable(format!(
            "Patch service health failed: {status} {body}"
        )));
    }

    let report: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        GatewayError::ServiceUnavailable(format!("Patch service unhealthy: {e}"))
    })?;
    if report.get("status").and_then(|s| s.as_str()) != Some("ok") {
        return Err(GatewayError::ServiceUnavailable(format!(
            "Patch service unhealthy: {report}"
        )));
    }
    Ok(())
}

/// Interpret a patch response.
pub fn interpret_patch_response(status: u16, body: &str) -> GatewayResult<PatchProposal> {
    if !(200..300).contains(&status) {
        return Err(GatewayError::ServiceError {
            status,
            body: body.to_string(),
        });
    }

    let response: PatchResponse =
        serde_json::from_str(body).map_err(|e| GatewayError::Decode(e.to_string()))?;
    response.into_proposal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{route, RouteInput};
    use crate::domain::Action;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let ctx = crate::domain::RunContext::new("acme/api", 7)
            .unwrap()
            .with_issue("Title", "Body")
            .with_comment("implement it");
        let plan = route(RouteInput {
            action: Action::Implement,
            issue_title: "Title",
            issue_body: "Body",
            comment_body: "implement it",
        });
        let req = PatchRequest::for_run(
            &ctx,
            &plan,
            vec![ContextFile {
                path: "src/index.ts".into(),
                content: String::new(),
            }],
        );

        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["meta"]["tid"], "TID-PPOS-0001");
        assert_eq!(value["meta"]["taid"], "TAID-PPOS-PLAN-0004");
        assert_eq!(value["meta"]["version"], "v0.5.0");
        assert_eq!(value["meta"]["issue_number"], 7);
        assert_eq!(value["meta"]["base_branch"], "main");
        assert_eq!(value["intent"]["comment_body"], "implement it");
        assert_eq!(value["constraints"]["max_files"], 10);
        assert_eq!(value["constraints"]["max_diff_lines"], 400);
        assert_eq!(value["constraints"]["must_include_tests"], true);
        assert_eq!(
            value["constraints"]["forbidden_paths"],
            json!([
                "00_README_GOVERNANCE/",
                "01_CANON/",
                ".github/workflows/",
                "tools/pigpen/"
            ])
        );
        assert_eq!(value["context_files"][0]["path"], "src/index.ts");
    }

    #[test]
    fn test_ok_response_decodes() {
        let body = json!({
            "status": "ok",
            "summary": "adds limiter",
            "risk": "medium",
            "files_changed": ["src/rateLimiter.ts"],
            "patch": "+++ b/src/rateLimiter.ts\n",
            "validation": {
                "tests_included": true,
                "forbidden_paths_touched": false,
                "estimated_diff_lines": 42
            }
        })
        .to_string();
        let proposal = interpret_patch_response(200, &body).unwrap();
        assert_eq!(proposal.risk, Risk::Medium);
        assert!(proposal.validation.tests_included);
        assert_eq!(proposal.validation.estimated_diff_lines, 42);
        assert_eq!(proposal.digest().len(), 64);
    }

    #[test]
    fn test_missing_validation_defaults_to_no_tests() {
        let body = json!({
            "status": "ok",
            "summary": "s",
            "risk": "low",
            "patch": ""
        })
        .to_string();
        let proposal = interpret_patch_response(200, &body).unwrap();
        assert!(!proposal.validation.tests_included);
        assert!(proposal.files_changed.is_empty());
    }

    #[test]
    fn test_refused_response_is_error() {
        let body = json!({"status": "refused", "reason": "too big", "risk": "high"}).to_string();
        let err = interpret_patch_response(200, &body).unwrap_err();
        assert!(matches!(err, GatewayError::PatchRefused { risk: Risk::High, .. }));
        assert_eq!(err.to_string(), "Patch refused: too big (risk=high)");
    }

    #[test]
    fn test_error_response_is_error() {
        let body = json!({"status": "error", "reason": "model timeout"}).to_string();
        let err = interpret_patch_response(200, &body).unwrap_err();
        assert_eq!(err.to_string(), "Patch error: model timeout");
    }

    #[test]
    fn test_non_success_status_is_service_error() {
        let err = interpret_patch_response(500, "boom").unwrap_err();
        assert_eq!(err.to_string(), "Patch service error 500: boom");
    }

    #[test]
    fn test_unknown_status_is_decode_error() {
        let body = json!({"status": "maybe"}).to_string();
        assert!(matches!(
            interpret_patch_response(200, &body),
            Err(GatewayError::Decode(_))
        ));
    }

    #[test]
    fn test_health_ok() {
        assert!(interpret_health(200, r#"{"status":"ok"}"#).is_ok());
    }

    #[test]
    fn test_health_non_success() {
        let err = interpret_health(503, "down").unwrap_err();
        assert_eq!(err.to_string(), "Patch service health failed: 503 down");
    }

    #[test]
    fn test_health_reports_unhealthy() {
        let err = interpret_health(200, r#"{"status":"degraded"}"#).unwrap_err();
        assert!(err.to_string().starts_with("Patch service unhealthy:"));
        assert!(err.to_string().contains("degraded"));
    }
}
