//! Plan builder.
//!
//! Derives risk, intent, domain and a concrete plan template from the issue
//! title, issue body and comment. Pure: no I/O, no clock, no randomness.

use crate::domain::{Action, Domain, Intent, Plan, PlanIds, Risk};

/// Terms that make a change high risk. Checked before medium.
pub const HIGH_RISK_TERMS: &[&str] = &["auth", "payment", "security"];

/// Terms that make a change medium risk.
pub const MEDIUM_RISK_TERMS: &[&str] = &["rate", "limit", "middleware"];

/// Input text for one routing decision.
#[derive(Debug, Clone, Copy)]
pub struct RouteInput<'a> {
    pub action: Action,
    pub issue_title: &'a str,
    pub issue_body: &'a str,
    pub comment_body: &'a str,
}

impl RouteInput<'_> {
    /// Title, body and comment joined by newlines, trimmed.
    fn corpus(&self) -> String {
        format!(
            "{}\n{}\n{}",
            self.issue_title, self.issue_body, self.comment_body
        )
        .trim()
        .to_string()
    }
}

/// Risk tier of a text. Tiers are evaluated high to medium; first hit wins.
pub fn risk_from_text(text: &str) -> Risk {
    let s = text.to_lowercase();
    if HIGH_RISK_TERMS.iter().any(|t| s.contains(t)) {
        return Risk::High;
    }
    if MEDIUM_RISK_TERMS.iter().any(|t| s.contains(t)) {
        return Risk::Medium;
    }
    Risk::Low
}

pub fn intent_from_text(text: &str) -> Intent {
    if text.to_lowercase().contains("rate limit") {
        Intent::AddRateLimiter
    } else {
        Intent::GeneralChange
    }
}

pub fn domain_from_text(text: &str) -> Domain {
    let s = text.to_lowercase();
    if s.contains("api") || s.contains("endpoint") {
        Domain::Ops
    } else {
        Domain::Projects
    }
}

struct Template {
    files_likely: &'static [&'static str],
    steps: &'static [&'static str],
    tests: &'static [&'static str],
    rollback: &'static str,
}

fn template_for(intent: Intent) -> Template {
    match intent {
        Intent::AddRateLimiter => Template {
            files_likely: &[
                "src/rateLimiter.ts",
                "src/index.ts",
                "test/rateLimiter.test.ts",
            ],
            steps: &[
                "Add a rate limiter module with a small, testable surface.",
                "Wire limiter into app entrypoint.",
                "Add unit tests covering limit exceeded behavior.",
                "Run CI (tests) and open PR with summary + rollback note.",
            ],
            tests: &["npm test (unit)"],
            rollback: "Revert PR; limiter is isolated to rateLimiter.ts + one import.",
        },
        Intent::GeneralChange => Template {
            files_likely: &["src/index.ts"],
            steps: &["Implement minimal change with tests, keep PR small."],
            tests: &["npm test"],
            rollback: "Revert PR.",
        },
    }
}

/// Build the plan for one run.
pub fn route(input: RouteInput<'_>) -> Plan {
    let text = input.corpus();
    let intent = intent_from_text(&text);
    let template = template_for(intent);
    let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    Plan {
        ids: PlanIds::default(),
        action: input.action,
        intent,
        domain: domain_from_text(&text),
        risk: risk_from_text(&text),
        files_likely: owned(template.files_likely),
        steps: owned(template.steps),
        tests: owned(template.tests),
        rollback: template.rollback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(title: &'a str, body: &'a str, comment: &'a str) -> RouteInput<'a> {
        RouteInput {
            action: Action::Implement,
            issue_title: title,
            issue_body: body,
            comment_body: comment,
        }
    }

    #[test]
    fn test_high_beats_medium() {
        assert_eq!(risk_from_text("rate limit the auth endpoint"), Risk::High);
    }

    #[test]
    fn test_medium_and_low() {
        assert_eq!(risk_from_text("add Middleware"), Risk::Medium);
        assert_eq!(risk_from_text("fix a typo in the readme"), Risk::Low);
    }

    #[test]
    fn test_rate_limiter_template() {
        let plan = route(input("", "", "please implement a rate limit for the API"));
        assert_eq!(plan.intent, Intent::AddRateLimiter);
        assert_eq!(plan.risk, Risk::Medium);
        assert_eq!(plan.domain, Domain::Ops);
        assert_eq!(
            plan.files_likely,
            vec!["src/rateLimiter.ts", "src/index.ts", "test/rateLimiter.test.ts"]
        );
        assert_eq!(plan.steps.len(), 4);
        assert_eq!(plan.tests, vec!["npm test (unit)"]);
    }

    #[test]
    fn test_general_template() {
        let plan = route(input("Tidy docs", "some words", "implement"));
        assert_eq!(plan.intent, Intent::GeneralChange);
        assert_eq!(plan.domain, Domain::Projects);
        assert_eq!(plan.files_likely, vec!["src/index.ts"]);
        assert_eq!(plan.rollback, "Revert PR.");
    }

    #[test]
    fn test_issue_text_contributes_to_risk() {
        let plan = route(input("Payment flow", "", "implement a rate limit"));
        assert_eq!(plan.risk, Risk::High);
        assert_eq!(plan.intent, Intent::AddRateLimiter);
    }

    #[test]
    fn test_phrase_split_across_fields_does_not_match() {
        // "rate" ends the title and "limit" starts the body; joined by a newline.
        let plan = route(input("rate", "limit", ""));
        assert_eq!(plan.intent, Intent::GeneralChange);
        assert_eq!(plan.risk, Risk::Medium);
    }

    #[test]
    fn test_route_is_deterministic() {
        let a = route(input("t", "b", "c"));
        let b = route(input("t", "b", "c"));
        assert_eq!(a, b);
    }
}
