//! Natural-language trigger (NTL) classification.
//!
//! Maps a free-text comment onto an [`Action`] with case-insensitive substring
//! matching. Hint lists are checked in a fixed priority order: implement, then
//! plan, then fix-ci. A comment that both scopes and asks for action resolves
//! to `Implement`.

use crate::domain::Action;

/// Phrases that ask for a change to be made.
pub const IMPLEMENT_HINTS: &[&str] = &[
    "implement",
    "build",
    "code",
    "make the change",
    "open a pr",
    "ship",
    "create pr",
];

/// Phrases that ask for scoping only.
pub const PLAN_HINTS: &[&str] = &[
    "plan",
    "scope",
    "breakdown",
    "steps",
    "how would you do this",
    "approach",
];

/// Phrases that point at a broken pipeline.
pub const FIX_CI_HINTS: &[&str] = &[
    "fix ci",
    "tests failing",
    "lint",
    "typecheck",
    "failing pipeline",
];

/// Classify a comment into an [`Action`].
pub fn classify(text: &str) -> Action {
    let t = text.to_lowercase();
    let matches = |hints: &[&str]| hints.iter().any(|h| t.contains(h));

    if matches(IMPLEMENT_HINTS) {
        return Action::Implement;
    }
    if matches(PLAN_HINTS) {
        return Action::Plan;
    }
    if matches(FIX_CI_HINTS) {
        return Action::FixCi;
    }

    Action::Unknown
}
