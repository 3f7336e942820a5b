//! The classified intent of a triggering comment.

use serde::{Deserialize, Serialize};

/// What a triggering comment asks PigPenOS to do.
///
/// Derived once per run from the comment text and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Produce and post a plan only.
    Plan,
    /// Generate, verify, test and open a pull request.
    Implement,
    /// Repair a failing pipeline.
    FixCi,
    /// Nothing recognisable was asked for.
    Unknown,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plan => "PLAN",
            Self::Implement => "IMPLEMENT",
            Self::FixCi => "FIX_CI",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Only `Implement` proceeds past the plan comment into the gates.
    pub fn is_mutating(self) -> bool {
        matches!(self, Self::Implement)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
