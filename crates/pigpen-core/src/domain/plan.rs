//! The risk-annotated execution plan derived from issue and comment text.

use serde::{Deserialize, Serialize};

use super::action::Action;

/// Task identifier stamped on every plan and message.
pub const PIGPEN_TID: &str = "TID-PPOS-0001";

/// Task-action identifier of the planning step.
pub const PLAN_TAID: &str = "TAID-PPOS-PLAN-0004";

/// Protocol/release version stamped on every plan and message.
pub const PIGPEN_VERSION: &str = "v0.5.0";

/// Risk level of a requested change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    Low,
    Medium,
    High,
}

impl Risk {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Risk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognised intents. Each one selects a fixed plan template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    AddRateLimiter,
    GeneralChange,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddRateLimiter => "add_rate_limiter",
            Self::GeneralChange => "general_change",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse area of the codebase a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Ops,
    Projects,
}

impl Domain {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ops => "ops",
            Self::Projects => "projects",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier triple carried by a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanIds {
    pub tid: String,
    pub taid: String,
    pub version: String,
}

impl Default for PlanIds {
    fn default() -> Self {
        Self {
            tid: PIGPEN_TID.to_string(),
            taid: PLAN_TAID.to_string(),
            version: PIGPEN_VERSION.to_string(),
        }
    }
}

/// Execution intention for one run.
///
/// Immutable once built by the router. Escalation decisions made later by the
/// pipeline are recorded on a separate [`GovernanceOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub ids: PlanIds,
    pub action: Action,
    pub intent: Intent,
    pub domain: Domain,
    pub risk: Risk,
    /// Files the change will probably touch. A hint sent as context, not a constraint.
    pub files_likely: Vec<String>,
    pub steps: Vec<String>,
    pub tests: Vec<String>,
    pub rollback: String,
}

/// Escalation state the pipeline layers on top of an immutable [`Plan`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceOutcome {
    /// Protected paths found in the literal patch, in patch order.
    pub protected_paths_touched: Vec<String>,
}

impl GovernanceOutcome {
    /// Outcome for a patch that touched protected material.
    pub fn escalated(protected_paths_touched: Vec<String>) -> Self {
        Self {
            protected_paths_touched,
        }
    }

    /// Whether a second, human key is needed before this change may land.
    pub fn two_key_required(&self) -> bool {
        !self.protected_paths_touched.is_empty()
    }
}
