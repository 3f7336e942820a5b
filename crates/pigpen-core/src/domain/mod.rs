//! Domain models for PigPenOS.
//!
//! Canonical definitions for the per-run entities:
//! - `Action`: classified intent of the triggering comment
//! - `Plan`: risk-annotated execution intention
//! - `GovernanceOutcome`: escalation state decided by the pipeline
//! - `RunContext`: explicit context built once per process

pub mod action;
pub mod context;
pub mod error;
pub mod plan;

// Re-export main types and errors
pub use action::Action;
pub use context::{PatchLimits, RunContext};
pub use error::{PigpenError, Result};
pub use plan::{
    Domain, GovernanceOutcome, Intent, Plan, PlanIds, Risk, PIGPEN_TID, PIGPEN_VERSION, PLAN_TAID,
};
