//! Mechanical verification of a proposed patch.
//!
//! [`VerifiedPatch`] has no public constructor. The only way to obtain one is
//! [`verify`], which re-scans the literal diff against the protected prefixes,
//! so anything that needs a `VerifiedPatch` (branch creation onward) cannot
//! run on an unscanned patch.

use crate::gateway::PatchProposal;
use crate::protected::{protected_paths_in, ProtectedPrefixSet};

/// A proposal whose literal diff touches no protected path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPatch {
    proposal: PatchProposal,
}

impl VerifiedPatch {
    pub fn proposal(&self) -> &PatchProposal {
        &self.proposal
    }

    pub fn patch(&self) -> &str {
        &self.proposal.patch
    }
}

/// Scan the proposal's patch text. Returns the protected paths it touches,
/// in patch order, when there are any.
///
/// The service's own `forbidden_paths_touched` claim plays no part here.
pub fn verify(
    proposal: PatchProposal,
    prefixes: &ProtectedPrefixSet,
) -> Result<VerifiedPatch, Vec<String>> {
    let touched = protected_paths_in(&proposal.patch, prefixes);
    if touched.is_empty() {
        Ok(VerifiedPatch { proposal })
    } else {
        Err(touched)
    }
}
