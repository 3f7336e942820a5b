//! Patch request gateway: the contract with the external patch-generation
//! service.
//!
//! # Modules
//!
//! - [`contract`]: request/response shapes and response interpretation
//! - [`client`]: `HttpPatchService` (reqwest)
//! - [`error`]: `GatewayError` / `GatewayResult`
//!
//! Calls are one-shot: no retry, no backoff. Anything other than an `ok`
//! patch comes back as a typed error.

pub mod client;
pub mod contract;
pub mod error;

use async_trait::async_trait;

pub use client::{HttpPatchService, PatchServiceConfig};
pub use contract::{
    ContextFile, PatchConstraints, PatchIntent, PatchMeta, PatchProposal, PatchRequest,
    PatchResponse, PatchValidation, PROTOCOL_VERSION,
};
pub use error::{GatewayError, GatewayResult};

/// The patch-generation service as seen by the pipeline.
#[async_trait]
pub trait PatchService: Send + Sync {
    /// Probe the service. `Configuration` when endpoint or key is missing,
    /// `ServiceUnavailable` when the probe fails or reports unhealthy.
    async fn health_check(&self) -> GatewayResult<()>;

    /// Ask for a patch. Returns only the `ok` variant.
    async fn request_patch(&self, request: &PatchRequest) -> GatewayResult<PatchProposal>;
}
