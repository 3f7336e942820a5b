//! HTTP client for the patch-generation service.

use async_trait::async_trait;
use tracing::debug;

use super::contract::{
    interpret_health, interpret_patch_response, PatchProposal, PatchRequest, PROTOCOL_VERSION,
};
use super::error::{GatewayError, GatewayResult};
use super::PatchService;

/// Environment variable holding the service base URL.
pub const ENDPOINT_ENV: &str = "PIGPEN_LLM_ENDPOINT";

/// Environment variable holding the service bearer credential.
pub const API_KEY_ENV: &str = "PIGPEN_API_KEY";

/// Patch service configuration. Both fields must be present for any call.
#[derive(Clone, Default)]
pub struct PatchServiceConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

impl std::fmt::Debug for PatchServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchServiceConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl PatchServiceConfig {
    pub fn new(endpoint: Option<String>, api_key: Option<String>) -> Self {
        Self { endpoint, api_key }
    }

    /// Read [`ENDPOINT_ENV`] and [`API_KEY_ENV`].
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var(ENDPOINT_ENV).ok(),
            api_key: std::env::var(API_KEY_ENV).ok(),
        }
    }

    /// Base URL without trailing slashes, and the key. Blank counts as missing.
    fn resolved(&self) -> GatewayResult<(&str, &str)> {
        let endpoint = self
            .endpoint
            .as_deref()
            .map(|e| e.trim().trim_end_matches('/'))
            .filter(|e| !e.is_empty());
        let key = self.api_key.as_deref().filter(|k| !k.trim().is_empty());
        match (endpoint, key) {
            (Some(endpoint), Some(key)) => Ok((endpoint, key)),
            _ => Err(GatewayError::Configuration),
        }
    }
}

/// [`PatchService`] over HTTP with bearer auth and the protocol header.
pub struct HttpPatchService {
    config: PatchServiceConfig,
    http: reqwest::Client,
}

impl HttpPatchService {
    pub fn new(config: PatchServiceConfig) -> GatewayResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pigpen/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl PatchService for HttpPatchService {
    async fn health_check(&self) -> GatewayResult<()> {
        let (endpoint, key) = self.config.resolved()?;
        let url = format!("{endpoint}/health");
        debug!(url = %url, "probing patch service");

        let res = self
            .http
            .get(&url)
            .bearer_auth(key)
            .header("X-PigPen-Version", PROTOCOL_VERSION)
            .send()
            .await?;
        let status = res.status().as_u16();
        let body = res.text().await?;
        interpret_health(status, &body)
    }

    async fn request_patch(&self, request: &PatchRequest) -> GatewayResult<PatchProposal> {
        let (endpoint, key) = self.config.resolved()?;
        let url = format!("{endpoint}/pigpen/patch");
        debug!(
            url = %url,
            context_files = request.context_files.len(),
            "requesting patch"
        );

        let res = self
            .http
            .post(&url)
            .bearer_auth(key)
            .header("X-PigPen-Version", PROTOCOL_VERSION)
            .json(request)
            .send()
            .await?;
        let status = res.status().as_u16();
        let body = res.text().await?;
        interpret_patch_response(status, &body)
    }
}
