//! GitHub REST implementation of [`IssueTracker`].

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::error::{TrackerError, TrackerResult};
use super::{IssueTracker, Permission, PullRequest, PullRequestDraft};

/// Public GitHub API root.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Connection settings for one repository.
#[derive(Clone)]
pub struct GitHubConfig {
    /// API root without trailing slash.
    pub api_base: String,
    pub token: String,
    /// `owner/name`.
    pub repo: String,
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("api_base", &self.api_base)
            .field("token", &"<redacted>")
            .field("repo", &self.repo)
            .finish()
    }
}

impl GitHubConfig {
    pub fn new(token: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token: token.into(),
            repo: repo.into(),
        }
    }

    /// Point at a different API root (GitHub Enterprise, test servers).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}", self.api_base, self.repo, path)
    }
}

/// GitHub issue tracker over the REST API with bearer-token auth.
pub struct GitHubTracker {
    config: GitHubConfig,
    http: reqwest::Client,
}

impl GitHubTracker {
    pub fn new(config: GitHubConfig) -> TrackerResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pigpen/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, http })
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> TrackerResult<T> {
        debug!(method = %method, url = %url, "github request");

        let mut req = self
            .http
            .request(method, url)
            .bearer_auth(&self.config.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(body) = body {
            req = req.json(&body);
        }

        let res = req.send().await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(TrackerError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| TrackerError::Decode(e.to_string()))
    }
}

#[derive(Deserialize)]
struct PermissionResponse {
    permission: Permission,
}

#[async_trait]
impl IssueTracker for GitHubTracker {
    async fn post_comment(&self, issue_number: u64, body: &str) -> TrackerResult<()> {
        let url = self
            .config
            .repo_url(&format!("issues/{issue_number}/comments"));
        let _: serde_json::Value = self
            .request(Method::POST, &url, Some(json!({ "body": body })))
            .await?;
        Ok(())
    }

    async fn user_permission(&self, username: &str) -> TrackerResult<Permission> {
        let url = self
            .config
            .repo_url(&format!("collaborators/{username}/permission"));
        let res: PermissionResponse = self.request(Method::GET, &url, None).await?;
        Ok(res.permission)
    }

    async fn create_pull_request(&self, draft: &PullRequestDraft) -> TrackerResult<PullRequest> {
        let url = self.config.repo_url("pulls");
        let body = json!({
            "title": draft.title,
            "body": draft.body,
            "head": draft.head,
            "base": draft.base,
        });
        self.request(Method::POST, &url, Some(body)).await
    }
}
