//! SCIM 2.0 HTTP client (reqwest-based).
//!
//! Every request goes through the client's [`RetryPolicy`]; callers only see
//! the final outcome.

use crate::auth::ScimAuth;
use crate::error::{ScimClientError, ScimClientResult};
use crate::models::{
    ScimGroup, ScimListResponse, ScimPatchRequest, ScimUser, ServiceProviderConfig,
};
use crate::retry::RetryPolicy;
use reqwest::header::{ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

const SCIM_CONTENT_TYPE: &str = "application/scim+json";

/// Resources requested per list page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Health check result from a SCIM target.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HealthCheckResult {
    /// Whether the target is reachable and accepted the token.
    pub healthy: bool,
    pub checked_at: chrono::DateTime<chrono::Utc>,
    pub service_provider_config: Option<ServiceProviderConfig>,
    pub error: Option<String>,
}

/// SCIM 2.0 client for one target endpoint.
#[derive(Debug, Clone)]
pub struct ScimClient {
    /// Base URL without trailing slash, e.g. `https://host/api/rest/scim/v2/123`.
    base_url: String,
    auth: ScimAuth,
    http_client: Client,
    retry: RetryPolicy,
    page_size: usize,
}

impl ScimClient {
    /// Create a client with its own connection pool.
    pub fn new(
        base_url: impl Into<String>,
        auth: ScimAuth,
        timeout: Duration,
    ) -> ScimClientResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("scimsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ScimClientError::InvalidConfig(format!("Failed to build HTTP client: {e}"))
            })?;
        Ok(Self::with_http_client(base_url, auth, http_client))
    }

    /// Create a client with a pre-built `reqwest::Client` (for testing).
    #[must_use]
    pub fn with_http_client(base_url: impl Into<String>, auth: ScimAuth, http_client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            auth,
            http_client,
            retry: RetryPolicy::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ── Discovery ─────────────────────────────────────────────────────

    /// GET /ServiceProviderConfig.
    pub async fn service_provider_config(&self) -> ScimClientResult<ServiceProviderConfig> {
        self.get("ServiceProviderConfig").await
    }

    /// Check reachability and token validity.
    pub async fn health_check(&self) -> HealthCheckResult {
        let checked_at = chrono::Utc::now();
        match self.service_provider_config().await {
            Ok(config) => HealthCheckResult {
                healthy: true,
                checked_at,
                service_provider_config: Some(config),
                error: None,
            },
            Err(e) => HealthCheckResult {
                healthy: false,
                checked_at,
                service_provider_config: None,
                error: Some(e.to_string()),
            },
        }
    }

    // ── Users ─────────────────────────────────────────────────────────

    /// Every user on the target, following pagination.
    pub async fn list_users(&self) -> ScimClientResult<Vec<ScimUser>> {
        self.list_all("Users").await
    }

    pub async fn get_user(&self, id: &str) -> ScimClientResult<ScimUser> {
        self.get(&format!("Users/{id}")).await
    }

    pub async fn create_user(&self, user: &ScimUser) -> ScimClientResult<ScimUser> {
        self.send_json(Method::POST, "Users", user).await
    }

    pub async fn patch_user(&self, id: &str, patch: &ScimPatchRequest) -> ScimClientResult<()> {
        self.send_no_content(Method::PATCH, &format!("Users/{id}"), Some(patch))
            .await
    }

    pub async fn delete_user(&self, id: &str) -> ScimClientResult<()> {
        self.send_no_content::<()>(Method::DELETE, &format!("Users/{id}"), None)
            .await
    }

    // ── Groups ────────────────────────────────────────────────────────

    /// Every group on the target, following pagination.
    pub async fn list_groups(&self) -> ScimClientResult<Vec<ScimGroup>> {
        self.list_all("Groups").await
    }

    pub async fn get_group(&self, id: &str) -> ScimClientResult<ScimGroup> {
        self.get(&format!("Groups/{id}")).await
    }

    pub async fn create_group(&self, group: &ScimGroup) -> ScimClientResult<ScimGroup> {
        self.send_json(Method::POST, "Groups", group).await
    }

    pub async fn patch_group(&self, id: &str, patch: &ScimPatchRequest) -> ScimClientResult<()> {
        self.send_no_content(Method::PATCH, &format!("Groups/{id}"), Some(patch))
            .await
    }

    pub async fn delete_group(&self, id: &str) -> ScimClientResult<()> {
        self.send_no_content::<()>(Method::DELETE, &format!("Groups/{id}"), None)
            .await
    }

    // ── Pagination ────────────────────────────────────────────────────

    /// One page starting at the 1-based `start_index`.
    pub async fn list_page<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        start_index: usize,
        count: usize,
    ) -> ScimClientResult<ScimListResponse<T>> {
        let path = format!("{endpoint}?startIndex={start_index}&count={count}");
        self.get(&path).await
    }

    async fn list_all<T: DeserializeOwned>(&self, endpoint: &str) -> ScimClientResult<Vec<T>> {
        let mut resources = Vec::new();
        let mut start_index = 1;
        loop {
            let page: ScimListResponse<T> =
                self.list_page(endpoint, start_index, self.page_size).await?;
            let received = page.resources.len();
            resources.extend(page.resources);
            debug!(
                endpoint,
                start_index,
                received,
                total = page.total_results,
                "SCIM list page"
            );
            if received == 0 || resources.len() >= page.total_results {
                break;
            }
            start_index += received;
        }
        info!(endpoint, count = resources.len(), "SCIM resources loaded");
        Ok(resources)
    }

    // ── Internal HTTP Methods ─────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ScimClientResult<T> {
        let response = self.execute(Method::GET, path, None).await?;
        parse_body(response).await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ScimClientResult<T> {
        let body = to_value(body)?;
        let response = self.execute(method, path, Some(&body)).await?;
        parse_body(response).await
    }

    async fn send_no_content<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ScimClientResult<()> {
        let body = body.map(to_value).transpose()?;
        self.execute(method, path, body.as_ref()).await?;
        Ok(())
    }

    /// Send with retry; only 2xx responses are returned.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> ScimClientResult<Response> {
        let url = format!("{}/{}", self.base_url, path);
        let operation = format!("SCIM {method} {path}");
        self.retry
            .execute(&operation, || self.send_once(method.clone(), &url, body))
            .await
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> ScimClientResult<Response> {
        debug!("SCIM {} {}", method, url);
        let mut builder = self
            .auth
            .apply(self.http_client.request(method, url))
            .header(ACCEPT, SCIM_CONTENT_TYPE);
        if let Some(body) = body {
            builder = builder.header(CONTENT_TYPE, SCIM_CONTENT_TYPE).json(body);
        }
        let response = builder.send().await.map_err(|e| {
            if e.is_connect() {
                ScimClientError::Unreachable(format!("{url}: {e}"))
            } else {
                ScimClientError::Http(e)
            }
        })?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }
}

fn to_value<B: Serialize + ?Sized>(body: &B) -> ScimClientResult<Value> {
    serde_json::to_value(body)
        .map_err(|e| ScimClientError::ParseError(format!("Failed to encode request: {e}")))
}

async fn parse_body<T: DeserializeOwned>(response: Response) -> ScimClientResult<T> {
    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| ScimClientError::ParseError(format!("Failed to parse response: {e}")))
}

async fn error_from_response(response: Response) -> ScimClientError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();
    let detail = scim_error_detail(&body).unwrap_or(body);

    match status {
        StatusCode::NOT_FOUND => ScimClientError::NotFound(detail),
        StatusCode::CONFLICT => ScimClientError::Conflict(detail),
        StatusCode::TOO_MANY_REQUESTS => {
            warn!(retry_after_secs = ?retry_after, "SCIM target rate limited");
            ScimClientError::RateLimited {
                retry_after_secs: retry_after,
            }
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ScimClientError::AuthError(format!("{status}: {detail}"))
        }
        _ => ScimClientError::ScimError {
            status: status.as_u16(),
            detail: if detail.is_empty() {
                format!("HTTP {status}")
            } else {
                detail
            },
        },
    }
}

/// The `detail` member of a SCIM error body (RFC 7644 §3.12), if present.
fn scim_error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("detail")?.as_str().map(str::to_string)
}
