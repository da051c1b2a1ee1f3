//! Admin SDK Directory API client with pagination and retry.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::models::{ApiErrorResponse, GoogleGroup, GoogleMember, GoogleUser, Page};
use crate::{GoogleError, GoogleResult, TokenCache};

/// Production Directory API root.
pub const DEFAULT_BASE_URL: &str = "https://admin.googleapis.com/admin/directory/v1";

/// Page size for user listings; the API maximum is 500.
pub const USER_PAGE_SIZE: u32 = 200;

const CUSTOMER: &str = "my_customer";

/// Read-only Directory API client for one Workspace customer.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    http_client: reqwest::Client,
    token_cache: Arc<TokenCache>,
    base_url: String,
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl DirectoryClient {
    /// Creates a new Directory client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token_cache: Arc<TokenCache>, timeout: Duration) -> GoogleResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GoogleError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self::with_http_client(token_cache, http_client))
    }

    #[must_use]
    pub fn with_http_client(token_cache: Arc<TokenCache>, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            token_cache,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }

    /// Point the client at another API root (for testing).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    /// Upper bound for any single wait, `Retry-After` included.
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Users of the customer, optionally narrowed by a Directory query
    /// such as `email=jane@example.com`.
    pub async fn list_users(&self, query: Option<&str>) -> GoogleResult<Vec<GoogleUser>> {
        let mut params = vec![("maxResults", USER_PAGE_SIZE.to_string())];
        if let Some(q) = query {
            params.push(("query", q.to_string()));
        }
        self.list_all("users", params).await
    }

    /// A single page of at most `max_results` users.
    pub async fn first_users(&self, max_results: u32) -> GoogleResult<Vec<GoogleUser>> {
        let page: Page<GoogleUser> = self
            .get(
                "users",
                &[
                    ("customer", CUSTOMER.to_string()),
                    ("maxResults", max_results.to_string()),
                ],
            )
            .await?;
        Ok(page.items)
    }

    /// Groups of the customer, optionally narrowed by a query such as
    /// `name='Engineering'`.
    pub async fn list_groups(&self, query: Option<&str>) -> GoogleResult<Vec<GoogleGroup>> {
        let params = query
            .map(|q| vec![("query", q.to_string())])
            .unwrap_or_default();
        self.list_all("groups", params).await
    }

    /// Direct members of a group: users and nested groups alike.
    pub async fn list_members(&self, group_id: &str) -> GoogleResult<Vec<GoogleMember>> {
        let mut members = Vec::new();
        let mut page_token: Option<String> = None;
        let path = format!("groups/{group_id}/members");
        loop {
            let mut params = Vec::new();
            if let Some(ref token) = page_token {
                params.push(("pageToken", token.clone()));
            }
            let page: Page<GoogleMember> = self.get(&path, &params).await?;
            members.extend(page.items);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(members),
            }
        }
    }

    /// Follow `nextPageToken` on a customer-scoped collection.
    #[instrument(skip(self, params))]
    async fn list_all<T: DeserializeOwned>(
        &self,
        collection: &str,
        mut params: Vec<(&'static str, String)>,
    ) -> GoogleResult<Vec<T>> {
        params.push(("customer", CUSTOMER.to_string()));
        let mut items = Vec::new();
        loop {
            let page: Page<T> = self.get(collection, &params).await?;
            debug!(collection, received = page.items.len(), "Directory page");
            items.extend(page.items);
            params.retain(|(key, _)| *key != "pageToken");
            match page.next_page_token {
                Some(token) if !token.is_empty() => params.push(("pageToken", token)),
                _ => return Ok(items),
            }
        }
    }

    /// GET with bearer token and retry on 429 and gateway errors.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> GoogleResult<T> {
        let url = format!("{}/{}", self.base_url, path);
        let mut retries = 0;
        let mut delay = self.base_delay;

        loop {
            let token = self.token_cache.get_token().await?;
            let response = self
                .http_client
                .get(&url)
                .query(params)
                .bearer_auth(&token)
                .send()
                .await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response.json().await?);
            }

            if status == StatusCode::UNAUTHORIZED && retries == 0 {
                // Token revoked or clock skew; one fresh token is worth a try.
                self.token_cache.invalidate().await;
                retries += 1;
                continue;
            }

            let transient = matches!(
                status,
                StatusCode::TOO_MANY_REQUESTS
                    | StatusCode::BAD_GATEWAY
                    | StatusCode::SERVICE_UNAVAILABLE
                    | StatusCode::GATEWAY_TIMEOUT
            );
            if transient {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok());
                if retries >= self.max_retries {
                    let last = if status == StatusCode::TOO_MANY_REQUESTS {
                        GoogleError::RateLimited {
                            retry_after_secs: retry_after.unwrap_or(0),
                        }
                        .to_string()
                    } else {
                        format!("HTTP {status}")
                    };
                    return Err(GoogleError::MaxRetriesExceeded {
                        attempts: retries + 1,
                        message: format!("GET {path}: {last}"),
                    });
                }
                let wait = retry_after
                    .map_or(delay, Duration::from_secs)
                    .min(self.max_delay);
                retries += 1;
                warn!(
                    "Transient error {}, retry {}/{} after {:?}",
                    status, retries, self.max_retries, wait
                );
                tokio::time::sleep(wait).await;
                delay = delay.saturating_mul(2).min(self.max_delay);
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_error) => GoogleError::Api {
                    code: status.as_u16(),
                    message: api_error.error.message,
                },
                Err(_) => GoogleError::Api {
                    code: status.as_u16(),
                    message: body,
                },
            });
        }
    }
}
