//! Mock SCIM server using wiremock for integration testing.
//!
//! Simulates the SCIM 2.0 endpoints the sync touches with success, error
//! and rate limiting scenarios.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use scimsync_client::{RetryPolicy, ScimAuth, ScimClient};

pub const TEST_TOKEN: &str = "test-token-123";

/// A wiremock server speaking enough SCIM for the sync.
pub struct MockScimServer {
    server: MockServer,
    id_counter: Arc<AtomicU64>,
}

impl MockScimServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
            id_counter: Arc::new(AtomicU64::new(1000)),
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// A client for this server that retries twice without delay.
    pub fn client(&self) -> ScimClient {
        ScimClient::with_http_client(
            self.uri(),
            ScimAuth::bearer(TEST_TOKEN.to_string()),
            reqwest::Client::new(),
        )
        .with_retry_policy(RetryPolicy::new(2, Duration::ZERO))
    }

    /// Requests received so far for `http_method` on `url_path`.
    pub async fn requests_to(&self, http_method: &str, url_path: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.as_str() == http_method && r.url.path() == url_path)
            .collect()
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    pub async fn mock_service_provider_config(&self) {
        Mock::given(method("GET"))
            .and(path("/ServiceProviderConfig"))
            .and(header("Authorization", format!("Bearer {TEST_TOKEN}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "schemas": ["urn:ietf:params:scim:schemas:core:2.0:ServiceProviderConfig"],
                "patch": { "supported": true },
                "filter": { "supported": false, "maxResults": 0 }
            })))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Serve `resources` from `/{endpoint}` in pages of `page_size`.
    pub async fn mock_list(&self, endpoint: &str, resources: Vec<Value>, page_size: usize) {
        let total = resources.len();
        if total == 0 {
            Mock::given(method("GET"))
                .and(path(format!("/{endpoint}")))
                .respond_with(ResponseTemplate::new(200).set_body_json(list_response(
                    vec![],
                    0,
                    1,
                )))
                .mount(&self.server)
                .await;
            return;
        }
        for (page, chunk) in resources.chunks(page_size).enumerate() {
            let start_index = page * page_size + 1;
            Mock::given(method("GET"))
                .and(path(format!("/{endpoint}")))
                .and(query_param("startIndex", start_index.to_string().as_str()))
                .respond_with(ResponseTemplate::new(200).set_body_json(list_response(
                    chunk.to_vec(),
                    total,
                    start_index,
                )))
                .mount(&self.server)
                .await;
        }
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// POST /Users and /Groups echo the body with a fresh id.
    pub async fn mock_create_success(&self) {
        for endpoint in ["Users", "Groups"] {
            let counter = self.id_counter.clone();
            Mock::given(method("POST"))
                .and(path(format!("/{endpoint}")))
                .and(header("Content-Type", "application/scim+json"))
                .respond_with(move |req: &Request| {
                    let mut body: Value = serde_json::from_slice(&req.body).unwrap_or(json!({}));
                    let id = counter.fetch_add(1, Ordering::SeqCst).to_string();
                    if let Some(obj) = body.as_object_mut() {
                        obj.insert("id".to_string(), json!(id));
                    }
                    ResponseTemplate::new(201).set_body_json(body)
                })
                .mount(&self.server)
                .await;
        }
    }

    // =========================================================================
    // Modification
    // =========================================================================

    /// PATCH and DELETE on any single resource answer 204.
    pub async fn mock_modify_success(&self) {
        for http_method in ["PATCH", "DELETE"] {
            Mock::given(method(http_method))
                .respond_with(ResponseTemplate::new(204))
                .mount(&self.server)
                .await;
        }
    }

    // =========================================================================
    // Errors
    // =========================================================================

    /// Every request to `url_path` answers `status` with a SCIM error body.
    pub async fn mock_error(&self, http_method: &str, url_path: &str, status: u16, detail: &str) {
        Mock::given(method(http_method))
            .and(path(url_path))
            .respond_with(ResponseTemplate::new(status).set_body_json(error_body(status, detail)))
            .mount(&self.server)
            .await;
    }
}

pub fn list_response(resources: Vec<Value>, total: usize, start_index: usize) -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:api:messages:2.0:ListResponse"],
        "totalResults": total,
        "startIndex": start_index,
        "itemsPerPage": resources.len(),
        "Resources": resources
    })
}

pub fn error_body(status: u16, detail: &str) -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:api:messages:2.0:Error"],
        "detail": detail,
        "status": status.to_string()
    })
}

pub fn scim_user(id: &str, user_name: &str, external_id: Option<&str>, groups: &[&str]) -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
        "id": id,
        "externalId": external_id,
        "userName": user_name,
        "displayName": "Test User",
        "name": { "givenName": "Test", "familyName": "User" },
        "active": true,
        "groups": groups.iter().map(|g| json!({ "value": g })).collect::<Vec<_>>()
    })
}

pub fn scim_group(id: &str, display_name: &str, external_id: Option<&str>) -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:Group"],
        "id": id,
        "externalId": external_id,
        "displayName": display_name
    })
}
