//! Mock Google token endpoint and Directory API using wiremock.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use scimsync_google::{DirectoryClient, GoogleCredentials, GoogleEndpoint, TokenCache};

pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/test_service_account_key.pem");
pub const TEST_PUBLIC_KEY: &str = include_str!("../fixtures/test_service_account_pub.pem");
pub const CLIENT_EMAIL: &str = "scimsync@test-project.iam.gserviceaccount.com";
pub const ADMIN_ACCOUNT: &str = "admin@example.com";
pub const ACCESS_TOKEN: &str = "ya29.test-access-token";

pub struct MockDirectory {
    server: MockServer,
}

impl MockDirectory {
    /// A server with a working token endpoint already mounted.
    pub async fn new() -> Self {
        let directory = Self {
            server: MockServer::start().await,
        };
        directory.mock_token().await;
        directory
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    pub fn credentials(&self) -> GoogleCredentials {
        let key = json!({
            "type": "service_account",
            "client_email": CLIENT_EMAIL,
            "private_key": TEST_PRIVATE_KEY,
            "private_key_id": "test-key-1",
            "token_uri": format!("{}/token", self.uri()),
        });
        GoogleCredentials::from_json(key.to_string().as_bytes()).unwrap()
    }

    pub fn token_cache(&self) -> Arc<TokenCache> {
        Arc::new(TokenCache::new(self.credentials(), ADMIN_ACCOUNT))
    }

    /// A client with two immediate retries.
    pub fn client(&self) -> DirectoryClient {
        DirectoryClient::with_http_client(self.token_cache(), reqwest::Client::new())
            .with_base_url(self.uri())
            .with_retry(2, Duration::ZERO)
    }

    pub fn endpoint(&self, entries: &[&str]) -> GoogleEndpoint {
        GoogleEndpoint::new(
            self.client(),
            entries.iter().map(|e| e.to_string()).collect(),
        )
    }

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
    // Token endpoint
    // =========================================================================

    async fn mock_token(&self) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("assertion="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": ACCESS_TOKEN,
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // Directory
    // =========================================================================

    /// GET /users without a query: every user, in pages of `page_size`.
    pub async fn mock_all_users(&self, users: Vec<Value>, page_size: usize) {
        let pages: Vec<&[Value]> = if users.is_empty() {
            vec![&users[..]]
        } else {
            users.chunks(page_size).collect()
        };
        let last = pages.len() - 1;
        for (index, page) in pages.into_iter().enumerate() {
            let mut body = json!({ "users": page });
            if index < last {
                body["nextPageToken"] = json!(format!("page-{}", index + 1));
            }
            let mut mock = Mock::given(method("GET"))
                .and(path("/users"))
                .and(query_param("customer", "my_customer"))
                .and(query_param_is_missing("query"));
            mock = if index == 0 {
                mock.and(query_param_is_missing("pageToken"))
            } else {
                mock.and(query_param("pageToken", format!("page-{index}").as_str()))
            };
            mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(&self.server)
                .await;
        }
    }

    /// GET /users?query=<query>.
    pub async fn mock_user_query(&self, query: &str, users: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(query_param("query", query))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "users": users })))
            .mount(&self.server)
            .await;
    }

    /// GET /groups?query=<query>.
    pub async fn mock_group_query(&self, query: &str, groups: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path("/groups"))
            .and(query_param("customer", "my_customer"))
            .and(query_param("query", query))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "groups": groups })))
            .mount(&self.server)
            .await;
    }

    /// GET /groups/{id}/members answering with the given member ids.
    pub async fn mock_members(&self, group_id: &str, members: &[(&str, &str)]) {
        let members: Vec<Value> = members
            .iter()
            .map(|(id, kind)| json!({ "id": id, "type": kind }))
            .collect();
        Mock::given(method("GET"))
            .and(path(format!("/groups/{group_id}/members")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "members": members })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_error(&self, url_path: &str, status: u16, message: &str) {
        Mock::given(method("GET"))
            .and(path(url_path))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": { "code": status, "message": message }
            })))
            .mount(&self.server)
            .await;
    }
}

pub fn google_user(id: &str, email: &str, given: &str, family: &str) -> Value {
    json!({
        "id": id,
        "primaryEmail": email,
        "name": {
            "givenName": given,
            "familyName": family,
            "fullName": format!("{given} {family}")
        },
        "suspended": false
    })
}

pub fn google_group(id: &str, name: &str, email: &str) -> Value {
    json!({ "id": id, "name": name, "email": email })
}
