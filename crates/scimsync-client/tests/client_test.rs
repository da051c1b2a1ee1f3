//! Integration tests for the SCIM HTTP client: discovery, authentication,
//! pagination, error mapping and retry.

mod helpers;

use helpers::mock_scim_server::{
    error_body, list_response, scim_group, scim_user, MockScimServer, TEST_TOKEN,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use scimsync_client::models::{ScimGroup, ScimPatchOp, ScimPatchRequest};
use scimsync_client::{RetryPolicy, ScimAuth, ScimClient, ScimClientError};

// ═══════════════════════════════════════════════════════════════════════════
// Discovery
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_health_check_success_sends_bearer_token() {
    let server = MockScimServer::new().await;
    server.mock_service_provider_config().await;

    let result = server.client().health_check().await;

    assert!(result.healthy, "{:?}", result.error);
    assert!(result.service_provider_config.unwrap().patch.supported);
}

#[tokio::test]
async fn test_health_check_failure_401() {
    let server = MockScimServer::new().await;
    server
        .mock_error("GET", "/ServiceProviderConfig", 401, "invalid token")
        .await;

    let result = server.client().health_check().await;

    assert!(!result.healthy);
    assert!(result.service_provider_config.is_none());
    assert!(result.error.unwrap().contains("invalid token"));
}

#[tokio::test]
async fn test_health_check_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ServiceProviderConfig"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let client = ScimClient::with_http_client(
        server.uri(),
        ScimAuth::bearer(TEST_TOKEN.to_string()),
        http_client,
    )
    .with_retry_policy(RetryPolicy::none());

    let result = client.health_check().await;
    assert!(!result.healthy);
    assert!(result.error.is_some());
}

#[tokio::test]
async fn test_refused_connection_is_unreachable() {
    // Bind then drop to get a local port nobody listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ScimClient::new(
        format!("http://{addr}"),
        ScimAuth::bearer(TEST_TOKEN.to_string()),
        Duration::from_secs(5),
    )
    .unwrap()
    .with_retry_policy(RetryPolicy::none());

    let result = client.get_group("g1").await;

    match result {
        Err(ref e @ ScimClientError::Unreachable(_)) => assert!(e.is_retryable()),
        other => panic!("expected Unreachable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_refused_connection_is_retried() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ScimClient::new(
        format!("http://{addr}"),
        ScimAuth::bearer(TEST_TOKEN.to_string()),
        Duration::from_secs(5),
    )
    .unwrap()
    .with_retry_policy(RetryPolicy::new(1, Duration::ZERO));

    let result = client.get_group("g1").await;

    match result {
        Err(ScimClientError::MaxRetriesExceeded { attempts, message }) => {
            assert_eq!(attempts, 2);
            assert!(message.contains("Target unreachable"), "{message}");
        }
        other => panic!("expected MaxRetriesExceeded, got {other:?}"),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Pagination
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_list_users_follows_pages() {
    let server = MockScimServer::new().await;
    let users = (1..=5)
        .map(|i| scim_user(&format!("u{i}"), &format!("user{i}@example.com"), None, &[]))
        .collect();
    server.mock_list("Users", users, 2).await;

    let client = server.client().with_page_size(2);
    let listed = client.list_users().await.unwrap();

    let names: Vec<&str> = listed.iter().map(|u| u.user_name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "user1@example.com",
            "user2@example.com",
            "user3@example.com",
            "user4@example.com",
            "user5@example.com"
        ]
    );
    assert_eq!(server.requests_to("GET", "/Users").await.len(), 3);
}

#[tokio::test]
async fn test_list_requests_default_page_size() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Groups"))
        .and(query_param("startIndex", "1"))
        .and(query_param("count", "100"))
        .and(header("Accept", "application/scim+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_response(
            vec![scim_group("g1", "Engineering", Some("src-1"))],
            1,
            1,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = ScimClient::with_http_client(
        server.uri(),
        ScimAuth::bearer(TEST_TOKEN.to_string()),
        reqwest::Client::new(),
    );
    let groups = client.list_groups().await.unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].external_id.as_deref(), Some("src-1"));
}

#[tokio::test]
async fn test_empty_page_ends_listing() {
    let server = MockServer::start().await;
    // Misreported total: the server claims more than it returns.
    Mock::given(method("GET"))
        .and(path("/Users"))
        .and(query_param("startIndex", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_response(
            vec![scim_user("u1", "a@example.com", None, &[])],
            10,
            1,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Users"))
        .and(query_param("startIndex", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_response(vec![], 10, 2)))
        .mount(&server)
        .await;

    let client = ScimClient::with_http_client(
        server.uri(),
        ScimAuth::bearer(TEST_TOKEN.to_string()),
        reqwest::Client::new(),
    );
    let users = client.list_users().await.unwrap();
    assert_eq!(users.len(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// Error mapping
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_404_returns_not_found_with_detail() {
    let server = MockScimServer::new().await;
    server
        .mock_error("GET", "/Users/missing", 404, "User not found")
        .await;

    let result = server.client().get_user("missing").await;

    match result {
        Err(ScimClientError::NotFound(detail)) => assert_eq!(detail, "User not found"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_409_returns_conflict_without_retry() {
    let server = MockScimServer::new().await;
    server
        .mock_error("POST", "/Groups", 409, "Group already exists")
        .await;

    let group = ScimGroup {
        display_name: "Engineering".into(),
        ..Default::default()
    };
    let result = server.client().create_group(&group).await;

    assert!(matches!(result, Err(ScimClientError::Conflict(_))));
    assert_eq!(server.requests_to("POST", "/Groups").await.len(), 1);
}

#[tokio::test]
async fn test_403_is_auth_error() {
    let server = MockScimServer::new().await;
    server.mock_error("DELETE", "/Groups/g1", 403, "forbidden").await;

    let result = server.client().delete_group("g1").await;

    assert!(matches!(result, Err(ScimClientError::AuthError(_))));
}

#[tokio::test]
async fn test_400_keeps_status_and_detail() {
    let server = MockScimServer::new().await;
    server
        .mock_error("PATCH", "/Users/u1", 400, "invalidValue")
        .await;

    let patch = ScimPatchRequest::new(vec![ScimPatchOp {
        op: "replace".into(),
        path: None,
        value: json!({ "active": false }),
    }]);
    let result = server.client().patch_user("u1", &patch).await;

    match result {
        Err(ScimClientError::ScimError { status, detail }) => {
            assert_eq!(status, 400);
            assert_eq!(detail, "invalidValue");
        }
        other => panic!("expected ScimError, got {other:?}"),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Retry
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_server_error_is_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/Users/u1"))
        .respond_with(ResponseTemplate::new(503).set_body_json(error_body(503, "busy")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/Users/u1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = ScimClient::with_http_client(
        server.uri(),
        ScimAuth::bearer(TEST_TOKEN.to_string()),
        reqwest::Client::new(),
    )
    .with_retry_policy(RetryPolicy::new(3, Duration::ZERO));

    client.delete_user("u1").await.unwrap();
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_rate_limit_exhausts_retries() {
    let server = MockScimServer::new().await;
    Mock::given(method("GET"))
        .and(path("/Groups/g1"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .mount(server.server())
        .await;

    let result = server.client().get_group("g1").await;

    match result {
        Err(ScimClientError::MaxRetriesExceeded { attempts, .. }) => assert_eq!(attempts, 3),
        other => panic!("expected MaxRetriesExceeded, got {other:?}"),
    }
}
