//! OAuth2 service account authentication with domain-wide delegation.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::{GoogleCredentials, GoogleError, GoogleResult};

/// Read-only Admin SDK scopes needed to crawl users, groups and members.
pub const DIRECTORY_SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/admin.directory.user.readonly",
    "https://www.googleapis.com/auth/admin.directory.group.readonly",
    "https://www.googleapis.com/auth/admin.directory.group.member.readonly",
];

const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// JWT claims of the token request assertion.
#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    sub: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Returns true if the token is expired or will expire within the grace period.
    fn is_expired(&self, grace_period: Duration) -> bool {
        Utc::now() + grace_period >= self.expires_at
    }
}

/// Access tokens for one service account impersonating one admin account.
#[derive(Debug)]
pub struct TokenCache {
    credentials: GoogleCredentials,
    subject: String,
    http_client: reqwest::Client,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
    /// Refresh this long before expiry (default: 5 minutes).
    grace_period: Duration,
}

impl TokenCache {
    /// `subject` is the Workspace admin the service account acts as.
    pub fn new(credentials: GoogleCredentials, subject: impl Into<String>) -> Self {
        Self::with_http_client(credentials, subject, reqwest::Client::new())
    }

    pub fn with_http_client(
        credentials: GoogleCredentials,
        subject: impl Into<String>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            credentials,
            subject: subject.into(),
            http_client,
            cached_token: Arc::new(RwLock::new(None)),
            grace_period: Duration::minutes(5),
        }
    }

    /// Gets a valid access token, refreshing if necessary.
    #[instrument(skip(self), fields(subject = %self.subject))]
    pub async fn get_token(&self) -> GoogleResult<String> {
        {
            let cache = self.cached_token.read().await;
            if let Some(ref token) = *cache {
                if !token.is_expired(self.grace_period) {
                    debug!("Using cached token");
                    return Ok(token.access_token.clone());
                }
            }
        }

        debug!("Refreshing access token");
        let new_token = self.acquire_token().await?;
        {
            let mut cache = self.cached_token.write().await;
            *cache = Some(new_token.clone());
        }
        Ok(new_token.access_token)
    }

    /// Invalidates the cached token, forcing a refresh on next use.
    pub async fn invalidate(&self) {
        let mut cache = self.cached_token.write().await;
        *cache = None;
    }

    /// Signed RS256 assertion for the token endpoint.
    fn assertion(&self, now: DateTime<Utc>) -> GoogleResult<String> {
        let claims = AssertionClaims {
            iss: self.credentials.client_email.clone(),
            sub: self.subject.clone(),
            scope: DIRECTORY_SCOPES.join(" "),
            aud: self.credentials.token_uri.clone(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.credentials.private_key_id.clone();
        let key = EncodingKey::from_rsa_pem(
            self.credentials.private_key.expose_secret().as_bytes(),
        )
        .map_err(|e| GoogleError::Config(format!("Invalid service account private key: {e}")))?;
        Ok(jsonwebtoken::encode(&header, &claims, &key)?)
    }

    #[instrument(skip(self))]
    async fn acquire_token(&self) -> GoogleResult<CachedToken> {
        let assertion = self.assertion(Utc::now())?;
        let params = [("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())];

        let response = self
            .http_client
            .post(&self.credentials.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| GoogleError::Auth(format!("Token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GoogleError::Auth(format!(
                "Token request failed with status {status}: {body}"
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| GoogleError::Auth(format!("Failed to parse token response: {e}")))?;

        let expires_at = Utc::now() + Duration::seconds(token_response.expires_in);
        debug!(
            "Acquired new token, expires at {}",
            expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        Ok(CachedToken {
            access_token: token_response.access_token,
            expires_at,
        })
    }
}
