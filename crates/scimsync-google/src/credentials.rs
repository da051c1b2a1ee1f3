//! Service account key file.

use secrecy::SecretString;
use serde::Deserialize;

use crate::{GoogleError, GoogleResult};

/// Default OAuth2 token endpoint for service accounts.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The fields of a service account JSON key that domain-wide delegation needs.
#[derive(Clone, Deserialize)]
pub struct GoogleCredentials {
    pub client_email: String,
    pub private_key: SecretString,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl GoogleCredentials {
    /// Parse a service account key as downloaded from the Cloud console.
    ///
    /// # Errors
    ///
    /// Returns [`GoogleError::Config`] when the document is not a service
    /// account key.
    pub fn from_json(bytes: &[u8]) -> GoogleResult<Self> {
        let credentials: Self = serde_json::from_slice(bytes)
            .map_err(|e| GoogleError::Config(format!("Invalid service account key: {e}")))?;
        if credentials.client_email.is_empty() {
            return Err(GoogleError::Config(
                "Service account key has no client_email".into(),
            ));
        }
        Ok(credentials)
    }
}

impl std::fmt::Debug for GoogleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCredentials")
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}
