//! SCIM target authentication with a static bearer token.

use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};

/// Bearer credentials for a SCIM target.
///
/// The [`Debug`] impl redacts the token so it never reaches log output.
#[derive(Clone)]
pub struct ScimAuth {
    token: SecretString,
}

impl std::fmt::Debug for ScimAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScimAuth")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl ScimAuth {
    /// Authenticate with the given bearer token.
    #[must_use]
    pub fn bearer(token: impl Into<SecretString>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Attach the `Authorization` header to a request.
    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(self.token.expose_secret())
    }
}
