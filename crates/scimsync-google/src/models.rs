//! Admin SDK Directory v1 resources, reduced to the fields the sync reads.

use scimsync_core::SourceUser;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleName {
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleUser {
    pub id: String,
    #[serde(default)]
    pub primary_email: String,
    #[serde(default)]
    pub name: Option<GoogleName>,
    #[serde(default)]
    pub suspended: bool,
}

impl GoogleUser {
    /// Suspended accounts map to inactive users; a missing full name is
    /// rebuilt from the given and family names.
    #[must_use]
    pub fn to_source_user(&self) -> SourceUser {
        let name = self.name.clone().unwrap_or_default();
        let full_name = if name.full_name.is_empty() {
            format!("{} {}", name.given_name, name.family_name)
                .trim()
                .to_string()
        } else {
            name.full_name
        };
        SourceUser {
            id: self.id.clone(),
            email: self.primary_email.clone(),
            full_name,
            first_name: name.given_name,
            last_name: name.family_name,
            active: !self.suspended,
            groups: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleGroup {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleMember {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// `USER`, `GROUP` or `CUSTOMER`.
    #[serde(default, rename = "type")]
    pub member_type: Option<String>,
}

/// A page of any Directory list call; the item key differs per resource.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new", alias = "users", alias = "groups", alias = "members")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Error envelope of Google APIs.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
}
