//! Google Workspace identity source for scimsync
//!
//! Crawls the Admin SDK Directory API with a service account acting on
//! behalf of a Workspace admin, and exposes the selected users and groups
//! through [`scimsync_core::IdentitySource`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use scimsync_core::IdentitySource;
//! use scimsync_google::{GoogleCredentials, GoogleEndpoint};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let key = std::fs::read("service-account.json")?;
//! let credentials = GoogleCredentials::from_json(&key)?;
//! let mut endpoint = GoogleEndpoint::from_credentials(
//!     credentials,
//!     "admin@example.com",
//!     vec!["Engineering, sales@example.com".to_string()],
//!     Duration::from_secs(30),
//! )?;
//! endpoint.populate().await?;
//! println!("{} users selected", endpoint.users().count());
//! # Ok(())
//! # }
//! ```

mod auth;
mod credentials;
mod directory_client;
mod endpoint;
mod error;
pub mod models;

pub use auth::{TokenCache, DIRECTORY_SCOPES};
pub use credentials::{GoogleCredentials, DEFAULT_TOKEN_URI};
pub use directory_client::{DirectoryClient, DEFAULT_BASE_URL, USER_PAGE_SIZE};
pub use endpoint::{email_address, parse_scim_groups, GoogleEndpoint};
pub use error::{GoogleError, GoogleResult};
