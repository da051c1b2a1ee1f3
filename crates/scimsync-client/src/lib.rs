//! SCIM 2.0 target directory client
//!
//! HTTP implementation of [`scimsync_core::TargetDirectory`]: bearer
//! authentication, `startIndex`/`count` pagination, exponential backoff on
//! transient failures, and translation of sync patches into SCIM PATCH
//! operation lists.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use scimsync_client::{ScimAuth, ScimClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let auth = ScimAuth::bearer("token".to_string());
//! let client = ScimClient::new("https://scim.example.com/v2", auth, Duration::from_secs(30))?;
//! assert!(client.health_check().await.healthy);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
mod directory;
pub mod error;
pub mod mapper;
pub mod models;
pub mod retry;

pub use auth::ScimAuth;
pub use client::{HealthCheckResult, ScimClient};
pub use error::{ScimClientError, ScimClientResult};
pub use retry::RetryPolicy;
