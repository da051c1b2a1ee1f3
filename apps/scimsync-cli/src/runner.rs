//! Wiring a configured run: Google source, SCIM target, engine.

use async_trait::async_trait;
use scimsync_client::{RetryPolicy, ScimAuth, ScimClient};
use scimsync_core::{IdentitySource, ScimSync, SyncStat, TargetDirectory};
use scimsync_google::{GoogleCredentials, GoogleEndpoint};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::CliResult;

/// Something that can run one sync and report it.
#[async_trait]
pub trait SyncTrigger: Send + Sync {
    async fn run(&self) -> CliResult<SyncStat>;
}

/// Runs against the directories named in a [`Config`].
pub struct ConfiguredSync {
    config: Config,
}

impl ConfiguredSync {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SyncTrigger for ConfiguredSync {
    async fn run(&self) -> CliResult<SyncStat> {
        run_sync(&self.config).await
    }
}

/// The Google Workspace source described by `config`.
///
/// # Errors
///
/// Returns an error when the service account key cannot be used.
pub fn google_endpoint(config: &Config) -> CliResult<GoogleEndpoint> {
    let credentials = GoogleCredentials::from_json(config.credentials_json())?;
    Ok(GoogleEndpoint::from_credentials(
        credentials,
        config.google_admin_account.clone(),
        config.scim_groups.clone(),
        config.request_timeout,
    )?)
}

/// The SCIM target described by `config`.
///
/// # Errors
///
/// Returns an error when the HTTP client cannot be built.
pub fn scim_client(config: &Config) -> CliResult<ScimClient> {
    let client = ScimClient::new(
        config.scim_url.clone(),
        ScimAuth::bearer(config.scim_token.clone()),
        config.request_timeout,
    )?;
    Ok(client.with_retry_policy(RetryPolicy::new(
        config.max_retries,
        Duration::from_millis(500),
    )))
}

/// One complete run.
///
/// # Errors
///
/// Returns an error when setup fails or the run aborts.
pub async fn run_sync(config: &Config) -> CliResult<SyncStat> {
    let source = google_endpoint(config)?;
    let target = scim_client(config)?;
    let settings = config.sync_settings();

    if settings.verbose {
        if let Err(e) = source.test_connection().await {
            warn!(error = %e, "Google Workspace connection check failed");
        }
    }

    info!(
        scim_url = %target.base_url(),
        destructive = %settings.destructive,
        update_users = settings.update_users,
        "Starting sync"
    );
    let mut sync = ScimSync::new(source, target, settings);
    let stat = sync.sync().await?;
    info!(failures = stat.failure_count(), "Sync finished");
    Ok(stat)
}

/// Check both ends; every failure is reported, the first one is returned.
///
/// # Errors
///
/// Returns the first failing check.
pub async fn test_connection(config: &Config) -> CliResult<()> {
    let source = google_endpoint(config)?;
    let target = scim_client(config)?;

    let source_result = source.test_connection().await;
    match &source_result {
        Ok(()) => println!("Google Workspace: OK"),
        Err(e) => println!("Google Workspace: FAILED ({e})"),
    }
    let target_result = target.test_connection().await;
    match &target_result {
        Ok(()) => println!("SCIM endpoint {}: OK", target.base_url()),
        Err(e) => println!("SCIM endpoint {}: FAILED ({e})", target.base_url()),
    }

    source_result?;
    target_result?;
    Ok(())
}
