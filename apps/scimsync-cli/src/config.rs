//! Run configuration loaded from environment variables.
//!
//! Required variables must be present and valid, or the run stops before
//! touching either directory. A `.env` file in the working directory is
//! honoured when the binary loads it with `dotenvy` before calling
//! [`Config::from_env`].

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use scimsync_core::{DestructiveMode, SyncSettings};
use scimsync_google::parse_scim_groups;
use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::time::Duration;
use thiserror::Error;

pub const GOOGLE_CREDENTIALS: &str = "GOOGLE_CREDENTIALS";
pub const GOOGLE_ADMIN_ACCOUNT: &str = "GOOGLE_ADMIN_ACCOUNT";
pub const SCIM_GROUPS: &str = "SCIM_GROUPS";
pub const SCIM_URL: &str = "SCIM_URL";
pub const SCIM_TOKEN: &str = "SCIM_TOKEN";
pub const SCIM_VERBOSE: &str = "SCIM_VERBOSE";
pub const SCIM_DESTRUCTIVE: &str = "SCIM_DESTRUCTIVE";
pub const SCIM_UPDATE_USERS: &str = "SCIM_UPDATE_USERS";
pub const SCIM_REQUEST_TIMEOUT_SECS: &str = "SCIM_REQUEST_TIMEOUT_SECS";
pub const SCIM_MAX_RETRIES: &str = "SCIM_MAX_RETRIES";

const REQUIRED_VARS: [&str; 5] = [
    GOOGLE_CREDENTIALS,
    GOOGLE_ADMIN_ACCOUNT,
    SCIM_GROUPS,
    SCIM_URL,
    SCIM_TOKEN,
];

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Everything one sync run needs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Service account key JSON.
    pub google_credentials: SecretString,
    pub google_admin_account: String,
    /// Raw entries; split further by the Google source.
    pub scim_groups: Vec<String>,
    pub scim_url: String,
    pub scim_token: SecretString,
    pub verbose: bool,
    /// Negative: safe, zero: partial, positive: full.
    pub destructive: i32,
    pub update_users: bool,
    pub request_timeout: Duration,
    pub max_retries: u32,
}

impl Config {
    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or a value
    /// cannot be used.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| -> Result<String, ConfigError> {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingVar(name.to_string()))
        };

        let google_credentials = decode_credentials(&required(GOOGLE_CREDENTIALS)?)?;
        let google_admin_account = required(GOOGLE_ADMIN_ACCOUNT)?;

        let scim_groups = parse_scim_groups(&[required(SCIM_GROUPS)?]);
        if scim_groups.is_empty() {
            return Err(ConfigError::InvalidValue {
                var: SCIM_GROUPS.to_string(),
                message: "does not contain any valid groups".to_string(),
            });
        }

        let scim_url = required(SCIM_URL)?;
        let scim_token = SecretString::from(required(SCIM_TOKEN)?);

        let optional = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let verbose = optional(SCIM_VERBOSE)
            .and_then(|v| parse_bool(&v))
            .unwrap_or(false);
        let destructive = optional(SCIM_DESTRUCTIVE)
            .map(|v| v.trim().parse::<i32>().unwrap_or(-1))
            .unwrap_or(0);
        let update_users = optional(SCIM_UPDATE_USERS)
            .and_then(|v| parse_bool(&v))
            .unwrap_or(true);
        let request_timeout = Duration::from_secs(parse_number(
            SCIM_REQUEST_TIMEOUT_SECS,
            optional(SCIM_REQUEST_TIMEOUT_SECS),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        let max_retries = parse_number(
            SCIM_MAX_RETRIES,
            optional(SCIM_MAX_RETRIES),
            DEFAULT_MAX_RETRIES,
        )?;

        Ok(Self {
            google_credentials,
            google_admin_account,
            scim_groups,
            scim_url,
            scim_token,
            verbose,
            destructive,
            update_users,
            request_timeout,
            max_retries,
        })
    }

    /// Engine settings for this configuration.
    #[must_use]
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            verbose: self.verbose,
            update_users: self.update_users,
            destructive: DestructiveMode::from_level(self.destructive),
        }
    }

    /// Service account key bytes.
    #[must_use]
    pub fn credentials_json(&self) -> &[u8] {
        self.google_credentials.expose_secret().as_bytes()
    }
}

/// Accept raw JSON or base64 of it; either way it must look like a JSON object.
fn decode_credentials(raw: &str) -> Result<SecretString, ConfigError> {
    let decoded = BASE64
        .decode(raw.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| raw.to_string());
    if !decoded.trim_start().starts_with('{') {
        return Err(ConfigError::InvalidValue {
            var: GOOGLE_CREDENTIALS.to_string(),
            message: "does not appear to be valid JSON".to_string(),
        });
    }
    Ok(SecretString::from(decoded))
}

/// `true/false`, `1/0`, `yes/no`, `on/off`, case-insensitive.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "t" | "y" => Some(true),
        "false" | "0" | "no" | "off" | "f" | "n" => Some(false),
        _ => None,
    }
}

fn parse_number<T: std::str::FromStr>(
    var: &str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|e| ConfigError::InvalidValue {
            var: var.to_string(),
            message: format!("{e}"),
        }),
    }
}

/// Whether every required variable is set.
#[must_use]
pub fn is_env_config_available() -> bool {
    REQUIRED_VARS
        .iter()
        .all(|name| env::var(name).map(|v| !v.is_empty()).unwrap_or(false))
}

/// Which configuration source a run would use.
#[must_use]
pub fn config_source_description() -> &'static str {
    if is_env_config_available() {
        "Using environment variable configuration"
    } else {
        "No valid configuration source found"
    }
}
