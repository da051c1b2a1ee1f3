//! scimsync command-line application
//!
//! Loads configuration from the environment, wires the Google Workspace
//! source to the SCIM target and runs the engine once, or serves an HTTP
//! trigger that does so on request.

pub mod config;
pub mod error;
pub mod logging;
pub mod runner;
pub mod server;

pub use config::{config_source_description, is_env_config_available, Config, ConfigError};
pub use error::{CliError, CliResult};
pub use runner::{ConfiguredSync, SyncTrigger};
