//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins when set; otherwise the level follows the verbose flag.
//! JSON lines are meant for log aggregation when running as a service.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for the given verbosity.
#[must_use]
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug,hyper=info,reqwest=info"
    } else {
        "info"
    }
}

/// Initialize the global subscriber. Later calls are ignored.
pub fn init_logging(verbose: bool, json: bool) {
    let filter = default_filter(verbose);
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter_layer);
    let result = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .flatten_event(true),
            )
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };

    if result.is_ok() {
        tracing::debug!(filter = %filter, json, "Logging initialized");
    }
}

/// Initialize logging for tests (with simpler output).
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}
