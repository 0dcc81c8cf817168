//! Logging setup.
//!
//! Installs a `tracing-subscriber` fmt layer with an [`EnvFilter`]. The
//! `VAULTSCAN_LOG` environment variable overrides the level passed in,
//! using the usual directive syntax (`vaultscan_scanner=debug,info`).

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Environment variable holding filter directives
pub const LOG_ENV_VAR: &str = "VAULTSCAN_LOG";

static INIT: Once = Once::new();

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Later calls are no-ops.
///
/// An unparsable `default_level` falls back to `info`. If another global
/// subscriber is already set, it is left in place.
pub fn init(default_level: &str) {
    INIT.call_once(|| {
        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter(default_level))
            .with_target(true)
            .try_init();
        if installed.is_err() {
            tracing::debug!("Global subscriber already set; keeping it");
        }
    });
}
