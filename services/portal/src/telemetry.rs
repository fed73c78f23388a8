//! services/portal/src/telemetry.rs
//!
//! Sets up `tracing` output for whoever embeds the portal.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Installs a global subscriber filtered at `config.log_level`.
///
/// Returns `false` when a global subscriber was already installed (e.g. by the
/// host application), in which case that one is left alone.
pub fn init_tracing(config: &Config) -> bool {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
