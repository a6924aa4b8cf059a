//! Tracing subscriber setup

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::settings::LoggingSettings;

/// Filter used when `RUST_LOG` is unset
pub fn default_directive(settings: &LoggingSettings) -> String {
    if settings.verbose {
        "debug".to_string()
    } else {
        settings.level.clone()
    }
}

/// Install the global subscriber; `RUST_LOG` overrides the configured level.
///
/// Logs go to stderr so the one-shot binary keeps stdout for its output.
pub fn init_tracing(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(settings)));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
