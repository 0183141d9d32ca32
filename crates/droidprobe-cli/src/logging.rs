//! Log subscriber setup
//!
//! Log lines go to stderr so reports on stdout stay machine-readable.
//! `RUST_LOG` wins over the verbosity flags.

use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;

/// Filter from `RUST_LOG`, falling back to the verbosity default
#[must_use]
pub fn env_filter(config: &CliConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.log_directive()))
}

/// Install the global subscriber; a second call is a no-op
pub fn init_logging(config: &CliConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_writer(std::io::stderr);

    let installed = if config.json_logs {
        builder.json().try_init()
    } else {
        builder
            .compact()
            .with_target(config.verbosity.is_debug())
            .with_ansi(config.color.should_color())
            .try_init()
    };

    if installed.is_err() {
        tracing::debug!("log subscriber already installed");
    }
}
