//! Tracing subscriber setup.

use facemood::config::LogFormat;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Failed to install log bridge: {0}")]
    LogBridge(#[from] tracing_log::log::SetLoggerError),

    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Filter used when `RUST_LOG` is not set.
pub fn default_directives(debug: bool) -> &'static str {
    if debug {
        "facemood=debug,facemood_server=debug,tower_http=debug,info"
    } else {
        "facemood=info,facemood_server=info,tower_http=info,warn"
    }
}

fn env_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(debug)))
}

/// Installs the global subscriber and routes `log` records through it.
pub fn init(format: LogFormat, debug: bool) -> Result<(), TelemetryError> {
    tracing_log::LogTracer::init()?;

    let registry = Registry::default().with(env_filter(debug));
    match format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_current_span(true)),
        )?,
        LogFormat::Pretty => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().with_target(true)),
        )?,
    }
    Ok(())
}
