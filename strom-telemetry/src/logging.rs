//! ## strom-telemetry::logging
//! **Global `tracing` subscriber**
//!
//! `RUST_LOG` wins when set; otherwise the configured directives apply.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

use strom_config::TelemetryConfig;

use crate::error::TelemetryError;

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the subscriber with default settings.
    pub fn init() -> Result<(), TelemetryError> {
        Self::init_with_config(&TelemetryConfig::default())
    }

    pub fn init_with_config(config: &TelemetryConfig) -> Result<(), TelemetryError> {
        let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
        let filter = build_filter(env.as_deref(), &config.log_filter)?;
        fmt()
            .with_env_filter(filter)
            .with_thread_names(config.thread_names)
            .with_span_events(FmtSpan::CLOSE)
            .try_init()
            .map_err(|_| TelemetryError::AlreadyInstalled)
    }
}

/// Parses `env` when present and non-empty, `fallback` otherwise.
fn build_filter(env: Option<&str>, fallback: &str) -> Result<EnvFilter, TelemetryError> {
    let directives = env.filter(|d| !d.trim().is_empty()).unwrap_or(fallback);
    EnvFilter::try_new(directives).map_err(|e| TelemetryError::Filter {
        directives: directives.to_owned(),
        reason: e.to_string(),
    })
}
