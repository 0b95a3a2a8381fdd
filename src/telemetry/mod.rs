//! Log subscriber setup
//!
//! Both binaries log through `tracing`. The subscriber is a registry with an
//! [`EnvFilter`] and a single fmt layer:
//!
//! ```text
//! Registry
//!   ├── EnvFilter (RUST_LOG, else LOG_LEVEL)
//!   └── Fmt Layer (JSON for CloudWatch, or pretty for local runs)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use kagi_uploadr::config::LoggingConfig;
//! use kagi_uploadr::telemetry::init_subscriber;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! init_subscriber(&LoggingConfig::default())?;
//! tracing::info!("ready");
//! # Ok(())
//! # }
//! ```

use crate::config::{LogFormat, LoggingConfig};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Errors that can occur during subscriber initialization
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{0}': {1}")]
    InvalidFilter(String, String),

    #[error("Failed to set global subscriber (may already be initialized): {0}")]
    AlreadyInitialized(String),
}

/// Build the level filter, preferring `RUST_LOG` over the configured level
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| TelemetryError::InvalidFilter(config.log_level.clone(), e.to_string())),
    }
}

/// Install the global subscriber
pub fn init_subscriber(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let env_filter = build_filter(config)?;

    match config.log_format {
        LogFormat::Json => {
            // CloudWatch adds its own timestamps and does not render ANSI
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_target(true)
                .with_ansi(false)
                .without_time();

            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer);

            tracing::subscriber::set_global_default(subscriber)
                .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_line_number(true);

            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer);

            tracing::subscriber::set_global_default(subscriber)
                .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;
        }
    }

    Ok(())
}
