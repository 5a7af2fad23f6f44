//! Log output setup shared by the carebook binaries.
//!
//! ```ignore
//! use carebook_core::tracing::{init_tracing, LogConfig};
//!
//! init_tracing(LogConfig::from_debug_flag(cli.debug))?;
//! ```
//!
//! `RUST_LOG` takes precedence over the configured level unless an explicit
//! filter directive is given.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Errors that can occur while installing the subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Single-line output without timestamps, for interactive use.
    #[default]
    Compact,
    /// Multi-line human-readable output.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level applied to carebook crates when `RUST_LOG` is unset.
    pub level: Level,
    pub format: LogFormat,
    /// Include file and line of each event.
    pub include_location: bool,
    /// Explicit filter directive; overrides both `level` and `RUST_LOG`.
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::Compact,
            include_location: false,
            filter: None,
        }
    }
}

impl LogConfig {
    /// Quiet by default; `debug` turns on debug output with locations.
    #[must_use]
    pub fn from_debug_flag(debug: bool) -> Self {
        if debug {
            Self {
                level: Level::DEBUG,
                include_location: true,
                ..Self::default()
            }
        } else {
            Self::default()
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    fn env_filter(&self) -> Result<EnvFilter, TracingError> {
        if let Some(ref directive) = self.filter {
            return Ok(EnvFilter::try_new(directive)?);
        }
        Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("carebook={}", self.level))))
    }
}

/// Installs the global subscriber. Call once at startup.
///
/// # Errors
///
/// Fails if a global subscriber is already installed or the filter
/// directive does not parse.
pub fn init_tracing(config: LogConfig) -> Result<(), TracingError> {
    let filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .without_time()
                .with_file(config.include_location)
                .with_line_number(config.include_location);
            tracing::subscriber::set_global_default(registry.with(layer))?;
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .pretty()
                .with_file(config.include_location)
                .with_line_number(config.include_location);
            tracing::subscriber::set_global_default(registry.with(layer))?;
        }
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_file(config.include_location)
                .with_line_number(config.include_location);
            tracing::subscriber::set_global_default(registry.with(layer))?;
        }
    }

    Ok(())
}
