//! logging
//!
//! Structured logging via `tracing`.
//!
//! Log lines go to stderr so command output on stdout stays scriptable.
//!
//! Priority order (highest to lowest):
//! 1. `--debug` / `--quiet`
//! 2. `SITEPUSH_LOG` (an `EnvFilter` directive) and `SITEPUSH_LOG_FORMAT`
//! 3. `[logging]` in the global config
//! 4. Defaults (`info`, text)

use thiserror::Error;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter directive environment variable.
pub const LOG_ENV: &str = "SITEPUSH_LOG";

/// Format override environment variable.
pub const LOG_FORMAT_ENV: &str = "SITEPUSH_LOG_FORMAT";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log directive '{directive}': {message}")]
    InvalidDirective { directive: String, message: String },

    #[error("invalid log format '{0}' (must be 'json' or 'text')")]
    InvalidFormat(String),

    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Result<Self, LoggingError> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(LoggingError::InvalidFormat(other.to_string())),
        }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// `EnvFilter` directive, e.g. `info` or `sitepush=debug`
    pub directive: String,
    pub format: LogFormat,
    pub ansi: bool,
}

impl LogSettings {
    /// Combine configured values with CLI flags and the environment.
    pub fn resolve(
        config_level: &str,
        config_format: &str,
        debug: bool,
        quiet: bool,
    ) -> Result<Self, LoggingError> {
        Self::resolve_with_env(
            config_level,
            config_format,
            debug,
            quiet,
            std::env::var(LOG_ENV).ok(),
            std::env::var(LOG_FORMAT_ENV).ok(),
        )
    }

    fn resolve_with_env(
        config_level: &str,
        config_format: &str,
        debug: bool,
        quiet: bool,
        env_directive: Option<String>,
        env_format: Option<String>,
    ) -> Result<Self, LoggingError> {
        let directive = if debug {
            "debug".to_string()
        } else if quiet {
            "error".to_string()
        } else if let Some(env) = env_directive.filter(|d| !d.trim().is_empty()) {
            env
        } else {
            config_level.to_lowercase()
        };

        let format = match env_format {
            Some(f) => LogFormat::parse(&f)?,
            None => LogFormat::parse(config_format)?,
        };

        Ok(Self {
            directive,
            format,
            ansi: format == LogFormat::Text,
        })
    }

    fn filter(&self) -> Result<EnvFilter, LoggingError> {
        EnvFilter::try_new(&self.directive).map_err(|e| LoggingError::InvalidDirective {
            directive: self.directive.clone(),
            message: e.to_string(),
        })
    }
}

/// Install the global subscriber.
pub fn init_logging(settings: &LogSettings) -> Result<(), LoggingError> {
    let filter = settings.filter()?;
    let base = Registry::default().with(filter);

    let result = match settings.format {
        LogFormat::Json => base
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Text => base
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(settings.ansi)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    result.map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}
