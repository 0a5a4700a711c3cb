//! cli
//!
//! Command-line interface layer for sitepush.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and install logging
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. Handlers resolve settings (flags over site config
//! over global config), build a forge, and hand off to [`crate::publish`] or
//! [`crate::site`].

pub mod args;
pub mod commands;

pub use args::Cli;

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::core::config::{Config, ConfigLoadResult};
use crate::logging::{init_logging, LogSettings};
use crate::site::DeployError;
use crate::ui::output::{self, Verbosity};

/// Per-invocation state shared by command handlers.
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory commands run in (`--cwd` or the process directory)
    pub cwd: PathBuf,
    pub verbosity: Verbosity,
    /// Merged configuration
    pub config: Config,
}

impl Context {
    pub fn quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    /// Resolve a path given on the command line against `cwd`.
    pub fn resolve(&self, path: &std::path::Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let cwd = match &cli.cwd {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    let ConfigLoadResult { config, warnings } = match &cli.config {
        Some(path) => Config::load_with_global(path, Some(&cwd)),
        None => Config::load(Some(&cwd)),
    }
    .context("Failed to load configuration")?;

    let settings = LogSettings::resolve(
        config.log_level(),
        config.log_format(),
        cli.debug,
        cli.quiet,
    )?;
    init_logging(&settings)?;

    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);
    for warning in &warnings {
        output::warn(
            format!("{} ({})", warning.message, warning.path.display()),
            verbosity,
        );
    }

    let ctx = Context {
        cwd,
        verbosity,
        config,
    };

    commands::dispatch(cli.command, &ctx)
}

/// Exit status for a failed run.
pub const EXIT_FAILURE: u8 = 1;

/// Exit status when a deploy could not clean up after itself.
pub const EXIT_FATAL: u8 = 3;

/// Map a failed run to its exit status.
///
/// A fatal deploy error is found even under added context.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    let fatal = err
        .downcast_ref::<DeployError>()
        .map(DeployError::is_fatal)
        .unwrap_or(false);
    if fatal {
        EXIT_FATAL
    } else {
        EXIT_FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    use anyhow::Context as _;

    use crate::site::BuildError;

    fn cleanup_failure() -> DeployError {
        DeployError::Cleanup {
            path: PathBuf::from("/tmp/sitepush-x"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            prior: None,
        }
    }

    #[test]
    fn cleanup_failure_is_fatal() {
        let err = anyhow::Error::from(cleanup_failure());
        assert_eq!(exit_code(&err), EXIT_FATAL);
    }

    #[test]
    fn cleanup_failure_under_context_is_fatal() {
        let err = Err::<(), _>(cleanup_failure())
            .context("Failed to deploy")
            .unwrap_err();
        assert_eq!(exit_code(&err), EXIT_FATAL);
    }

    #[test]
    fn build_failure_is_ordinary() {
        let err = Err::<(), _>(DeployError::Build(BuildError::MissingOutput("public".into())))
            .context("Failed to deploy")
            .unwrap_err();
        assert_eq!(exit_code(&err), EXIT_FAILURE);
    }

    #[test]
    fn other_errors_are_ordinary() {
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), EXIT_FAILURE);
    }
}
