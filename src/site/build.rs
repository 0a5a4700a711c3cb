//! site::build
//!
//! Runs the static site generator over fetched sources.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Default generator binary.
pub const DEFAULT_BUILD_COMMAND: &str = "hugo";

/// Default directory the generator writes into, relative to the sources.
pub const DEFAULT_OUTPUT_DIR: &str = "public";

/// Errors from building a site.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The generator could not be started.
    #[error("cannot run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The generator exited unsuccessfully.
    #[error("'{command}' failed with {}: {stderr}", describe_status(.status))]
    Failed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// The generator finished without producing output.
    #[error("build produced no output directory at {0}")]
    MissingOutput(String),
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}

/// Builds a site in place.
#[async_trait]
pub trait SiteBuilder: Send + Sync {
    async fn build(&self, source: &Path) -> Result<(), BuildError>;
}

/// Runs `<command> <args...> --source <dir>`.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    command: String,
    args: Vec<String>,
}

impl CommandBuilder {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_BUILD_COMMAND, Vec::new())
    }
}

#[async_trait]
impl SiteBuilder for CommandBuilder {
    async fn build(&self, source: &Path) -> Result<(), BuildError> {
        debug!(command = %self.command, args = ?self.args, source = %source.display(), "running site build");
        let output = Command::new(&self.command)
            .args(&self.args)
            .arg("--source")
            .arg(source)
            .output()
            .await
            .map_err(|source| BuildError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(BuildError::Failed {
                command: self.command.clone(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        info!(command = %self.command, "site built");
        Ok(())
    }
}
