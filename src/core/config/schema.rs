//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$SITEPUSH_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/sitepush/config.toml`
//! 3. `~/.sitepush/config.toml` (canonical write location)
//!
//! # Site Config
//!
//! `sitepush.toml` in the site directory.
//!
//! # Validation
//!
//! Values are validated after parsing (branch names, store and provider
//! names, log levels, concurrency bounds).

use std::path::{Component, PathBuf};

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// store = "github"
///
/// [publish]
/// concurrency = 8
/// message = "Published with sitepush."
/// ignore = [".git", ".DS_Store"]
///
/// [author]
/// name = "Mona Lisa"
/// email = "mona@example.com"
///
/// [build]
/// command = "hugo"
/// args = ["--minify"]
/// output_dir = "public"
///
/// [logging]
/// level = "info"
/// format = "text"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Object store ("github" or "local")
    pub store: Option<String>,

    /// GitHub API base URL (GitHub Enterprise)
    pub api_base: Option<String>,

    /// Publish defaults
    pub publish: Option<PublishDefaults>,

    /// Commit author used instead of the authenticated user
    pub author: Option<AuthorConfig>,

    /// Site build settings
    pub build: Option<BuildConfig>,

    /// Secret storage settings
    pub secrets: Option<SecretsConfig>,

    /// Log output settings
    pub logging: Option<LoggingConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(store) = &self.store {
            let valid = crate::forge::valid_forge_names();
            if !valid.contains(&store.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid store '{}', must be one of: {}",
                    store,
                    valid.join(", ")
                )));
            }
        }

        if let Some(api_base) = &self.api_base {
            if !api_base.starts_with("http://") && !api_base.starts_with("https://") {
                return Err(ConfigError::InvalidValue(format!(
                    "api_base must be an http(s) URL, got '{}'",
                    api_base
                )));
            }
        }

        if let Some(publish) = &self.publish {
            publish.validate()?;
        }
        if let Some(author) = &self.author {
            author.validate()?;
        }
        if let Some(build) = &self.build {
            build.validate()?;
        }
        if let Some(secrets) = &self.secrets {
            secrets.validate()?;
        }
        if let Some(logging) = &self.logging {
            logging.validate()?;
        }
        Ok(())
    }
}

/// Site configuration (`sitepush.toml`).
///
/// # Example
///
/// ```toml
/// owner = "octocat"
/// repo = "octocat.github.io"
/// branch = "master"
/// source_branch = "source"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Repository owner (user or organization)
    pub owner: Option<String>,

    /// Repository name
    pub repo: Option<String>,

    /// Branch the built site is published to
    pub branch: Option<String>,

    /// Branch holding the site sources (deploy)
    pub source_branch: Option<String>,

    /// Bare repository used when the store is "local"
    pub local_repo: Option<PathBuf>,
}

impl SiteConfig {
    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [("branch", &self.branch), ("source_branch", &self.source_branch)] {
            if let Some(name) = value {
                BranchName::new(name).map_err(|e| {
                    ConfigError::InvalidValue(format!("invalid {}: {}", key, e))
                })?;
            }
        }
        for (key, value) in [("owner", &self.owner), ("repo", &self.repo)] {
            if let Some(value) = value {
                if value.is_empty() || value.contains('/') {
                    return Err(ConfigError::InvalidValue(format!(
                        "{} must be a single non-empty path segment",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Publish defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PublishDefaults {
    /// Concurrent store calls per stage
    pub concurrency: Option<usize>,

    /// Commit message
    pub message: Option<String>,

    /// Follow symbolic links instead of skipping them
    pub follow_symlinks: Option<bool>,

    /// Names excluded from the walk
    pub ignore: Option<Vec<String>>,

    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl PublishDefaults {
    /// Upper bound on concurrent store calls.
    pub const MAX_CONCURRENCY: usize = 64;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(n) = self.concurrency {
            if n == 0 || n > Self::MAX_CONCURRENCY {
                return Err(ConfigError::InvalidValue(format!(
                    "publish.concurrency must be between 1 and {}, got {}",
                    Self::MAX_CONCURRENCY,
                    n
                )));
            }
        }
        if let Some(message) = &self.message {
            if message.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "publish.message cannot be empty".to_string(),
                ));
            }
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "publish.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Commit author override.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AuthorConfig {
    pub name: Option<String>,
    pub email: Option<String>,
    pub login: Option<String>,
}

impl AuthorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_some() != self.email.is_some() {
            return Err(ConfigError::InvalidValue(
                "author.name and author.email must be set together".to_string(),
            ));
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(ConfigError::InvalidValue(format!(
                    "author.email '{}' is not an email address",
                    email
                )));
            }
        }
        Ok(())
    }
}

/// Site build settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Generator binary (default: "hugo")
    pub command: Option<String>,

    /// Extra arguments placed before `--source <dir>`
    pub args: Option<Vec<String>>,

    /// Build output directory relative to the sources (default: "public")
    pub output_dir: Option<PathBuf>,

    /// Directory under which deploy work directories are created
    pub work_root: Option<PathBuf>,
}

impl BuildConfig {
    /// The output directory must stay inside the work directory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(output_dir) = &self.output_dir {
            let escapes = output_dir
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
            if escapes || output_dir.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "build.output_dir must be a relative path inside the sources, got '{}'",
                    output_dir.display()
                )));
            }
        }
        Ok(())
    }
}

/// Secrets configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SecretsConfig {
    /// Provider to use ("file")
    pub provider: Option<String>,
}

impl SecretsConfig {
    /// Validate the secrets configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(provider) = &self.provider {
            let valid = crate::secrets::VALID_PROVIDERS;
            if !valid.contains(&provider.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid secrets provider '{}', must be one of: {}",
                    provider,
                    valid.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// Log output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error or off
    pub level: Option<String>,

    /// "text" or "json"
    pub format: Option<String>,
}

impl LoggingConfig {
    pub const VALID_LEVELS: &'static [&'static str] =
        &["trace", "debug", "info", "warn", "error", "off"];
    pub const VALID_FORMATS: &'static [&'static str] = &["text", "json"];

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(level) = &self.level {
            if !Self::VALID_LEVELS.contains(&level.to_lowercase().as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid logging.level '{}', must be one of: {}",
                    level,
                    Self::VALID_LEVELS.join(", ")
                )));
            }
        }
        if let Some(format) = &self.format {
            if !Self::VALID_FORMATS.contains(&format.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid logging.format '{}', must be one of: {}",
                    format,
                    Self::VALID_FORMATS.join(", ")
                )));
            }
        }
        Ok(())
    }
}
