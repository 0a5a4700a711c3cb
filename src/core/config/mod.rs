//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Sitepush has two configuration scopes:
//! - **Global**: User-level settings (store, author, build, logging)
//! - **Site**: Where a site is published (`sitepush.toml`)
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Site config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$SITEPUSH_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/sitepush/config.toml`
//! 3. `~/.sitepush/config.toml` (canonical write location)
//!
//! # Site Config Locations
//!
//! Searched in order, relative to the site directory:
//! 1. `sitepush.toml` (canonical)
//! 2. `.sitepush.toml` (compatibility, warns)
//!
//! # Example
//!
//! ```no_run
//! use sitepush::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("."))).unwrap();
//! let config = result.config;
//!
//! println!("Publishing to {}", config.branch());
//! println!("Concurrency: {}", config.concurrency());
//! ```

pub mod schema;

pub use schema::{
    AuthorConfig, BuildConfig, GlobalConfig, LoggingConfig, PublishDefaults, SecretsConfig,
    SiteConfig,
};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Canonical site config file name.
pub const SITE_CONFIG_FILE: &str = "sitepush.toml";

/// Branch published to when nothing is configured.
pub const DEFAULT_BRANCH: &str = "gh-pages";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("unknown config key '{0}'")]
    UnknownKey(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from all sources.
///
/// Accessors apply defaults so callers never deal with `Option` for
/// settings that have one.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Site configuration (if a site file was found)
    pub site: Option<SiteConfig>,
    /// Path to the global config file (if loaded)
    global_path: Option<PathBuf>,
    /// Path to the site config file (if loaded)
    site_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `site_dir` is provided, also loads the site config found there.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or hold
    /// invalid values. Missing config files are not an error.
    pub fn load(site_dir: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let (global, global_path) = Self::load_global()?;
        Self::assemble(global, global_path, site_dir)
    }

    /// Load configuration with an explicit global config file.
    pub fn load_with_global(
        global_file: &Path,
        site_dir: Option<&Path>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let global = Self::read_toml(global_file)?;
        Self::assemble(global, Some(global_file.to_path_buf()), site_dir)
    }

    fn assemble(
        global: GlobalConfig,
        global_path: Option<PathBuf>,
        site_dir: Option<&Path>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let (site, site_path) = match site_dir {
            Some(dir) => Self::load_site(dir, &mut warnings)?,
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref s) = site {
            s.validate()?;
        }

        Ok(ConfigLoadResult {
            config: Config {
                global,
                site,
                global_path,
                site_path,
            },
            warnings,
        })
    }

    /// Load global configuration from standard locations.
    fn load_global() -> Result<(GlobalConfig, Option<PathBuf>), ConfigError> {
        // 1. Check $SITEPUSH_CONFIG
        if let Ok(path) = std::env::var("SITEPUSH_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = Self::read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 2. Check $XDG_CONFIG_HOME/sitepush/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("sitepush/config.toml");
            if path.exists() {
                let config = Self::read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 3. Check ~/.sitepush/config.toml
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".sitepush/config.toml");
            if path.exists() {
                let config = Self::read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((GlobalConfig::default(), None))
    }

    /// Load site configuration from a site directory.
    fn load_site(
        site_dir: &Path,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<(Option<SiteConfig>, Option<PathBuf>), ConfigError> {
        let canonical = Self::site_config_path(site_dir);
        if canonical.exists() {
            let config = Self::read_toml(&canonical)?;
            return Ok((Some(config), Some(canonical)));
        }

        let hidden = site_dir.join(".sitepush.toml");
        if hidden.exists() {
            warnings.push(ConfigWarning {
                message: format!(
                    "Using deprecated config location. Please rename to '{}'",
                    canonical.display()
                ),
                path: hidden.clone(),
            });
            let config = Self::read_toml(&hidden)?;
            return Ok((Some(config), Some(hidden)));
        }

        Ok((None, None))
    }

    /// Read and parse a TOML config file.
    fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the canonical path for global config.
    ///
    /// Returns `~/.sitepush/config.toml`.
    pub fn global_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".sitepush/config.toml"))
    }

    /// Get the canonical path for site config in `site_dir`.
    pub fn site_config_path(site_dir: &Path) -> PathBuf {
        site_dir.join(SITE_CONFIG_FILE)
    }

    /// Write site config atomically.
    pub fn write_site(site_dir: &Path, config: &SiteConfig) -> Result<PathBuf, ConfigError> {
        config.validate()?;
        let path = Self::site_config_path(site_dir);
        Self::write_config_atomic(&path, config)?;
        Ok(path)
    }

    /// Write a config file atomically (temp file, then rename).
    fn write_config_atomic<T: serde::Serialize>(
        path: &Path,
        config: &T,
    ) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Object store name. Defaults to "github".
    pub fn store(&self) -> &str {
        self.global.store.as_deref().unwrap_or("github")
    }

    /// GitHub API base URL.
    pub fn api_base(&self) -> &str {
        self.global
            .api_base
            .as_deref()
            .unwrap_or(crate::forge::github::DEFAULT_API_BASE)
    }

    pub fn owner(&self) -> Option<&str> {
        self.site.as_ref().and_then(|s| s.owner.as_deref())
    }

    pub fn repo(&self) -> Option<&str> {
        self.site.as_ref().and_then(|s| s.repo.as_deref())
    }

    /// Target branch. Defaults to "gh-pages".
    pub fn branch(&self) -> &str {
        self.site
            .as_ref()
            .and_then(|s| s.branch.as_deref())
            .unwrap_or(DEFAULT_BRANCH)
    }

    /// Source branch for deploys. No default.
    pub fn source_branch(&self) -> Option<&str> {
        self.site.as_ref().and_then(|s| s.source_branch.as_deref())
    }

    /// Bare repository for the local store.
    pub fn local_repo(&self) -> Option<&Path> {
        self.site.as_ref().and_then(|s| s.local_repo.as_deref())
    }

    fn publish(&self) -> Option<&PublishDefaults> {
        self.global.publish.as_ref()
    }

    /// Concurrent store calls per stage. Defaults to 8.
    pub fn concurrency(&self) -> usize {
        self.publish()
            .and_then(|p| p.concurrency)
            .unwrap_or(crate::publish::DEFAULT_CONCURRENCY)
    }

    /// Commit message.
    pub fn message(&self) -> &str {
        self.publish()
            .and_then(|p| p.message.as_deref())
            .unwrap_or(crate::publish::DEFAULT_MESSAGE)
    }

    /// Whether the walk follows symbolic links. Defaults to `false`.
    pub fn follow_symlinks(&self) -> bool {
        self.publish()
            .and_then(|p| p.follow_symlinks)
            .unwrap_or(false)
    }

    /// Names excluded from the walk. Defaults to `[".git"]`.
    pub fn ignore(&self) -> Vec<String> {
        self.publish()
            .and_then(|p| p.ignore.clone())
            .unwrap_or_else(|| crate::publish::WalkOptions::default().ignore)
    }

    /// Per-request timeout for store and download calls.
    pub fn timeout(&self) -> Duration {
        self.publish()
            .and_then(|p| p.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(crate::forge::github::DEFAULT_TIMEOUT)
    }

    /// Configured commit author, if both name and email are set.
    pub fn author(&self) -> Option<(&str, &str, Option<&str>)> {
        let author = self.global.author.as_ref()?;
        Some((
            author.name.as_deref()?,
            author.email.as_deref()?,
            author.login.as_deref(),
        ))
    }

    fn build(&self) -> Option<&BuildConfig> {
        self.global.build.as_ref()
    }

    /// Site generator binary. Defaults to "hugo".
    pub fn build_command(&self) -> &str {
        self.build()
            .and_then(|b| b.command.as_deref())
            .unwrap_or(crate::site::DEFAULT_BUILD_COMMAND)
    }

    pub fn build_args(&self) -> Vec<String> {
        self.build().and_then(|b| b.args.clone()).unwrap_or_default()
    }

    /// Build output directory, relative to the sources. Defaults to "public".
    pub fn output_dir(&self) -> PathBuf {
        self.build()
            .and_then(|b| b.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(crate::site::DEFAULT_OUTPUT_DIR))
    }

    /// Where deploy work directories go. Defaults to the system temp dir.
    pub fn work_root(&self) -> PathBuf {
        self.build()
            .and_then(|b| b.work_root.clone())
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Secrets provider. Defaults to "file".
    pub fn secrets_provider(&self) -> &str {
        self.global
            .secrets
            .as_ref()
            .and_then(|s| s.provider.as_deref())
            .unwrap_or(crate::secrets::DEFAULT_PROVIDER)
    }

    /// Log level. Defaults to "info".
    pub fn log_level(&self) -> &str {
        self.global
            .logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or("info")
    }

    /// Log format. Defaults to "text".
    pub fn log_format(&self) -> &str {
        self.global
            .logging
            .as_ref()
            .and_then(|l| l.format.as_deref())
            .unwrap_or("text")
    }

    /// Effective settings as `(key, value)` pairs, defaults applied.
    ///
    /// Unset keys without a default are omitted.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = vec![
            ("store", self.store().to_string()),
            ("api_base", self.api_base().to_string()),
        ];
        if let Some(owner) = self.owner() {
            entries.push(("owner", owner.to_string()));
        }
        if let Some(repo) = self.repo() {
            entries.push(("repo", repo.to_string()));
        }
        entries.push(("branch", self.branch().to_string()));
        if let Some(source) = self.source_branch() {
            entries.push(("source_branch", source.to_string()));
        }
        if let Some(path) = self.local_repo() {
            entries.push(("local_repo", path.display().to_string()));
        }
        entries.extend([
            ("publish.concurrency", self.concurrency().to_string()),
            ("publish.message", self.message().to_string()),
            ("publish.follow_symlinks", self.follow_symlinks().to_string()),
            ("publish.ignore", self.ignore().join(",")),
            ("publish.timeout_secs", self.timeout().as_secs().to_string()),
        ]);
        if let Some((name, email, login)) = self.author() {
            entries.push(("author.name", name.to_string()));
            entries.push(("author.email", email.to_string()));
            if let Some(login) = login {
                entries.push(("author.login", login.to_string()));
            }
        }
        entries.extend([
            ("build.command", self.build_command().to_string()),
            ("build.args", self.build_args().join(" ")),
            ("build.output_dir", self.output_dir().display().to_string()),
            ("build.work_root", self.work_root().display().to_string()),
            ("secrets.provider", self.secrets_provider().to_string()),
            ("logging.level", self.log_level().to_string()),
            ("logging.format", self.log_format().to_string()),
        ]);
        entries
    }

    /// Look up one effective setting by its dotted key.
    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        if !KNOWN_KEYS.contains(&key) {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }
        Ok(self
            .entries()
            .into_iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v))
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded site config file.
    pub fn site_config_loaded_from(&self) -> Option<&Path> {
        self.site_path.as_deref()
    }
}

/// Every key `Config::get` understands.
pub const KNOWN_KEYS: &[&str] = &[
    "store",
    "api_base",
    "owner",
    "repo",
    "branch",
    "source_branch",
    "local_repo",
    "publish.concurrency",
    "publish.message",
    "publish.follow_symlinks",
    "publish.ignore",
    "publish.timeout_secs",
    "author.name",
    "author.email",
    "author.login",
    "build.command",
    "build.args",
    "build.output_dir",
    "build.work_root",
    "secrets.provider",
    "logging.level",
    "logging.format",
];
