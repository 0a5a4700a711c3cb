//! forge::factory
//!
//! Forge selection and creation.
//!
//! Commands use [`create_forge`] instead of constructing a specific forge, so
//! the publish pipeline only ever sees `dyn Forge`.
//!
//! # Example
//!
//! ```ignore
//! use sitepush::forge::{create_forge, ForgeOptions, ForgeProvider};
//!
//! let options = ForgeOptions::github("octocat", "octocat.github.io");
//! let forge = create_forge(&options, Some(token_provider))?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::github::{GitHubForge, DEFAULT_API_BASE, DEFAULT_TIMEOUT};
use super::local::LocalForge;
use super::traits::{Forge, ForgeError};
use crate::auth::TokenProvider;

/// Supported object store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForgeProvider {
    /// GitHub git data API
    #[default]
    GitHub,
    /// Bare git repository on disk
    Local,
}

impl ForgeProvider {
    /// Get all available providers.
    pub fn all() -> &'static [ForgeProvider] {
        &[ForgeProvider::GitHub, ForgeProvider::Local]
    }

    /// Get the provider name as used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            ForgeProvider::GitHub => "github",
            ForgeProvider::Local => "local",
        }
    }

    /// Parse a provider from a string (case-insensitive).
    ///
    /// ```
    /// use sitepush::forge::ForgeProvider;
    ///
    /// assert_eq!(ForgeProvider::parse("GitHub"), Some(ForgeProvider::GitHub));
    /// assert_eq!(ForgeProvider::parse("local"), Some(ForgeProvider::Local));
    /// assert_eq!(ForgeProvider::parse("gitea"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "github" => Some(ForgeProvider::GitHub),
            "local" => Some(ForgeProvider::Local),
            _ => None,
        }
    }
}

impl std::fmt::Display for ForgeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Where and how to reach the object store.
#[derive(Debug, Clone)]
pub struct ForgeOptions {
    pub provider: ForgeProvider,
    /// Repository owner (GitHub only)
    pub owner: String,
    /// Repository name (GitHub only)
    pub repo: String,
    /// API base URL (GitHub only)
    pub api_base: String,
    /// Repository path (local only)
    pub local_path: Option<PathBuf>,
    /// Per-request timeout (GitHub only)
    pub timeout: Duration,
}

impl ForgeOptions {
    /// Options for a repository on github.com.
    pub fn github(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            provider: ForgeProvider::GitHub,
            owner: owner.into(),
            repo: repo.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            local_path: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Options for a bare repository at `path`.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            provider: ForgeProvider::Local,
            owner: String::new(),
            repo: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            local_path: Some(path.into()),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Create a forge for the configured provider.
///
/// # Errors
///
/// - `ForgeError::AuthRequired` if GitHub is selected without a token provider
/// - `ForgeError::InvalidRequest` if required options are missing
/// - `ForgeError::Storage` if the local repository cannot be opened
pub fn create_forge(
    options: &ForgeOptions,
    token_provider: Option<Arc<dyn TokenProvider>>,
) -> Result<Box<dyn Forge>, ForgeError> {
    match options.provider {
        ForgeProvider::GitHub => {
            if options.owner.is_empty() || options.repo.is_empty() {
                return Err(ForgeError::InvalidRequest(
                    "GitHub store needs both owner and repo".into(),
                ));
            }
            let provider = token_provider.ok_or(ForgeError::AuthRequired)?;
            let forge = GitHubForge::with_api_base(
                provider,
                options.owner.clone(),
                options.repo.clone(),
                options.api_base.clone(),
                options.timeout,
            )?;
            Ok(Box::new(forge))
        }
        ForgeProvider::Local => {
            let path = options.local_path.as_ref().ok_or_else(|| {
                ForgeError::InvalidRequest("local store needs a repository path".into())
            })?;
            Ok(Box::new(LocalForge::open_or_init(path)?))
        }
    }
}

/// Valid store names for configuration validation.
pub fn valid_forge_names() -> &'static [&'static str] {
    &["github", "local"]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;
    use tempfile::TempDir;

    mod forge_provider {
        use super::*;

        #[test]
        fn all_matches_valid_names() {
            let names: Vec<_> = ForgeProvider::all().iter().map(|p| p.name()).collect();
            assert_eq!(names, valid_forge_names());
        }

        #[test]
        fn parse_is_case_insensitive() {
            assert_eq!(ForgeProvider::parse("GITHUB"), Some(ForgeProvider::GitHub));
            assert_eq!(ForgeProvider::parse("Local"), Some(ForgeProvider::Local));
            assert_eq!(ForgeProvider::parse(""), None);
        }

        #[test]
        fn display() {
            assert_eq!(format!("{}", ForgeProvider::Local), "local");
        }
    }

    mod create_forge {
        use super::*;

        #[test]
        fn github_with_token() {
            let provider: Arc<dyn TokenProvider> =
                Arc::new(StaticTokenProvider::new("ghp_x", "github.com"));
            let forge = create_forge(&ForgeOptions::github("o", "r"), Some(provider)).unwrap();
            assert_eq!(forge.name(), "github");
        }

        #[test]
        fn github_without_token_requires_auth() {
            let result = create_forge(&ForgeOptions::github("o", "r"), None);
            assert!(matches!(result, Err(ForgeError::AuthRequired)));
        }

        #[test]
        fn github_without_repo_is_invalid() {
            let provider: Arc<dyn TokenProvider> =
                Arc::new(StaticTokenProvider::new("ghp_x", "github.com"));
            let result = create_forge(&ForgeOptions::github("o", ""), Some(provider));
            assert!(matches!(result, Err(ForgeError::InvalidRequest(_))));
        }

        #[test]
        fn local_creates_bare_repository() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("site.git");
            let forge = create_forge(&ForgeOptions::local(&path), None).unwrap();
            assert_eq!(forge.name(), "local");
            assert!(path.join("HEAD").exists());
        }

        #[test]
        fn local_without_path_is_invalid() {
            let mut options = ForgeOptions::local("unused");
            options.local_path = None;
            assert!(matches!(
                create_forge(&options, None),
                Err(ForgeError::InvalidRequest(_))
            ));
        }
    }
}
