//! auth
//!
//! Bearer token resolution for forge adapters.
//!
//! # Architecture
//!
//! The GitHub forge asks a [`TokenProvider`] for a token on every request.
//! OAuth exchange is handled elsewhere; this crate consumes personal access
//! tokens or tokens minted by an upstream service:
//!
//! - [`StaticTokenProvider`]: a token handed over directly (`--token`, tests)
//! - [`StoredTokenProvider`]: `GITHUB_TOKEN` from the environment, falling
//!   back to the token saved by `sitepush auth` in the secret store

mod errors;

pub use errors::AuthError;

use crate::secrets::SecretStore;

/// Secret store key for the GitHub personal access token.
pub const GITHUB_TOKEN_KEY: &str = "github.pat";

/// Environment variable that overrides the stored token.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Trait for providing bearer tokens to forge adapters.
///
/// Implementors must never log or expose token values.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a usable bearer token.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotAuthenticated`] if no token exists
    /// - [`AuthError::SecretStore`] if the store cannot be read
    async fn bearer_token(&self) -> Result<String, AuthError>;

    /// Check if a token is available.
    fn is_authenticated(&self) -> bool;

    /// Get the host this provider authenticates for.
    fn host(&self) -> &str;
}

/// A provider around a token known up front.
pub struct StaticTokenProvider {
    token: String,
    host: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            host: host.into(),
        }
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        if self.token.trim().is_empty() {
            return Err(AuthError::InvalidToken("token is empty".into()));
        }
        Ok(self.token.clone())
    }

    fn is_authenticated(&self) -> bool {
        !self.token.trim().is_empty()
    }

    fn host(&self) -> &str {
        &self.host
    }
}

/// Resolves the token from `GITHUB_TOKEN`, then from the secret store.
///
/// The environment is read once at construction so a provider behaves the
/// same for every request of a publish.
pub struct StoredTokenProvider {
    host: String,
    env_token: Option<String>,
    store: Box<dyn SecretStore>,
}

impl StoredTokenProvider {
    /// Create a provider reading `GITHUB_TOKEN` and falling back to `store`.
    pub fn new(host: impl Into<String>, store: Box<dyn SecretStore>) -> Self {
        let env_token = std::env::var(GITHUB_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty());
        Self::with_env_token(host, store, env_token)
    }

    /// Create a provider with an explicit environment token (for tests).
    pub fn with_env_token(
        host: impl Into<String>,
        store: Box<dyn SecretStore>,
        env_token: Option<String>,
    ) -> Self {
        Self {
            host: host.into(),
            env_token,
            store,
        }
    }
}

impl std::fmt::Debug for StoredTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredTokenProvider")
            .field("host", &self.host)
            .field("has_env_token", &self.env_token.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl TokenProvider for StoredTokenProvider {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        if let Some(token) = &self.env_token {
            return Ok(token.clone());
        }
        self.store
            .get(GITHUB_TOKEN_KEY)?
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AuthError::NotAuthenticated(self.host.clone()))
    }

    fn is_authenticated(&self) -> bool {
        self.env_token.is_some() || self.store.exists(GITHUB_TOKEN_KEY).unwrap_or(false)
    }

    fn host(&self) -> &str {
        &self.host
    }
}
