//! auth::errors
//!
//! Authentication error types.
//!
//! Error messages never contain token values.
//!
//! ```
//! use sitepush::auth::AuthError;
//!
//! let err = AuthError::NotAuthenticated("github.com".to_string());
//! assert!(err.to_string().contains("github.com"));
//! ```

use thiserror::Error;

/// Errors from authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token exists for the specified host.
    #[error("not authenticated for host '{0}'. Run 'sitepush auth' or set GITHUB_TOKEN.")]
    NotAuthenticated(String),

    /// A token was supplied but is unusable.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Error from secret storage.
    #[error("secret store error: {0}")]
    SecretStore(String),
}

impl AuthError {
    /// Check if this error can be resolved by running `sitepush auth`.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self,
            AuthError::NotAuthenticated(_) | AuthError::InvalidToken(_)
        )
    }
}

impl From<crate::secrets::SecretError> for AuthError {
    fn from(err: crate::secrets::SecretError) -> Self {
        AuthError::SecretStore(err.to_string())
    }
}
