//! secrets
//!
//! Secret storage abstraction for forge tokens.
//!
//! Secrets are stored through the [`SecretStore`] trait. The only provider is
//! [`FileSecretStore`] (`~/.sitepush/secrets.toml`); use [`create_store`] with
//! the configured provider name.
//!
//! ```ignore
//! use sitepush::secrets::{create_store, DEFAULT_PROVIDER};
//!
//! let store = create_store(DEFAULT_PROVIDER)?;
//! store.set("github.pat", token)?;
//! ```

mod file_store;
mod traits;

pub use file_store::FileSecretStore;
pub use traits::{SecretError, SecretStore};

/// The default secret store provider name.
pub const DEFAULT_PROVIDER: &str = "file";

/// Provider names accepted in configuration.
pub const VALID_PROVIDERS: &[&str] = &["file"];

/// Create a secret store based on the provider name.
pub fn create_store(provider: &str) -> Result<Box<dyn SecretStore>, SecretError> {
    match provider {
        "file" => Ok(Box::new(FileSecretStore::new()?)),
        other => Err(SecretError::ProviderNotAvailable(format!(
            "unknown secret provider: '{}' (valid: {})",
            other,
            VALID_PROVIDERS.join(", ")
        ))),
    }
}
