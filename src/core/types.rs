//! core::types
//!
//! Strong types for publish domain concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated target branch name
//! - [`ObjectId`] - Content identifier returned by the object store
//! - [`RefName`] - Fully qualified branch reference
//! - [`CommitAuthor`] - Author/committer record attached to commits
//!
//! # Validation
//!
//! These types enforce validity at construction time, so a publish can never
//! be started against a malformed branch or record a malformed identifier.
//!
//! # Examples
//!
//! ```
//! use sitepush::core::types::{BranchName, ObjectId, RefName};
//!
//! let branch = BranchName::new("gh-pages").unwrap();
//! let id = ObjectId::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! assert_eq!(RefName::for_branch(&branch).as_str(), "refs/heads/gh-pages");
//!
//! assert!(BranchName::new("bad..name").is_err());
//! assert!(ObjectId::new("not-a-sha").is_err());
//! # let _ = id;
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidObjectId(String),
}

/// A validated branch name.
///
/// Follows the subset of `git check-ref-format` rules that matter for a
/// publish target: non-empty, no `..`, `@{`, `//`, no leading `.`/`-`, no
/// trailing `/` or `.lock`, no spaces, control or glob characters.
///
/// ```
/// use sitepush::core::types::BranchName;
///
/// assert!(BranchName::new("gh-pages").is_ok());
/// assert!(BranchName::new("site/public").is_ok());
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("has space").is_err());
/// assert!(BranchName::new("main.lock").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name).map_err(|reason| TypeError::InvalidBranchName(reason.into()))?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), &'static str> {
        const FORBIDDEN: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];

        if name.is_empty() {
            return Err("branch name cannot be empty");
        }
        if name == "@" {
            return Err("branch name cannot be '@'");
        }
        if name.starts_with('-') {
            return Err("branch name cannot start with '-'");
        }
        if name.ends_with('/') {
            return Err("branch name cannot end with '/'");
        }
        if name.contains("..") || name.contains("@{") || name.contains("//") {
            return Err("branch name cannot contain '..', '@{' or '//'");
        }
        if name.chars().any(|c| c.is_ascii_control() || FORBIDDEN.contains(&c)) {
            return Err("branch name contains a forbidden character");
        }
        for component in name.split('/') {
            if component.starts_with('.') {
                return Err("path component cannot start with '.'");
            }
            if component.ends_with(".lock") {
                return Err("path component cannot end with '.lock'");
            }
        }
        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A content identifier assigned by the object store.
///
/// Accepts SHA-1 (40 hex chars, GitHub and git) and SHA-256 (64 hex chars)
/// forms, normalized to lowercase.
///
/// ```
/// use sitepush::core::types::ObjectId;
///
/// let id = ObjectId::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(id.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(id.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Create a new validated object id.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into().to_ascii_lowercase();
        if id.len() != 40 && id.len() != 64 {
            return Err(TypeError::InvalidObjectId(format!(
                "expected 40 or 64 hex characters, got {}",
                id.len()
            )));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidObjectId(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(Self(id))
    }

    /// Abbreviated form for display.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ObjectId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fully qualified branch reference (`refs/heads/<branch>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefName(String);

impl RefName {
    /// Reference for a branch.
    pub fn for_branch(branch: &BranchName) -> Self {
        Self(format!("refs/heads/{}", branch.as_str()))
    }

    /// The reference without its `refs/` prefix, as used in GitHub ref URLs
    /// (`heads/<branch>`).
    pub fn short_form(&self) -> &str {
        self.0.strip_prefix("refs/").unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Author or committer of a published commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAuthor {
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Platform login, kept for logging; stores that have no use for it ignore it
    pub login: Option<String>,
    /// Authoring time
    pub date: DateTime<Utc>,
}

impl CommitAuthor {
    /// Author stamped with the current time.
    pub fn now(name: impl Into<String>, email: impl Into<String>, login: Option<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            login,
            date: Utc::now(),
        }
    }
}
