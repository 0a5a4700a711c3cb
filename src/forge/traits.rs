//! forge::traits
//!
//! Forge trait definition for the content-addressable object store.
//!
//! # Design
//!
//! The `Forge` trait is async because every store operation involves network
//! (or disk) I/O. It exposes only the git data operations the publisher
//! needs: blobs, trees, commits, and ref updates, plus the archive link used
//! to fetch a branch's sources and the authenticated user used for default
//! authorship.
//!
//! Store objects are append-only and content addressed. The only mutating
//! call is [`Forge::update_ref`].
//!
//! # Example
//!
//! ```ignore
//! use sitepush::forge::{Forge, BlobEncoding, CreateBlobRequest};
//!
//! async fn store_hello(forge: &dyn Forge) -> Result<(), ForgeError> {
//!     let id = forge
//!         .create_blob(CreateBlobRequest::base64(b"hello"))
//!         .await?;
//!     println!("blob {}", id);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

use crate::core::types::{BranchName, CommitAuthor, ObjectId};

/// Errors from forge operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The store rejected or could not decode the request locally.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Local object store failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// The operation is not supported by this forge.
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

/// Encoding tag submitted alongside blob content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobEncoding {
    Base64,
    Utf8,
}

impl BlobEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobEncoding::Base64 => "base64",
            BlobEncoding::Utf8 => "utf-8",
        }
    }
}

impl std::fmt::Display for BlobEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to create a blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBlobRequest {
    /// Encoded content
    pub content: String,
    /// How `content` is encoded
    pub encoding: BlobEncoding,
}

impl CreateBlobRequest {
    /// Base64-encode raw file bytes.
    pub fn base64(bytes: &[u8]) -> Self {
        Self {
            content: STANDARD.encode(bytes),
            encoding: BlobEncoding::Base64,
        }
    }

    /// Decode the content back to raw bytes.
    ///
    /// Stores that persist raw objects (local git, the mock) use this to hash
    /// exactly what a remote store would hash.
    pub fn decode(&self) -> Result<Vec<u8>, ForgeError> {
        match self.encoding {
            BlobEncoding::Base64 => STANDARD
                .decode(self.content.as_bytes())
                .map_err(|e| ForgeError::InvalidRequest(format!("bad base64 content: {}", e))),
            BlobEncoding::Utf8 => Ok(self.content.as_bytes().to_vec()),
        }
    }
}

/// Kind of object a tree entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Blob,
    Tree,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File mode recorded on a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryMode {
    /// Regular file (`100644`)
    File,
    /// Executable file (`100755`)
    Executable,
    /// Sub-directory (`040000`)
    Directory,
}

impl EntryMode {
    /// The mode string used by the git data API.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryMode::File => "100644",
            EntryMode::Executable => "100755",
            EntryMode::Directory => "040000",
        }
    }

    /// Numeric mode, as git stores it.
    pub fn as_i32(&self) -> i32 {
        match self {
            EntryMode::File => 0o100644,
            EntryMode::Executable => 0o100755,
            EntryMode::Directory => 0o040000,
        }
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a tree submitted to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntryRequest {
    /// Base name of the child
    pub name: String,
    pub mode: EntryMode,
    pub kind: ObjectKind,
    /// Identifier of the already-published child
    pub id: ObjectId,
}

/// Request to create a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCommitRequest {
    pub message: String,
    /// Root tree of the snapshot
    pub tree: ObjectId,
    pub author: CommitAuthor,
    pub committer: CommitAuthor,
}

/// A commit created by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedCommit {
    pub id: ObjectId,
    /// API URL of the commit object
    pub url: String,
}

/// Request to repoint a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRefRequest {
    pub branch: BranchName,
    pub commit: ObjectId,
    pub commit_url: String,
    /// Overwrite the branch tip regardless of its previous value
    pub force: bool,
}

/// Archive format for branch downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveFormat {
    #[default]
    Tarball,
    Zipball,
}

impl ArchiveFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::Tarball => "tarball",
            ArchiveFormat::Zipball => "zipball",
        }
    }
}

/// The authenticated user of a forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeUser {
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// The Forge trait for interacting with a content-addressable object store.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: the publisher issues same-level
/// calls concurrently.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Nothing retries.
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "github", "local").
    fn name(&self) -> &'static str;

    /// Store a blob and return its content identifier.
    ///
    /// Identical content must always yield the same identifier.
    async fn create_blob(&self, request: CreateBlobRequest) -> Result<ObjectId, ForgeError>;

    /// Store a tree whose entries all reference existing objects.
    async fn create_tree(&self, entries: Vec<TreeEntryRequest>) -> Result<ObjectId, ForgeError>;

    /// Store a parentless commit pointing at `request.tree`.
    async fn create_commit(&self, request: CreateCommitRequest)
        -> Result<CreatedCommit, ForgeError>;

    /// Point a branch at a commit.
    ///
    /// With `force` set the previous tip is overwritten unconditionally.
    async fn update_ref(&self, request: UpdateRefRequest) -> Result<(), ForgeError>;

    /// Resolve a download URL for an archive of `reference`.
    async fn archive_link(
        &self,
        reference: &BranchName,
        format: ArchiveFormat,
    ) -> Result<String, ForgeError>;

    /// The user the forge is authenticated as.
    async fn current_user(&self) -> Result<ForgeUser, ForgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_strings_match_git_data_api() {
        assert_eq!(EntryMode::File.as_str(), "100644");
        assert_eq!(EntryMode::Executable.as_str(), "100755");
        assert_eq!(EntryMode::Directory.as_str(), "040000");
        assert_eq!(EntryMode::Directory.as_i32(), 0o040000);
    }

    #[test]
    fn kind_and_encoding_display() {
        assert_eq!(format!("{}", ObjectKind::Blob), "blob");
        assert_eq!(format!("{}", ObjectKind::Tree), "tree");
        assert_eq!(format!("{}", BlobEncoding::Base64), "base64");
        assert_eq!(ArchiveFormat::default().as_str(), "tarball");
    }

    #[test]
    fn base64_blob_request_decodes_to_input() {
        let request = CreateBlobRequest::base64(b"<html></html>\n");
        assert_eq!(request.encoding, BlobEncoding::Base64);
        assert_eq!(request.content, "PGh0bWw+PC9odG1sPgo=");
        assert_eq!(request.decode().unwrap(), b"<html></html>\n");
    }

    #[test]
    fn malformed_base64_is_invalid_request() {
        let request = CreateBlobRequest {
            content: "!!!".into(),
            encoding: BlobEncoding::Base64,
        };
        assert!(matches!(
            request.decode(),
            Err(ForgeError::InvalidRequest(_))
        ));
    }

    #[test]
    fn forge_error_display() {
        assert_eq!(format!("{}", ForgeError::RateLimited), "rate limited");
        assert_eq!(
            format!(
                "{}",
                ForgeError::ApiError {
                    status: 422,
                    message: "Validation failed".into()
                }
            ),
            "API error: 422 - Validation failed"
        );
        assert_eq!(
            format!("{}", ForgeError::NotFound("ref heads/gh-pages".into())),
            "not found: ref heads/gh-pages"
        );
    }
}
