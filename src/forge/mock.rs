//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge keeps blobs, trees, commits and refs in memory. Object ids
//! are the hex SHA-256 of the object kind plus its content, so identical
//! content always maps to the same id and tests can assert idempotence. Tree
//! creation rejects entries that point at objects the mock has never seen,
//! the same way a real store refuses dangling references.
//!
//! Every call is recorded as a [`MockOperation`] and any operation can be
//! configured to fail through [`FailOn`].
//!
//! # Example
//!
//! ```
//! use sitepush::forge::mock::MockForge;
//! use sitepush::forge::{CreateBlobRequest, Forge};
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new();
//!
//! let a = forge.create_blob(CreateBlobRequest::base64(b"hello")).await.unwrap();
//! let b = forge.create_blob(CreateBlobRequest::base64(b"hello")).await.unwrap();
//!
//! assert_eq!(a, b);
//! assert_eq!(forge.blob_count(), 1);
//! # });
//! ```

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::traits::{
    ArchiveFormat, CreateBlobRequest, CreateCommitRequest, CreatedCommit, Forge, ForgeError,
    ForgeUser, ObjectKind, TreeEntryRequest, UpdateRefRequest,
};
use crate::core::types::{BranchName, ObjectId};

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone)]
pub struct MockForge {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockForgeInner>>,
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockForgeInner {
    blobs: HashMap<ObjectId, Vec<u8>>,
    trees: HashMap<ObjectId, Vec<TreeEntryRequest>>,
    commits: HashMap<ObjectId, CreateCommitRequest>,
    /// Branch name to commit id.
    refs: HashMap<String, ObjectId>,
    /// Method to fail on (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
    archive_url: Option<String>,
    user: Option<ForgeUser>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail every create_blob with the given error.
    CreateBlob(ForgeError),
    /// Fail create_blob only for this exact content.
    CreateBlobWithContent(Vec<u8>, ForgeError),
    /// Fail every create_tree with the given error.
    CreateTree(ForgeError),
    /// Fail create_tree for trees holding an entry with this name.
    CreateTreeWithEntry(String, ForgeError),
    /// Fail create_commit with the given error.
    CreateCommit(ForgeError),
    /// Fail update_ref with the given error.
    UpdateRef(ForgeError),
    /// Fail archive_link with the given error.
    ArchiveLink(ForgeError),
    /// Fail current_user with the given error.
    CurrentUser(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    CreateBlob {
        size: usize,
    },
    CreateTree {
        /// Entry names in submission order
        names: Vec<String>,
        /// Ids referenced by the entries
        children: Vec<ObjectId>,
    },
    CreateCommit {
        tree: ObjectId,
        message: String,
    },
    UpdateRef {
        branch: String,
        commit: ObjectId,
        force: bool,
    },
    ArchiveLink {
        reference: String,
    },
    CurrentUser,
}

impl MockForge {
    /// Create a new empty mock forge.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockForgeInner::default())),
        }
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use sitepush::forge::mock::{MockForge, FailOn};
    /// use sitepush::forge::ForgeError;
    ///
    /// let forge = MockForge::new()
    ///     .fail_on(FailOn::CreateTree(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_on = Some(fail_on);
        }
        self
    }

    /// URL returned by `archive_link`.
    pub fn with_archive_url(self, url: impl Into<String>) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.archive_url = Some(url.into());
        }
        self
    }

    /// User returned by `current_user`.
    pub fn with_user(self, user: ForgeUser) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.user = Some(user);
        }
        self
    }

    /// Point a branch at an existing commit id, as if published earlier.
    pub fn with_ref(self, branch: &str, commit: ObjectId) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.refs.insert(branch.to_string(), commit);
        }
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        let inner = self.inner.lock().unwrap();
        inner.operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.clear();
    }

    /// Entry names of every `create_tree` call, in call order.
    pub fn tree_calls(&self) -> Vec<Vec<String>> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                MockOperation::CreateTree { names, .. } => Some(names),
                _ => None,
            })
            .collect()
    }

    /// Commit a branch points at.
    pub fn ref_target(&self, branch: &str) -> Option<ObjectId> {
        let inner = self.inner.lock().unwrap();
        inner.refs.get(branch).cloned()
    }

    /// Stored blob content.
    pub fn blob(&self, id: &ObjectId) -> Option<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        inner.blobs.get(id).cloned()
    }

    /// Stored tree entries.
    pub fn tree(&self, id: &ObjectId) -> Option<Vec<TreeEntryRequest>> {
        let inner = self.inner.lock().unwrap();
        inner.trees.get(id).cloned()
    }

    /// Stored commit.
    pub fn commit(&self, id: &ObjectId) -> Option<CreateCommitRequest> {
        let inner = self.inner.lock().unwrap();
        inner.commits.get(id).cloned()
    }

    /// Number of distinct blobs stored.
    pub fn blob_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.blobs.len()
    }

    /// Number of distinct trees stored.
    pub fn tree_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.trees.len()
    }

    /// Record an operation.
    fn record(&self, op: MockOperation) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(op);
    }

    /// Check if we should fail and return the error if so.
    fn check_fail(&self, probe: Probe<'_>) -> Option<ForgeError> {
        let inner = self.inner.lock().unwrap();
        match (&inner.fail_on, probe) {
            (Some(FailOn::CreateBlob(e)), Probe::Blob(_)) => Some(e.clone()),
            (Some(FailOn::CreateBlobWithContent(content, e)), Probe::Blob(bytes))
                if content.as_slice() == bytes =>
            {
                Some(e.clone())
            }
            (Some(FailOn::CreateTree(e)), Probe::Tree(_)) => Some(e.clone()),
            (Some(FailOn::CreateTreeWithEntry(name, e)), Probe::Tree(entries))
                if entries.iter().any(|entry| &entry.name == name) =>
            {
                Some(e.clone())
            }
            (Some(FailOn::CreateCommit(e)), Probe::Commit) => Some(e.clone()),
            (Some(FailOn::UpdateRef(e)), Probe::Ref) => Some(e.clone()),
            (Some(FailOn::ArchiveLink(e)), Probe::Archive) => Some(e.clone()),
            (Some(FailOn::CurrentUser(e)), Probe::User) => Some(e.clone()),
            _ => None,
        }
    }
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

/// The call being checked against the failure configuration.
enum Probe<'a> {
    Blob(&'a [u8]),
    Tree(&'a [TreeEntryRequest]),
    Commit,
    Ref,
    Archive,
    User,
}

/// Content id: SHA-256 over a kind header and the content.
fn content_id(kind: &str, content: &[u8]) -> ObjectId {
    let mut hasher = Sha256::new();
    hasher.update(format!("{} {}\0", kind, content.len()).as_bytes());
    hasher.update(content);
    // Always 64 hex characters.
    ObjectId::new(hex::encode(hasher.finalize())).unwrap()
}

/// Canonical tree serialization; entry order does not affect the id.
fn tree_content(entries: &[TreeEntryRequest]) -> Vec<u8> {
    let mut lines: Vec<String> = entries
        .iter()
        .map(|e| format!("{} {} {}\t{}", e.mode, e.kind, e.id, e.name))
        .collect();
    lines.sort();
    lines.join("\n").into_bytes()
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_blob(&self, request: CreateBlobRequest) -> Result<ObjectId, ForgeError> {
        let bytes = request.decode()?;
        self.record(MockOperation::CreateBlob { size: bytes.len() });

        if let Some(err) = self.check_fail(Probe::Blob(&bytes)) {
            return Err(err);
        }

        let id = content_id("blob", &bytes);
        let mut inner = self.inner.lock().unwrap();
        inner.blobs.entry(id.clone()).or_insert(bytes);
        Ok(id)
    }

    async fn create_tree(&self, entries: Vec<TreeEntryRequest>) -> Result<ObjectId, ForgeError> {
        self.record(MockOperation::CreateTree {
            names: entries.iter().map(|e| e.name.clone()).collect(),
            children: entries.iter().map(|e| e.id.clone()).collect(),
        });

        if let Some(err) = self.check_fail(Probe::Tree(&entries)) {
            return Err(err);
        }

        let mut inner = self.inner.lock().unwrap();
        for entry in &entries {
            let known = match entry.kind {
                ObjectKind::Blob => inner.blobs.contains_key(&entry.id),
                ObjectKind::Tree => inner.trees.contains_key(&entry.id),
            };
            if !known {
                return Err(ForgeError::InvalidRequest(format!(
                    "tree entry '{}' references unknown {} {}",
                    entry.name, entry.kind, entry.id
                )));
            }
        }

        let id = content_id("tree", &tree_content(&entries));
        inner.trees.entry(id.clone()).or_insert(entries);
        Ok(id)
    }

    async fn create_commit(
        &self,
        request: CreateCommitRequest,
    ) -> Result<CreatedCommit, ForgeError> {
        self.record(MockOperation::CreateCommit {
            tree: request.tree.clone(),
            message: request.message.clone(),
        });

        if let Some(err) = self.check_fail(Probe::Commit) {
            return Err(err);
        }

        let mut inner = self.inner.lock().unwrap();
        if !inner.trees.contains_key(&request.tree) {
            return Err(ForgeError::InvalidRequest(format!(
                "commit references unknown tree {}",
                request.tree
            )));
        }

        let content = format!(
            "tree {}\nauthor {} <{}> {}\ncommitter {} <{}> {}\n\n{}",
            request.tree,
            request.author.name,
            request.author.email,
            request.author.date.timestamp(),
            request.committer.name,
            request.committer.email,
            request.committer.date.timestamp(),
            request.message
        );
        let id = content_id("commit", content.as_bytes());
        let url = format!("https://api.github.com/repos/mock/repo/git/commits/{}", id);
        inner.commits.entry(id.clone()).or_insert(request);
        Ok(CreatedCommit { id, url })
    }

    async fn update_ref(&self, request: UpdateRefRequest) -> Result<(), ForgeError> {
        self.record(MockOperation::UpdateRef {
            branch: request.branch.to_string(),
            commit: request.commit.clone(),
            force: request.force,
        });

        if let Some(err) = self.check_fail(Probe::Ref) {
            return Err(err);
        }

        let mut inner = self.inner.lock().unwrap();
        if !inner.commits.contains_key(&request.commit) {
            return Err(ForgeError::InvalidRequest(format!(
                "ref update to unknown commit {}",
                request.commit
            )));
        }
        inner
            .refs
            .insert(request.branch.to_string(), request.commit);
        Ok(())
    }

    async fn archive_link(
        &self,
        reference: &BranchName,
        format: ArchiveFormat,
    ) -> Result<String, ForgeError> {
        self.record(MockOperation::ArchiveLink {
            reference: reference.to_string(),
        });

        if let Some(err) = self.check_fail(Probe::Archive) {
            return Err(err);
        }

        let inner = self.inner.lock().unwrap();
        Ok(inner.archive_url.clone().unwrap_or_else(|| {
            format!(
                "https://codeload.github.com/mock/repo/legacy.{}/{}",
                format.as_str(),
                reference
            )
        }))
    }

    async fn current_user(&self) -> Result<ForgeUser, ForgeError> {
        self.record(MockOperation::CurrentUser);

        if let Some(err) = self.check_fail(Probe::User) {
            return Err(err);
        }

        let inner = self.inner.lock().unwrap();
        Ok(inner.user.clone().unwrap_or_else(|| ForgeUser {
            login: "mock-user".into(),
            name: Some("Mock User".into()),
            email: Some("mock-user@users.noreply.github.com".into()),
        }))
    }
}
