//! publish
//!
//! Publishes a local directory as a commit on one branch of an object store.
//!
//! # Pipeline
//!
//! 1. [`Walker`] lists everything under the source directory
//! 2. [`Forest::assemble`] builds one [`TreeNode`] per directory; empty
//!    directories are pruned
//! 3. [`BlobPublisher`] stores every file
//! 4. [`TreePublisher`] stores trees deepest level first, writing each id
//!    into its parent's entry
//! 5. [`CommitPublisher`] commits the root tree
//! 6. [`RefUpdater`] force-moves the branch to the commit
//!
//! Stages run strictly in order and any failure ends the run. Objects that
//! were already stored stay orphaned in the store, which is harmless: they
//! are content addressed, so a retry recreates them under the same ids. The
//! branch only moves when every earlier stage succeeded.
//!
//! # Example
//!
//! ```ignore
//! use sitepush::publish::{Publisher, PublishOptions, PublishRequest};
//!
//! let outcome = Publisher::new(forge.as_ref(), PublishOptions::default())
//!     .publish(&request)
//!     .await?;
//! println!("published {}", outcome.commit);
//! ```

mod blobs;
mod commit;
mod error;
mod forest;
mod trees;
mod walker;

pub use blobs::BlobPublisher;
pub use commit::{CommitPublisher, RefUpdater};
pub use error::{PublishError, PublishStage};
pub use forest::{Entry, Forest, ParentRef, Resolved, TreeNode};
pub use trees::TreePublisher;
pub use walker::{WalkEntry, WalkOptions, Walker};

use std::path::PathBuf;

use tracing::{info, instrument};

use crate::core::types::{BranchName, CommitAuthor, ObjectId};
use crate::forge::Forge;

/// Default number of concurrent store calls within a stage.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Default commit message.
pub const DEFAULT_MESSAGE: &str = "Published with sitepush.";

/// What to publish and where.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// Owner login of the target repository
    pub owner: String,
    /// Name of the target repository
    pub repo: String,
    /// Directory whose contents become the root tree
    pub source_dir: PathBuf,
    pub branch: BranchName,
    pub author: CommitAuthor,
    pub message: String,
}

/// Knobs for a publish run.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Upper bound on concurrent blob or tree calls
    pub concurrency: usize,
    pub walk: WalkOptions,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            walk: WalkOptions::default(),
        }
    }
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub commit: ObjectId,
    pub commit_url: String,
    pub root_tree: ObjectId,
    /// Files stored
    pub blobs: usize,
    /// Directories stored, root included
    pub trees: usize,
    /// Empty directories left out
    pub pruned: usize,
}

/// Runs the publish pipeline against one forge.
pub struct Publisher<'a> {
    forge: &'a dyn Forge,
    options: PublishOptions,
}

impl<'a> Publisher<'a> {
    pub fn new(forge: &'a dyn Forge, options: PublishOptions) -> Self {
        Self { forge, options }
    }

    /// Publish `request.source_dir` to `request.branch`.
    ///
    /// # Errors
    ///
    /// - [`PublishError::Io`] / [`PublishError::NonUtf8Name`] if the walk or a
    ///   file read fails
    /// - [`PublishError::IncompleteTree`] if there is nothing to publish; no
    ///   store call is made in that case
    /// - [`PublishError::Remote`] with the failing stage for store failures
    #[instrument(
        skip_all,
        fields(owner = %request.owner, repo = %request.repo, branch = %request.branch)
    )]
    pub async fn publish(&self, request: &PublishRequest) -> Result<PublishOutcome, PublishError> {
        let root = request.source_dir.as_path();

        let entries = Walker::new(root, self.options.walk.clone()).walk()?;
        let mut forest = Forest::assemble(&entries)?;
        let pruned = forest.prune_empty();
        if forest.root().is_none() {
            return Err(PublishError::IncompleteTree(format!(
                "{} contains no files",
                root.display()
            )));
        }
        info!(
            entries = entries.len(),
            trees = forest.len(),
            pruned = pruned.len(),
            "assembled directory forest"
        );

        let files = forest.blob_paths();
        let stored = BlobPublisher::new(self.forge, self.options.concurrency)
            .publish_files(root, files)
            .await?;
        let blobs = stored.len();
        for (path, id) in stored {
            forest.resolve_blob(&path, id)?;
        }
        info!(blobs, "stored blobs");

        let trees = forest.len();
        let root_tree = TreePublisher::new(self.forge, self.options.concurrency)
            .publish(&mut forest)
            .await?;

        let commit = CommitPublisher::new(self.forge)
            .publish(&root_tree, &request.author, &request.message)
            .await?;
        RefUpdater::new(self.forge)
            .update(&request.branch, &commit)
            .await?;

        Ok(PublishOutcome {
            commit: commit.id,
            commit_url: commit.url,
            root_tree,
            blobs,
            trees,
            pruned: pruned.len(),
        })
    }
}
