//! publish::commit
//!
//! Commit creation and the branch update that makes a publish visible.

use tracing::{info, warn};

use super::error::{PublishError, PublishStage};
use crate::core::types::{BranchName, CommitAuthor, ObjectId};
use crate::forge::{CreateCommitRequest, CreatedCommit, Forge, UpdateRefRequest};

/// Creates parentless commits over a root tree.
pub struct CommitPublisher<'a> {
    forge: &'a dyn Forge,
}

impl<'a> CommitPublisher<'a> {
    pub fn new(forge: &'a dyn Forge) -> Self {
        Self { forge }
    }

    /// Create a commit for `root_tree`; the author doubles as committer.
    pub async fn publish(
        &self,
        root_tree: &ObjectId,
        author: &CommitAuthor,
        message: &str,
    ) -> Result<CreatedCommit, PublishError> {
        let commit = self
            .forge
            .create_commit(CreateCommitRequest {
                message: message.to_string(),
                tree: root_tree.clone(),
                author: author.clone(),
                committer: author.clone(),
            })
            .await
            .map_err(PublishError::remote(PublishStage::Commit, ""))?;
        info!(
            commit = %commit.id.short(7),
            tree = %root_tree.short(7),
            author = %author.name,
            login = author.login.as_deref().unwrap_or(""),
            "created commit"
        );
        Ok(commit)
    }
}

/// Points the target branch at a published commit.
pub struct RefUpdater<'a> {
    forge: &'a dyn Forge,
}

impl<'a> RefUpdater<'a> {
    pub fn new(forge: &'a dyn Forge) -> Self {
        Self { forge }
    }

    /// Force-update `branch` to `commit`.
    ///
    /// There is no compare-and-swap against the previous tip: a concurrent
    /// publish to the same branch can be overwritten.
    pub async fn update(
        &self,
        branch: &BranchName,
        commit: &CreatedCommit,
    ) -> Result<(), PublishError> {
        self.forge
            .update_ref(UpdateRefRequest {
                branch: branch.clone(),
                commit: commit.id.clone(),
                commit_url: commit.url.clone(),
                force: true,
            })
            .await
            .map_err(|source| {
                warn!(%branch, error = %source, "ref update failed");
                PublishError::remote(PublishStage::Ref, "")(source)
            })?;
        info!(%branch, commit = %commit.id.short(7), "updated branch");
        Ok(())
    }
}
