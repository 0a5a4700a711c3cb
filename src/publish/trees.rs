//! publish::trees
//!
//! Stores the forest's trees, deepest level first.
//!
//! Siblings on one level never depend on each other, so a whole level is
//! submitted concurrently. Ids are written into the parent entries only after
//! the level completes, and a node's request is built (and checked for
//! unresolved entries) before any of its level is submitted.

use std::path::PathBuf;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, instrument};

use super::error::{PublishError, PublishStage};
use super::forest::{Forest, Resolved};
use crate::core::types::ObjectId;
use crate::forge::Forge;

/// Publishes every tree node exactly once.
pub struct TreePublisher<'a> {
    forge: &'a dyn Forge,
    concurrency: usize,
}

impl<'a> TreePublisher<'a> {
    pub fn new(forge: &'a dyn Forge, concurrency: usize) -> Self {
        Self {
            forge,
            concurrency: concurrency.max(1),
        }
    }

    /// Store all trees and return the root tree id.
    ///
    /// Blob entries must already be resolved.
    #[instrument(skip_all, fields(trees = forest.len()))]
    pub async fn publish(&self, forest: &mut Forest) -> Result<ObjectId, PublishError> {
        let max_level = forest.max_level().ok_or_else(|| {
            PublishError::IncompleteTree("no directories to publish".into())
        })?;
        let mut root_tree = None;

        for level in (0..=max_level).rev() {
            let jobs = forest
                .level(level)
                .iter()
                .map(|path| {
                    let node = forest.node(path).ok_or_else(|| {
                        PublishError::IncompleteTree(format!(
                            "level index names missing directory {}",
                            path.display()
                        ))
                    })?;
                    Ok((path.clone(), node.tree_entries()?))
                })
                .collect::<Result<Vec<_>, PublishError>>()?;

            if jobs.is_empty() {
                continue;
            }

            let published: Vec<(PathBuf, ObjectId)> = stream::iter(jobs)
                .map(|(path, entries)| async move {
                    let count = entries.len();
                    let id = self
                        .forge
                        .create_tree(entries)
                        .await
                        .map_err(PublishError::remote(PublishStage::Tree, path.clone()))?;
                    debug!(path = %path.display(), entries = count, tree = %id.short(7), "stored tree");
                    Ok::<_, PublishError>((path, id))
                })
                .buffer_unordered(self.concurrency)
                .try_collect()
                .await?;

            info!(level, trees = published.len(), "published tree level");

            for (path, id) in published {
                if let Resolved::Root(id) = forest.resolve_tree(&path, id)? {
                    root_tree = Some(id);
                }
            }
        }

        root_tree.ok_or_else(|| PublishError::IncompleteTree("no root tree was published".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::MockForge;
    use crate::forge::CreateBlobRequest;
    use crate::publish::walker::WalkEntry;
    use std::path::Path;

    async fn resolved_forest(forge: &MockForge, entries: &[WalkEntry]) -> Forest {
        let mut forest = Forest::assemble(entries).unwrap();
        for path in forest.blob_paths() {
            let id = forge
                .create_blob(CreateBlobRequest::base64(path.to_string_lossy().as_bytes()))
                .await
                .unwrap();
            forest.resolve_blob(&path, id).unwrap();
        }
        forest
    }

    fn file(path: &str) -> WalkEntry {
        WalkEntry::File {
            path: path.into(),
            executable: false,
        }
    }

    fn dir(path: &str) -> WalkEntry {
        WalkEntry::Directory { path: path.into() }
    }

    #[tokio::test]
    async fn deepest_level_goes_first() {
        let forge = MockForge::new();
        let mut forest =
            resolved_forest(&forge, &[dir("x"), dir("x/y"), file("x/y/c.txt")]).await;

        let root = TreePublisher::new(&forge, 4).publish(&mut forest).await.unwrap();

        assert_eq!(
            forge.tree_calls(),
            vec![vec!["c.txt".to_string()], vec!["y".to_string()], vec!["x".to_string()]]
        );
        let root_entries = forge.tree(&root).unwrap();
        assert_eq!(root_entries[0].name, "x");
    }

    #[tokio::test]
    async fn parent_entries_receive_child_ids() {
        let forge = MockForge::new();
        let mut forest =
            resolved_forest(&forge, &[file("a.txt"), dir("sub"), file("sub/b.txt")]).await;

        TreePublisher::new(&forge, 1).publish(&mut forest).await.unwrap();

        let sub_id = forest
            .root()
            .unwrap()
            .entry("sub")
            .unwrap()
            .id
            .clone()
            .unwrap();
        let sub_entries = forge.tree(&sub_id).unwrap();
        assert_eq!(sub_entries.len(), 1);
        assert_eq!(sub_entries[0].name, "b.txt");
        assert!(forest.node(Path::new("sub")).is_some());
    }

    #[tokio::test]
    async fn unresolved_blob_is_caught_before_submission() {
        let forge = MockForge::new();
        let mut forest = Forest::assemble(&[file("a.txt")]).unwrap();
        let err = TreePublisher::new(&forge, 1)
            .publish(&mut forest)
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::UnresolvedEntry { .. }));
        assert!(forge.tree_calls().is_empty());
    }

    #[tokio::test]
    async fn empty_forest_is_incomplete() {
        let forge = MockForge::new();
        let mut forest = Forest::default();
        let err = TreePublisher::new(&forge, 1)
            .publish(&mut forest)
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::IncompleteTree(_)));
    }
}
