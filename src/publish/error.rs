//! publish::error
//!
//! Error type for the publish pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::forge::ForgeError;

/// The stage of a publish (or deploy) an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublishStage {
    Walk,
    Blob,
    Tree,
    Commit,
    Ref,
    Fetch,
    Build,
    Cleanup,
}

impl PublishStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStage::Walk => "walk",
            PublishStage::Blob => "blob",
            PublishStage::Tree => "tree",
            PublishStage::Commit => "commit",
            PublishStage::Ref => "ref",
            PublishStage::Fetch => "fetch",
            PublishStage::Build => "build",
            PublishStage::Cleanup => "cleanup",
        }
    }
}

impl std::fmt::Display for PublishStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from publishing a directory.
///
/// Every variant is terminal for the run. Objects already written to the
/// store stay there; the branch is only moved by a fully successful run.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Local filesystem walk or read failure.
    #[error("{stage} stage: cannot read {}: {source}", .path.display())]
    Io {
        stage: PublishStage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A store call failed. `path` is relative to the publish root and is
    /// empty for commit and ref calls.
    #[error("{stage} stage failed{}: {source}", display_path(.path))]
    Remote {
        stage: PublishStage,
        path: PathBuf,
        #[source]
        source: ForgeError,
    },

    /// No root tree came out of assembly or level processing.
    #[error("incomplete tree: {0}")]
    IncompleteTree(String),

    /// A tree was about to be submitted with an unpublished child.
    #[error("tree '{}' has unresolved entry '{entry}'", .tree.display())]
    UnresolvedEntry { tree: PathBuf, entry: String },

    /// A file or directory name is not valid UTF-8.
    #[error("name is not valid UTF-8: {}", .path.display())]
    NonUtf8Name { path: PathBuf },
}

fn display_path(path: &std::path::Path) -> String {
    if path.as_os_str().is_empty() {
        String::new()
    } else {
        format!(" for {}", path.display())
    }
}

impl PublishError {
    /// The stage this error belongs to.
    pub fn stage(&self) -> PublishStage {
        match self {
            PublishError::Io { stage, .. } | PublishError::Remote { stage, .. } => *stage,
            PublishError::IncompleteTree(_) | PublishError::UnresolvedEntry { .. } => {
                PublishStage::Tree
            }
            PublishError::NonUtf8Name { .. } => PublishStage::Walk,
        }
    }

    /// The path the error concerns. Blob and tree errors carry it relative
    /// to the publish root; walk errors name the path on disk.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            PublishError::Io { path, .. }
            | PublishError::Remote { path, .. }
            | PublishError::NonUtf8Name { path } => Some(path),
            PublishError::UnresolvedEntry { tree, .. } => Some(tree),
            PublishError::IncompleteTree(_) => None,
        }
    }

    pub(crate) fn remote(stage: PublishStage, path: impl Into<PathBuf>) -> impl FnOnce(ForgeError) -> Self {
        let path = path.into();
        move |source| PublishError::Remote {
            stage,
            path,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_names_stage_and_path() {
        let err = PublishError::Remote {
            stage: PublishStage::Blob,
            path: PathBuf::from("sub/b.txt"),
            source: ForgeError::RateLimited,
        };
        assert_eq!(err.stage(), PublishStage::Blob);
        assert_eq!(err.to_string(), "blob stage failed for sub/b.txt: rate limited");
    }

    #[test]
    fn remote_error_without_path() {
        let err = PublishError::remote(PublishStage::Ref, PathBuf::new())(ForgeError::AuthRequired);
        assert_eq!(err.to_string(), "ref stage failed: authentication required");
        assert_eq!(err.path(), Some(std::path::Path::new("")));
    }

    #[test]
    fn structural_errors_belong_to_tree_stage() {
        assert_eq!(
            PublishError::IncompleteTree("empty".into()).stage(),
            PublishStage::Tree
        );
        let err = PublishError::UnresolvedEntry {
            tree: PathBuf::from("x"),
            entry: "y".into(),
        };
        assert_eq!(err.stage(), PublishStage::Tree);
        assert!(err.to_string().contains("'y'"));
    }
}
