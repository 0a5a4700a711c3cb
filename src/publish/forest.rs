//! publish::forest
//!
//! In-memory directory forest built from a walk.
//!
//! # Layout
//!
//! The forest is an arena keyed by directory path relative to the publish
//! root (the root itself is the empty path) plus an index from depth level to
//! the directories at that level. Levels count path components, so the root
//! is level 0 and its immediate sub-directories are level 1.
//!
//! Every [`TreeNode`] owns the entries for its immediate children. Blob
//! entries are resolved once file contents are stored; tree entries are
//! resolved when the child directory's tree is stored, which is why trees go
//! out deepest level first.
//!
//! # Empty directories
//!
//! Git trees cannot be empty. [`Forest::prune_empty`] drops directories with
//! no files anywhere below them, deepest first, together with the entries
//! pointing at them.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use super::error::PublishError;
use super::walker::WalkEntry;
use crate::core::types::ObjectId;
use crate::forge::{EntryMode, ObjectKind, TreeEntryRequest};

/// Parent of a tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentRef {
    /// The node is the publish root
    Root,
    /// Relative path of the containing directory
    Dir(PathBuf),
}

/// One child reference inside a tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub mode: EntryMode,
    pub kind: ObjectKind,
    /// Set once the child object is stored
    pub id: Option<ObjectId>,
}

/// One directory of the forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// Base name; empty for the root
    pub name: String,
    /// Path relative to the publish root
    pub path: PathBuf,
    pub parent: ParentRef,
    pub level: usize,
    entries: BTreeMap<String, Entry>,
}

impl TreeNode {
    fn new(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = match path.parent() {
            Some(parent) => ParentRef::Dir(parent.to_path_buf()),
            None => ParentRef::Root,
        };
        Self {
            name,
            path: path.to_path_buf(),
            parent,
            level: path.components().count(),
            entries: BTreeMap::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent == ParentRef::Root
    }

    /// Entries ordered by name.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The store request for this node.
    ///
    /// Fails if any entry is still unresolved.
    pub fn tree_entries(&self) -> Result<Vec<TreeEntryRequest>, PublishError> {
        self.entries
            .values()
            .map(|entry| {
                let id = entry.id.clone().ok_or_else(|| PublishError::UnresolvedEntry {
                    tree: self.path.clone(),
                    entry: entry.name.clone(),
                })?;
                Ok(TreeEntryRequest {
                    name: entry.name.clone(),
                    mode: entry.mode,
                    kind: entry.kind,
                    id,
                })
            })
            .collect()
    }
}

/// What a stored tree id was written into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// The entry of the parent directory
    Parent,
    /// The id is the root tree
    Root(ObjectId),
}

/// Arena of tree nodes plus a level index.
#[derive(Debug, Default, Clone)]
pub struct Forest {
    nodes: HashMap<PathBuf, TreeNode>,
    levels: BTreeMap<usize, Vec<PathBuf>>,
}

impl Forest {
    /// Assemble the forest from walk output.
    ///
    /// Every entry lands in its parent directory's node, created on first
    /// sight. The root never becomes anyone's entry. Blob ids are left empty
    /// for the blob stage to fill in.
    pub fn assemble(entries: &[WalkEntry]) -> Result<Self, PublishError> {
        let mut forest = Forest::default();
        for entry in entries {
            let path = entry.path();
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| PublishError::NonUtf8Name {
                    path: path.to_path_buf(),
                })?
                .to_string();
            let dir = path.parent().unwrap_or_else(|| Path::new(""));

            let (mode, kind) = match entry {
                WalkEntry::Directory { .. } => (EntryMode::Directory, ObjectKind::Tree),
                WalkEntry::File {
                    executable: true, ..
                } => (EntryMode::Executable, ObjectKind::Blob),
                WalkEntry::File { .. } => (EntryMode::File, ObjectKind::Blob),
            };

            forest.node_or_insert(dir).entries.insert(
                name.clone(),
                Entry {
                    name,
                    mode,
                    kind,
                    id: None,
                },
            );
        }
        Ok(forest)
    }

    fn node_or_insert(&mut self, dir: &Path) -> &mut TreeNode {
        let levels = &mut self.levels;
        self.nodes.entry(dir.to_path_buf()).or_insert_with(|| {
            let node = TreeNode::new(dir);
            levels.entry(node.level).or_default().push(dir.to_path_buf());
            node
        })
    }

    /// Drop directories with no files below them.
    ///
    /// Returns the relative paths of the dropped directories.
    pub fn prune_empty(&mut self) -> Vec<PathBuf> {
        let mut pruned = Vec::new();
        let levels: Vec<usize> = self.levels.keys().rev().copied().collect();

        for level in levels {
            let paths = self.levels.get(&level).cloned().unwrap_or_default();
            let mut kept = Vec::with_capacity(paths.len());

            for path in paths {
                let nodes = &self.nodes;
                let Some(node) = self.nodes.get(&path) else {
                    continue;
                };
                let dangling: Vec<String> = node
                    .entries
                    .values()
                    .filter(|e| e.kind == ObjectKind::Tree && !nodes.contains_key(&path.join(&e.name)))
                    .map(|e| e.name.clone())
                    .collect();

                if let Some(node) = self.nodes.get_mut(&path) {
                    for name in dangling {
                        node.entries.remove(&name);
                        pruned.push(path.join(name));
                    }
                    if node.entries.is_empty() {
                        self.nodes.remove(&path);
                        continue;
                    }
                }
                kept.push(path);
            }

            if kept.is_empty() {
                self.levels.remove(&level);
            } else {
                self.levels.insert(level, kept);
            }
        }
        pruned
    }

    /// The root node, if anything was assembled.
    pub fn root(&self) -> Option<&TreeNode> {
        self.nodes.get(Path::new(""))
    }

    pub fn node(&self, path: &Path) -> Option<&TreeNode> {
        self.nodes.get(path)
    }

    /// Deepest level present.
    pub fn max_level(&self) -> Option<usize> {
        self.levels.keys().next_back().copied()
    }

    /// Directories at `level`.
    pub fn level(&self, level: usize) -> &[PathBuf] {
        self.levels.get(&level).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of directories (tree nodes).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Relative paths of every blob entry, sorted.
    pub fn blob_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .nodes
            .values()
            .flat_map(|node| {
                node.entries
                    .values()
                    .filter(|e| e.kind == ObjectKind::Blob)
                    .map(move |e| node.path.join(&e.name))
            })
            .collect();
        paths.sort();
        paths
    }

    /// Record the stored id of a file.
    pub fn resolve_blob(&mut self, path: &Path, id: ObjectId) -> Result<(), PublishError> {
        let (dir, name) = split(path)?;
        let entry = self
            .nodes
            .get_mut(dir)
            .and_then(|node| node.entries.get_mut(name))
            .filter(|entry| entry.kind == ObjectKind::Blob)
            .ok_or_else(|| {
                PublishError::IncompleteTree(format!("no file entry for {}", path.display()))
            })?;
        entry.id = Some(id);
        Ok(())
    }

    /// Record the stored id of a directory in its parent entry.
    pub fn resolve_tree(&mut self, path: &Path, id: ObjectId) -> Result<Resolved, PublishError> {
        let node = self.nodes.get(path).ok_or_else(|| {
            PublishError::IncompleteTree(format!("no directory node for {}", path.display()))
        })?;
        let ParentRef::Dir(parent) = node.parent.clone() else {
            return Ok(Resolved::Root(id));
        };
        let name = node.name.clone();

        let entry = self
            .nodes
            .get_mut(&parent)
            .and_then(|parent| parent.entries.get_mut(&name))
            .filter(|entry| entry.kind == ObjectKind::Tree)
            .ok_or_else(|| {
                PublishError::IncompleteTree(format!(
                    "parent of {} has no entry for it",
                    path.display()
                ))
            })?;
        entry.id = Some(id);
        Ok(Resolved::Parent)
    }
}

fn split(path: &Path) -> Result<(&Path, &str), PublishError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PublishError::NonUtf8Name {
            path: path.to_path_buf(),
        })?;
    Ok((path.parent().unwrap_or_else(|| Path::new("")), name))
}
