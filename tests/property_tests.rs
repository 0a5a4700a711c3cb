//! Property-based tests for the publish pipeline.
//!
//! These tests use proptest to generate random directory layouts and check
//! that the pipeline's structural guarantees hold for every one of them.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use proptest::prelude::*;
use tempfile::TempDir;

use sitepush::core::types::{BranchName, CommitAuthor};
use sitepush::forge::mock::{MockForge, MockOperation};
use sitepush::publish::{PublishOptions, PublishOutcome, PublishRequest, Publisher};

/// Strategy for one file path: up to three directories and a file name.
///
/// Directory names never end in `.txt`, so a generated path can never be
/// both a file and a directory.
fn file_path() -> impl Strategy<Value = Vec<String>> {
    (
        prop::collection::vec(prop::sample::select(vec!["a", "b", "c"]), 0..4),
        prop::sample::select(vec!["x", "y", "z", "index"]),
    )
        .prop_map(|(dirs, file)| {
            let mut parts: Vec<String> = dirs.into_iter().map(|d| format!("d{}", d)).collect();
            parts.push(format!("{}.txt", file));
            parts
        })
}

/// Strategy for a non-empty set of files with random contents.
fn layout() -> impl Strategy<Value = BTreeMap<Vec<String>, String>> {
    prop::collection::btree_map(file_path(), "[a-z]{0,12}", 1..24)
}

fn materialize(root: &Path, layout: &BTreeMap<Vec<String>, String>) {
    for (parts, content) in layout {
        let path: PathBuf = parts.iter().collect();
        let full = root.join(&path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
}

fn expected_dirs(layout: &BTreeMap<Vec<String>, String>) -> BTreeSet<Vec<String>> {
    let mut dirs = BTreeSet::new();
    for parts in layout.keys() {
        for depth in 1..parts.len() {
            dirs.insert(parts[..depth].to_vec());
        }
    }
    dirs
}

fn publish(forge: &MockForge, root: &Path) -> PublishOutcome {
    let request = PublishRequest {
        owner: "octocat".into(),
        repo: "site".into(),
        source_dir: root.to_path_buf(),
        branch: BranchName::new("gh-pages").unwrap(),
        author: CommitAuthor::now("Mona", "mona@example.com", None),
        message: "Published with sitepush.".into(),
    };
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(
        Publisher::new(forge, PublishOptions::default()).publish(&request),
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// N files and M directories give N blob calls and M + 1 trees, and
    /// the root holds exactly its immediate children.
    #[test]
    fn completeness(layout in layout()) {
        let temp = TempDir::new().unwrap();
        materialize(temp.path(), &layout);
        let forge = MockForge::new();

        let outcome = publish(&forge, temp.path());

        let dirs = expected_dirs(&layout);
        prop_assert_eq!(outcome.blobs, layout.len());
        prop_assert_eq!(outcome.trees, dirs.len() + 1);
        prop_assert_eq!(forge.tree_calls().len(), dirs.len() + 1);

        let root_children: BTreeSet<String> = layout.keys().map(|p| p[0].clone()).collect();
        let root = forge.tree(&outcome.root_tree).unwrap();
        prop_assert_eq!(root.len(), root_children.len());
    }

    /// Trees only reference stored objects, the commit follows the last
    /// tree, and the branch moves last.
    #[test]
    fn dependency_order(layout in layout()) {
        let temp = TempDir::new().unwrap();
        materialize(temp.path(), &layout);
        let forge = MockForge::new();

        let outcome = publish(&forge, temp.path());

        let ops = forge.operations();
        let last_blob = ops.iter().rposition(|op| matches!(op, MockOperation::CreateBlob { .. }));
        let first_tree = ops.iter().position(|op| matches!(op, MockOperation::CreateTree { .. }));
        let last_tree = ops.iter().rposition(|op| matches!(op, MockOperation::CreateTree { .. }));
        let commit = ops.iter().position(|op| matches!(op, MockOperation::CreateCommit { .. }));
        prop_assert!(last_blob < first_tree);
        prop_assert!(last_tree < commit);
        prop_assert!(matches!(ops.last(), Some(MockOperation::UpdateRef { .. })), "last operation should be UpdateRef");

        // The mock refuses dangling entries; every call having been stored
        // means no tree went out before its children.
        let distinct: BTreeSet<_> = ops
            .iter()
            .filter_map(|op| match op {
                MockOperation::CreateTree { names, children } => Some((names.clone(), children.clone())),
                _ => None,
            })
            .collect();
        prop_assert_eq!(forge.tree_count(), distinct.len());
        prop_assert_eq!(forge.commit(&outcome.commit).unwrap().tree, outcome.root_tree);
    }

    /// Publishing the same layout twice yields the same root tree.
    #[test]
    fn idempotence(layout in layout()) {
        let temp = TempDir::new().unwrap();
        materialize(temp.path(), &layout);
        let forge = MockForge::new();

        let first = publish(&forge, temp.path());
        let second = publish(&forge, temp.path());

        prop_assert_eq!(first.root_tree, second.root_tree);
        let contents: BTreeSet<&String> = layout.values().collect();
        prop_assert_eq!(forge.blob_count(), contents.len());
    }
}
