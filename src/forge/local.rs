//! forge::local
//!
//! Forge implementation over a bare git repository on disk.
//!
//! Objects are written with libgit2, so a publish into a local store yields
//! the same blob, tree and commit ids `git` itself would compute. Useful for
//! previewing a publish (`--store local`) and for end-to-end tests that need
//! a real object store without network access.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use git2::{ErrorCode, ObjectType, Oid, Repository, Signature, Time};
use tracing::debug;

use super::traits::{
    ArchiveFormat, CreateBlobRequest, CreateCommitRequest, CreatedCommit, EntryMode, Forge,
    ForgeError, ForgeUser, ObjectKind, TreeEntryRequest, UpdateRefRequest,
};
use crate::core::types::{BranchName, CommitAuthor, ObjectId, RefName};

/// A bare repository used as the object store.
pub struct LocalForge {
    repo: Mutex<Repository>,
    path: PathBuf,
}

impl std::fmt::Debug for LocalForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalForge")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Map a libgit2 error with context.
fn storage(err: git2::Error, context: &str) -> ForgeError {
    match err.code() {
        ErrorCode::NotFound => ForgeError::NotFound(format!("{}: {}", context, err.message())),
        _ => ForgeError::Storage(format!("{}: {}", context, err.message())),
    }
}

fn to_oid(id: &ObjectId) -> Result<Oid, ForgeError> {
    Oid::from_str(id.as_str())
        .map_err(|_| ForgeError::InvalidRequest(format!("not a git object id: {}", id)))
}

fn from_oid(oid: Oid) -> Result<ObjectId, ForgeError> {
    ObjectId::new(oid.to_string()).map_err(|e| ForgeError::Storage(e.to_string()))
}

fn signature(author: &CommitAuthor) -> Result<Signature<'static>, ForgeError> {
    Signature::new(
        &author.name,
        &author.email,
        &Time::new(author.date.timestamp(), 0),
    )
    .map_err(|e| storage(e, "invalid signature"))
}

/// Only a missing path or an empty directory may be turned into a repository.
fn is_missing_or_empty(path: &Path) -> Result<bool, ForgeError> {
    match std::fs::read_dir(path) {
        Ok(mut entries) => Ok(entries.next().is_none()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(ForgeError::Storage(format!(
            "cannot open repository at {}: {}",
            path.display(),
            e
        ))),
    }
}

impl LocalForge {
    /// Open the bare repository at `path`, creating it when missing.
    pub fn open_or_init(path: impl AsRef<Path>) -> Result<Self, ForgeError> {
        let path = path.as_ref();
        let repo = if is_missing_or_empty(path)? {
            debug!(path = %path.display(), "initializing bare repository");
            Repository::init_bare(path).map_err(|e| storage(e, "cannot init repository"))?
        } else {
            Repository::open_bare(path).map_err(|e| storage(e, "cannot open repository"))?
        };
        Ok(Self {
            repo: Mutex::new(repo),
            path: path.to_path_buf(),
        })
    }

    /// Location of the repository.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn repo(&self) -> Result<MutexGuard<'_, Repository>, ForgeError> {
        self.repo
            .lock()
            .map_err(|_| ForgeError::Storage("repository lock poisoned".into()))
    }

    /// Commit a branch currently points at.
    pub fn ref_target(&self, branch: &BranchName) -> Result<Option<ObjectId>, ForgeError> {
        let repo = self.repo()?;
        let refname = RefName::for_branch(branch);
        match repo.refname_to_id(refname.as_str()) {
            Ok(oid) => Ok(Some(from_oid(oid)?)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(storage(e, "cannot resolve ref")),
        }
    }

    /// Root tree of a commit.
    pub fn commit_tree(&self, commit: &ObjectId) -> Result<ObjectId, ForgeError> {
        let repo = self.repo()?;
        let commit = repo
            .find_commit(to_oid(commit)?)
            .map_err(|e| storage(e, "cannot read commit"))?;
        from_oid(commit.tree_id())
    }

    /// Entries of a stored tree as `(name, mode, id)`.
    pub fn tree_entries(&self, tree: &ObjectId) -> Result<Vec<(String, i32, ObjectId)>, ForgeError> {
        let repo = self.repo()?;
        let tree = repo
            .find_tree(to_oid(tree)?)
            .map_err(|e| storage(e, "cannot read tree"))?;
        tree.iter()
            .map(|entry| {
                let name = entry
                    .name()
                    .ok_or_else(|| ForgeError::Storage("tree entry name is not UTF-8".into()))?
                    .to_string();
                Ok((name, entry.filemode(), from_oid(entry.id())?))
            })
            .collect()
    }

    /// Raw content of a stored blob.
    pub fn blob_content(&self, blob: &ObjectId) -> Result<Vec<u8>, ForgeError> {
        let repo = self.repo()?;
        let blob = repo
            .find_blob(to_oid(blob)?)
            .map_err(|e| storage(e, "cannot read blob"))?;
        Ok(blob.content().to_vec())
    }
}

#[async_trait]
impl Forge for LocalForge {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn create_blob(&self, request: CreateBlobRequest) -> Result<ObjectId, ForgeError> {
        let bytes = request.decode()?;
        let repo = self.repo()?;
        let oid = repo
            .blob(&bytes)
            .map_err(|e| storage(e, "cannot write blob"))?;
        from_oid(oid)
    }

    async fn create_tree(&self, entries: Vec<TreeEntryRequest>) -> Result<ObjectId, ForgeError> {
        let repo = self.repo()?;
        let mut builder = repo
            .treebuilder(None)
            .map_err(|e| storage(e, "cannot start tree"))?;

        for entry in &entries {
            let oid = to_oid(&entry.id)?;
            let expected = match entry.kind {
                ObjectKind::Blob => ObjectType::Blob,
                ObjectKind::Tree => ObjectType::Tree,
            };
            repo.find_object(oid, Some(expected)).map_err(|_| {
                ForgeError::InvalidRequest(format!(
                    "tree entry '{}' references unknown {} {}",
                    entry.name, entry.kind, entry.id
                ))
            })?;
            let mode = match (entry.kind, entry.mode) {
                (ObjectKind::Tree, _) => EntryMode::Directory,
                (ObjectKind::Blob, mode) => mode,
            };
            builder
                .insert(&entry.name, oid, mode.as_i32())
                .map_err(|e| storage(e, "cannot add tree entry"))?;
        }

        let oid = builder
            .write()
            .map_err(|e| storage(e, "cannot write tree"))?;
        from_oid(oid)
    }

    async fn create_commit(
        &self,
        request: CreateCommitRequest,
    ) -> Result<CreatedCommit, ForgeError> {
        let repo = self.repo()?;
        let tree = repo
            .find_tree(to_oid(&request.tree)?)
            .map_err(|e| storage(e, "cannot read tree"))?;
        let author = signature(&request.author)?;
        let committer = signature(&request.committer)?;

        let oid = repo
            .commit(None, &author, &committer, &request.message, &tree, &[])
            .map_err(|e| storage(e, "cannot write commit"))?;
        let id = from_oid(oid)?;
        let url = format!("file://{}#{}", self.path.display(), id);
        Ok(CreatedCommit { id, url })
    }

    async fn update_ref(&self, request: UpdateRefRequest) -> Result<(), ForgeError> {
        let repo = self.repo()?;
        let refname = RefName::for_branch(&request.branch);
        let oid = to_oid(&request.commit)?;
        repo.reference(refname.as_str(), oid, request.force, "sitepush: publish")
            .map_err(|e| match e.code() {
                ErrorCode::Exists => ForgeError::InvalidRequest(format!(
                    "{} already exists and force is off",
                    refname
                )),
                _ => storage(e, "cannot update ref"),
            })?;
        Ok(())
    }

    async fn archive_link(
        &self,
        _reference: &BranchName,
        _format: ArchiveFormat,
    ) -> Result<String, ForgeError> {
        Err(ForgeError::NotImplemented(
            "archive downloads are not served by a local store".into(),
        ))
    }

    async fn current_user(&self) -> Result<ForgeUser, ForgeError> {
        let repo = self.repo()?;
        let config = repo
            .config()
            .map_err(|e| storage(e, "cannot read git config"))?;
        let name = config
            .get_string("user.name")
            .map_err(|_| ForgeError::NotFound("user.name is not configured".into()))?;
        let email = config.get_string("user.email").ok();
        Ok(ForgeUser {
            login: name.clone(),
            name: Some(name),
            email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn blob_ids_match_git() {
        let dir = TempDir::new().unwrap();
        let forge = LocalForge::open_or_init(dir.path().join("store.git")).unwrap();
        let id = forge
            .create_blob(CreateBlobRequest::base64(b"hello\n"))
            .await
            .unwrap();
        // `printf 'hello\n' | git hash-object --stdin`
        assert_eq!(id.as_str(), "ce013625030ba8dba906f756967f9e9ca394464a");
    }

    #[tokio::test]
    async fn empty_tree_has_well_known_id() {
        let dir = TempDir::new().unwrap();
        let forge = LocalForge::open_or_init(dir.path().join("store.git")).unwrap();
        let id = forge.create_tree(Vec::new()).await.unwrap();
        assert_eq!(id.as_str(), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
    }

    #[tokio::test]
    async fn reopening_keeps_objects() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.git");
        let id = {
            let forge = LocalForge::open_or_init(&path).unwrap();
            forge
                .create_blob(CreateBlobRequest::base64(b"persist"))
                .await
                .unwrap()
        };
        let forge = LocalForge::open_or_init(&path).unwrap();
        assert_eq!(forge.blob_content(&id).unwrap(), b"persist");
    }

    #[test]
    fn non_repository_directory_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let site = dir.path().join("public");
        std::fs::create_dir(&site).unwrap();
        std::fs::write(site.join("index.html"), "<h1>hi</h1>").unwrap();

        let result = LocalForge::open_or_init(&site);

        assert!(result.is_err());
        let contents: Vec<_> = std::fs::read_dir(&site)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(contents, vec!["index.html"]);
    }

    #[test]
    fn empty_directory_is_initialized() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("store.git");
        std::fs::create_dir(&store).unwrap();

        LocalForge::open_or_init(&store).unwrap();

        assert!(store.join("HEAD").is_file());
        assert!(LocalForge::open_or_init(&store).is_ok());
    }

    #[tokio::test]
    async fn dangling_tree_entry_is_rejected() {
        let dir = TempDir::new().unwrap();
        let forge = LocalForge::open_or_init(dir.path().join("store.git")).unwrap();
        let result = forge
            .create_tree(vec![TreeEntryRequest {
                name: "missing".into(),
                mode: EntryMode::File,
                kind: ObjectKind::Blob,
                id: ObjectId::new("1".repeat(40)).unwrap(),
            }])
            .await;
        assert!(matches!(result, Err(ForgeError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn archive_link_is_not_supported() {
        let dir = TempDir::new().unwrap();
        let forge = LocalForge::open_or_init(dir.path().join("store.git")).unwrap();
        let branch = BranchName::new("master").unwrap();
        assert!(matches!(
            forge.archive_link(&branch, ArchiveFormat::Tarball).await,
            Err(ForgeError::NotImplemented(_))
        ));
    }
}
