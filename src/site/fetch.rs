//! site::fetch
//!
//! Materializes a branch of the source repository on local disk.
//!
//! The forge resolves a short-lived archive URL for the branch; the archive is
//! downloaded and unpacked into the work directory. GitHub archives wrap the
//! tree in a single `owner-repo-sha/` directory, which is stripped so the work
//! directory holds the site sources directly.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::types::BranchName;
use crate::forge::{ArchiveFormat, Forge, ForgeError};

/// Errors from fetching site sources.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The forge could not resolve the archive.
    #[error("cannot resolve archive: {0}")]
    Forge(#[from] ForgeError),

    /// Downloading the archive failed.
    #[error("download failed: {0}")]
    Download(String),

    /// The archive could not be unpacked.
    #[error("invalid archive: {0}")]
    Archive(String),

    /// Writing to the work directory failed.
    #[error("cannot write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Puts the sources of a branch into a directory.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Materialize `reference` into `dest`, which already exists and is empty.
    async fn fetch(
        &self,
        forge: &dyn Forge,
        reference: &BranchName,
        dest: &Path,
    ) -> Result<(), FetchError>;
}

/// Downloads and unpacks a gzipped tarball of the branch.
#[derive(Debug, Clone)]
pub struct ArchiveFetcher {
    client: reqwest::Client,
}

impl ArchiveFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent("sitepush")
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Download(e.to_string()))?;
        Ok(Self { client })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Download(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Download(format!("server answered {}", status)));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Download(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ContentFetcher for ArchiveFetcher {
    async fn fetch(
        &self,
        forge: &dyn Forge,
        reference: &BranchName,
        dest: &Path,
    ) -> Result<(), FetchError> {
        let url = forge.archive_link(reference, ArchiveFormat::Tarball).await?;
        debug!(%reference, "resolved archive link");

        let archive = self.download(&url).await?;
        let size = archive.len();
        let target = dest.to_path_buf();
        let files = tokio::task::spawn_blocking(move || extract_tarball(&archive, &target))
            .await
            .map_err(|e| FetchError::Archive(format!("extraction task failed: {}", e)))??;

        info!(%reference, bytes = size, files, dest = %dest.display(), "fetched sources");
        Ok(())
    }
}

/// Unpack a `.tar.gz` into `dest`, dropping the leading directory.
///
/// Returns the number of files written. Entries that would land outside
/// `dest` are rejected.
pub fn extract_tarball(archive: &[u8], dest: &Path) -> Result<usize, FetchError> {
    let mut tar = tar::Archive::new(GzDecoder::new(archive));
    let entries = tar
        .entries()
        .map_err(|e| FetchError::Archive(e.to_string()))?;

    let mut files = 0;
    for entry in entries {
        let mut entry = entry.map_err(|e| FetchError::Archive(e.to_string()))?;
        let path = entry
            .path()
            .map_err(|e| FetchError::Archive(e.to_string()))?
            .into_owned();

        let Some(relative) = strip_leading_dir(&path)? else {
            continue;
        };
        let target = dest.join(&relative);

        let kind = entry.header().entry_type();
        if kind.is_dir() {
            std::fs::create_dir_all(&target).map_err(|source| FetchError::Io {
                path: target.clone(),
                source,
            })?;
        } else if kind.is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|source| FetchError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            entry.unpack(&target).map_err(|source| FetchError::Io {
                path: target.clone(),
                source,
            })?;
            files += 1;
        }
        // Links and pax headers carry nothing a site build needs.
    }
    Ok(files)
}

fn strip_leading_dir(path: &Path) -> Result<Option<PathBuf>, FetchError> {
    let mut components = path.components();
    components.next();
    let mut relative = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => {
                return Err(FetchError::Archive(format!(
                    "entry escapes the archive root: {}",
                    path.display()
                )))
            }
        }
    }
    Ok((!relative.as_os_str().is_empty()).then_some(relative))
}
