//! publish::blobs
//!
//! Stores file contents as blobs.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, instrument};

use super::error::{PublishError, PublishStage};
use crate::core::types::ObjectId;
use crate::forge::{CreateBlobRequest, Forge, ForgeError};

/// Publishes file contents to the store.
///
/// There is no cache here: identical bytes get identical ids because the
/// store is content addressed.
pub struct BlobPublisher<'a> {
    forge: &'a dyn Forge,
    concurrency: usize,
}

impl<'a> BlobPublisher<'a> {
    pub fn new(forge: &'a dyn Forge, concurrency: usize) -> Self {
        Self {
            forge,
            concurrency: concurrency.max(1),
        }
    }

    /// Base64-encode `bytes` and store them.
    pub async fn publish(&self, bytes: &[u8]) -> Result<ObjectId, ForgeError> {
        self.forge
            .create_blob(CreateBlobRequest::base64(bytes))
            .await
    }

    /// Read and store one file, `relative` to `root`.
    pub async fn publish_file(&self, root: &Path, relative: &Path) -> Result<ObjectId, PublishError> {
        let absolute = root.join(relative);
        let bytes = tokio::fs::read(&absolute)
            .await
            .map_err(|source| PublishError::Io {
                stage: PublishStage::Blob,
                path: relative.to_path_buf(),
                source,
            })?;
        let id = self
            .publish(&bytes)
            .await
            .map_err(PublishError::remote(PublishStage::Blob, relative))?;
        debug!(path = %relative.display(), size = bytes.len(), blob = %id.short(7), "stored blob");
        Ok(id)
    }

    /// Store many files with bounded concurrency.
    ///
    /// The first failure cancels the files still in flight.
    #[instrument(skip_all, fields(files = files.len()))]
    pub async fn publish_files(
        &self,
        root: &Path,
        files: Vec<PathBuf>,
    ) -> Result<Vec<(PathBuf, ObjectId)>, PublishError> {
        stream::iter(files)
            .map(|relative| async move {
                let id = self.publish_file(root, &relative).await?;
                Ok::<_, PublishError>((relative, id))
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await
    }
}
