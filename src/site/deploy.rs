//! site::deploy
//!
//! Fetch, build and publish a site from one branch to another.
//!
//! # Flow
//!
//! 1. Create a fresh work directory under the configured work root
//! 2. Fetch the source branch into it
//! 3. Run the site builder over it
//! 4. Publish `<workdir>/<output_dir>` to the target branch
//! 5. Remove the work directory
//!
//! Step 5 runs whether or not the earlier steps succeeded. If removal fails
//! the result is [`DeployError::Cleanup`], which keeps the earlier failure (if
//! any) as `prior`. Callers must treat it as fatal: the disk no longer looks
//! the way the operator expects.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info, instrument};

use super::build::{BuildError, SiteBuilder};
use super::fetch::{ContentFetcher, FetchError};
use crate::core::types::{BranchName, CommitAuthor};
use crate::forge::Forge;
use crate::publish::{
    PublishError, PublishOptions, PublishOutcome, PublishRequest, PublishStage, Publisher,
};

/// Errors from a deploy run.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("cannot create work directory {}: {source}", .path.display())]
    Workdir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("build failed: {0}")]
    Build(#[from] BuildError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    /// The work directory could not be removed.
    #[error("cannot remove work directory {}: {source}{}", .path.display(), describe_prior(.prior))]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
        /// Failure that happened before cleanup, if any
        prior: Option<Box<DeployError>>,
    },
}

fn describe_prior(prior: &Option<Box<DeployError>>) -> String {
    match prior {
        Some(prior) => format!(" (after: {})", prior),
        None => String::new(),
    }
}

impl DeployError {
    pub fn stage(&self) -> PublishStage {
        match self {
            DeployError::Workdir { .. } | DeployError::Fetch(_) => PublishStage::Fetch,
            DeployError::Build(_) => PublishStage::Build,
            DeployError::Publish(e) => e.stage(),
            DeployError::Cleanup { .. } => PublishStage::Cleanup,
        }
    }

    /// Whether automated retries must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DeployError::Cleanup { .. })
    }
}

/// A deploy run.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub owner: String,
    pub repo: String,
    /// Branch holding the site sources
    pub source_branch: BranchName,
    /// Branch the built site is published to
    pub branch: BranchName,
    pub author: CommitAuthor,
    pub message: String,
    /// Directory under which the work directory is created
    pub work_root: PathBuf,
    /// Build output, relative to the sources
    pub output_dir: PathBuf,
}

/// Wires a fetcher, a builder and the publisher together.
pub struct Deployer<'a> {
    forge: &'a dyn Forge,
    fetcher: &'a dyn ContentFetcher,
    builder: &'a dyn SiteBuilder,
    options: PublishOptions,
}

impl<'a> Deployer<'a> {
    pub fn new(
        forge: &'a dyn Forge,
        fetcher: &'a dyn ContentFetcher,
        builder: &'a dyn SiteBuilder,
        options: PublishOptions,
    ) -> Self {
        Self {
            forge,
            fetcher,
            builder,
            options,
        }
    }

    #[instrument(
        skip_all,
        fields(repo = %request.repo, from = %request.source_branch, to = %request.branch)
    )]
    pub async fn deploy(&self, request: &DeployRequest) -> Result<PublishOutcome, DeployError> {
        let workdir = request
            .work_root
            .join(format!("sitepush-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&workdir)
            .await
            .map_err(|source| DeployError::Workdir {
                path: workdir.clone(),
                source,
            })?;

        let result = self.run(request, &workdir).await;
        let cleanup = remove_workdir(&workdir).await;
        finish(result, cleanup, workdir)
    }

    async fn run(
        &self,
        request: &DeployRequest,
        workdir: &Path,
    ) -> Result<PublishOutcome, DeployError> {
        self.fetcher
            .fetch(self.forge, &request.source_branch, workdir)
            .await?;
        self.builder.build(workdir).await?;

        let output = workdir.join(&request.output_dir);
        if !output.is_dir() {
            return Err(BuildError::MissingOutput(output.display().to_string()).into());
        }

        let publish = PublishRequest {
            owner: request.owner.clone(),
            repo: request.repo.clone(),
            source_dir: output,
            branch: request.branch.clone(),
            author: request.author.clone(),
            message: request.message.clone(),
        };
        let outcome = Publisher::new(self.forge, self.options.clone())
            .publish(&publish)
            .await?;
        info!(commit = %outcome.commit.short(7), "deployed");
        Ok(outcome)
    }
}

/// Remove the work directory; a directory that is already gone is fine.
async fn remove_workdir(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn finish(
    result: Result<PublishOutcome, DeployError>,
    cleanup: io::Result<()>,
    workdir: PathBuf,
) -> Result<PublishOutcome, DeployError> {
    match cleanup {
        Ok(()) => result,
        Err(source) => {
            error!(path = %workdir.display(), error = %source, "work directory cleanup failed");
            Err(DeployError::Cleanup {
                path: workdir,
                source,
                prior: result.err().map(Box::new),
            })
        }
    }
}
