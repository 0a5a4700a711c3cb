//! site
//!
//! The deploy pipeline around the publisher: fetch a branch's sources, build
//! them with a static site generator, publish the output, clean up.

mod build;
mod deploy;
mod fetch;

pub use build::{BuildError, CommandBuilder, SiteBuilder, DEFAULT_BUILD_COMMAND, DEFAULT_OUTPUT_DIR};
pub use deploy::{DeployError, DeployRequest, Deployer};
pub use fetch::{extract_tarball, ArchiveFetcher, ContentFetcher, FetchError};
