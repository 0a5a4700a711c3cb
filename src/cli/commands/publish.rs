//! cli::commands::publish
//!
//! Publish a local directory as the new tip of a branch.
//!
//! # Example
//!
//! ```bash
//! sitepush publish public --owner octocat --repo octocat.github.io --branch master
//! sitepush publish public --store local --local-repo ./site.git
//! ```

use anyhow::{bail, Context as _, Result};

use super::{open_forge, resolve_author, runtime, Target};
use crate::cli::args::PublishArgs;
use crate::cli::Context;
use crate::core::config::PublishDefaults;
use crate::forge::ForgeProvider;
use crate::publish::{PublishOptions, PublishRequest, Publisher, WalkOptions};
use crate::ui::output;

/// Run the publish command.
pub fn publish(ctx: &Context, args: &PublishArgs) -> Result<()> {
    let source_dir = ctx.resolve(&args.dir);
    if !source_dir.is_dir() {
        bail!("'{}' is not a directory", source_dir.display());
    }

    let store = args.store.as_deref().unwrap_or_else(|| ctx.config.store());
    let needs_repo = ForgeProvider::parse(store) != Some(ForgeProvider::Local);
    let target = Target::resolve(ctx, &args.target, needs_repo)?;

    let concurrency = args.concurrency.unwrap_or_else(|| ctx.config.concurrency());
    if !(1..=PublishDefaults::MAX_CONCURRENCY).contains(&concurrency) {
        bail!(
            "--concurrency must be between 1 and {}, got {}",
            PublishDefaults::MAX_CONCURRENCY,
            concurrency
        );
    }
    let options = PublishOptions {
        concurrency,
        walk: WalkOptions {
            follow_symlinks: args.follow_symlinks || ctx.config.follow_symlinks(),
            ignore: ctx.config.ignore(),
        },
    };
    let message = args
        .message
        .clone()
        .unwrap_or_else(|| ctx.config.message().to_string());

    let forge = open_forge(ctx, Some(store), &target, args.local_repo.clone())?;

    let rt = runtime()?;
    let outcome = rt.block_on(async {
        let author = resolve_author(ctx, forge.as_ref()).await?;
        let request = PublishRequest {
            owner: target.owner.clone(),
            repo: target.repo.clone(),
            source_dir: source_dir.clone(),
            branch: target.branch.clone(),
            author,
            message,
        };
        Publisher::new(forge.as_ref(), options)
            .publish(&request)
            .await
            .with_context(|| format!("Failed to publish {}", source_dir.display()))
    })?;

    println!(
        "{}",
        output::format_outcome(&outcome, target.branch.as_str(), ctx.verbosity)
    );
    Ok(())
}
