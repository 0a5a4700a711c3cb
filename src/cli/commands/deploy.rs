//! cli::commands::deploy
//!
//! Build a site from its source branch and publish the output.
//!
//! Deploying always goes through GitHub: the sources are fetched as a branch
//! archive, which the local store cannot produce.

use anyhow::{anyhow, Context as _, Result};

use super::{open_forge, resolve_author, runtime, Target};
use crate::cli::args::DeployArgs;
use crate::cli::Context;
use crate::core::types::BranchName;
use crate::publish::{PublishOptions, WalkOptions};
use crate::site::{ArchiveFetcher, CommandBuilder, DeployRequest, Deployer};
use crate::ui::output;

/// Run the deploy command.
pub fn deploy(ctx: &Context, args: &DeployArgs) -> Result<()> {
    let target = Target::resolve(ctx, &args.target, true)?;
    let source_branch = args
        .source_branch
        .as_deref()
        .or_else(|| ctx.config.source_branch())
        .ok_or_else(|| anyhow!("Source branch not set. Pass --source-branch or set source_branch in sitepush.toml."))?;
    let source_branch = BranchName::new(source_branch).context("Invalid source branch name")?;

    let work_root = args
        .workdir
        .as_deref()
        .map(|p| ctx.resolve(p))
        .unwrap_or_else(|| ctx.config.work_root());
    let message = args
        .message
        .clone()
        .unwrap_or_else(|| ctx.config.message().to_string());
    let options = PublishOptions {
        concurrency: ctx.config.concurrency(),
        walk: WalkOptions {
            follow_symlinks: ctx.config.follow_symlinks(),
            ignore: ctx.config.ignore(),
        },
    };

    let forge = open_forge(ctx, Some("github"), &target, None)?;
    let fetcher = ArchiveFetcher::new(ctx.config.timeout())?;
    let builder = CommandBuilder::new(ctx.config.build_command(), ctx.config.build_args());

    let rt = runtime()?;
    let outcome = rt.block_on(async {
        let author = resolve_author(ctx, forge.as_ref()).await?;
        let request = DeployRequest {
            owner: target.owner.clone(),
            repo: target.repo.clone(),
            source_branch: source_branch.clone(),
            branch: target.branch.clone(),
            author,
            message,
            work_root,
            output_dir: ctx.config.output_dir(),
        };
        Deployer::new(forge.as_ref(), &fetcher, &builder, options)
            .deploy(&request)
            .await
            .map_err(anyhow::Error::from)
    })?;

    println!(
        "{}",
        output::format_outcome(&outcome, target.branch.as_str(), ctx.verbosity)
    );
    Ok(())
}
