//! config command - List, get, or initialize configuration

use anyhow::{bail, Context as _, Result};

use crate::cli::args::TargetArgs;
use crate::cli::Context;
use crate::core::config::{Config, SiteConfig};
use crate::ui::output;

/// List all effective configuration values.
pub fn list(ctx: &Context) -> Result<()> {
    if !ctx.quiet() {
        match ctx.config.global_config_loaded_from() {
            Some(path) => println!("# global: {}", path.display()),
            None => println!("# global: (defaults)"),
        }
        match ctx.config.site_config_loaded_from() {
            Some(path) => println!("# site: {}", path.display()),
            None => println!("# site: (none)"),
        }
    }
    for (key, value) in ctx.config.entries() {
        println!("{} = {}", key, value);
    }
    Ok(())
}

/// Print one configuration value.
///
/// A known key without a value prints nothing.
pub fn get(ctx: &Context, key: &str) -> Result<()> {
    if let Some(value) = ctx.config.get(key)? {
        println!("{}", value);
    }
    Ok(())
}

/// Write `sitepush.toml` in the working directory.
pub fn init(
    ctx: &Context,
    target: &TargetArgs,
    source_branch: Option<&str>,
    force: bool,
) -> Result<()> {
    let path = Config::site_config_path(&ctx.cwd);
    if path.exists() && !force {
        bail!(
            "'{}' already exists. Use --force to overwrite.",
            path.display()
        );
    }

    let site = SiteConfig {
        owner: target.owner.clone(),
        repo: target.repo.clone(),
        branch: target.branch.clone(),
        source_branch: source_branch.map(String::from),
        local_repo: None,
    };
    let written = Config::write_site(&ctx.cwd, &site).context("Failed to write site config")?;

    output::print(format!("Wrote {}", written.display()), ctx.verbosity);
    Ok(())
}
