//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Async Commands
//!
//! Publishing and deploying involve network I/O. Handlers stay synchronous
//! and drive the async pipeline on a Tokio runtime built per invocation.

mod auth;
mod config_cmd;
mod deploy;
mod publish;

pub use auth::auth;
pub use config_cmd::{get as config_get, init as config_init, list as config_list};
pub use deploy::deploy;
pub use publish::publish;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context as _, Result};
use tracing::debug;

use super::args::{Command, ConfigAction, TargetArgs};
use super::Context;
use crate::auth::{StoredTokenProvider, TokenProvider};
use crate::core::types::{BranchName, CommitAuthor};
use crate::forge::{create_forge, Forge, ForgeOptions, ForgeProvider};
use crate::secrets;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Publish(args) => publish::publish(ctx, &args),
        Command::Deploy(args) => deploy::deploy(ctx, &args),
        Command::Auth {
            token,
            status,
            logout,
        } => auth::auth(ctx, token.as_deref(), status, logout),
        Command::Config { action } => match action {
            ConfigAction::List => config_cmd::list(ctx),
            ConfigAction::Get { key } => config_cmd::get(ctx, &key),
            ConfigAction::Init {
                target,
                source_branch,
                force,
            } => config_cmd::init(ctx, &target, source_branch.as_deref(), force),
        },
    }
}

/// Build the Tokio runtime async handlers run on.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

/// Repository coordinates after applying flags over configuration.
#[derive(Debug, Clone)]
pub(crate) struct Target {
    pub owner: String,
    pub repo: String,
    pub branch: BranchName,
}

impl Target {
    /// Resolve owner, repo and branch. Owner and repo may stay empty for
    /// the local store, which does not use them.
    pub fn resolve(ctx: &Context, args: &TargetArgs, require_repo: bool) -> Result<Self> {
        let owner = args
            .owner
            .clone()
            .or_else(|| ctx.config.owner().map(String::from))
            .unwrap_or_default();
        let repo = args
            .repo
            .clone()
            .or_else(|| ctx.config.repo().map(String::from))
            .unwrap_or_default();
        if require_repo && (owner.is_empty() || repo.is_empty()) {
            bail!(
                "Repository not set. Pass --owner and --repo or run 'sitepush config init'."
            );
        }

        let branch = args
            .branch
            .as_deref()
            .unwrap_or_else(|| ctx.config.branch());
        let branch = BranchName::new(branch).context("Invalid branch name")?;

        Ok(Self {
            owner,
            repo,
            branch,
        })
    }
}

/// Open the object store selected by `store` (or the configured default).
pub(crate) fn open_forge(
    ctx: &Context,
    store: Option<&str>,
    target: &Target,
    local_repo: Option<PathBuf>,
) -> Result<Box<dyn Forge>> {
    let name = store.unwrap_or_else(|| ctx.config.store());
    let provider = ForgeProvider::parse(name).ok_or_else(|| {
        anyhow!(
            "Unknown store '{}'. Valid stores: {}",
            name,
            crate::forge::valid_forge_names().join(", ")
        )
    })?;

    let options = match provider {
        ForgeProvider::GitHub => ForgeOptions {
            api_base: ctx.config.api_base().to_string(),
            timeout: ctx.config.timeout(),
            ..ForgeOptions::github(target.owner.clone(), target.repo.clone())
        },
        ForgeProvider::Local => {
            let path = local_repo
                .or_else(|| ctx.config.local_repo().map(PathBuf::from))
                .ok_or_else(|| anyhow!("The local store needs --local-repo <PATH>."))?;
            ForgeOptions::local(ctx.resolve(&path))
        }
    };

    let tokens = match provider {
        ForgeProvider::GitHub => Some(token_provider(ctx)?),
        ForgeProvider::Local => None,
    };

    debug!(store = %provider, "opening object store");
    create_forge(&options, tokens).context("Failed to open object store")
}

fn token_provider(ctx: &Context) -> Result<Arc<dyn TokenProvider>> {
    let store = secrets::create_store(ctx.config.secrets_provider())
        .context("Failed to initialize secret store")?;
    let host = host_of(ctx.config.api_base());
    Ok(Arc::new(StoredTokenProvider::new(host, store)))
}

/// Host part of an API base URL, for messages.
fn host_of(api_base: &str) -> String {
    let rest = api_base
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(api_base);
    let host = rest.split('/').next().unwrap_or(rest);
    match host {
        "api.github.com" => "github.com".to_string(),
        other => other.to_string(),
    }
}

/// Commit author from configuration, else from the authenticated user.
pub(crate) async fn resolve_author(ctx: &Context, forge: &dyn Forge) -> Result<CommitAuthor> {
    if let Some((name, email, login)) = ctx.config.author() {
        return Ok(CommitAuthor::now(name, email, login.map(String::from)));
    }

    let user = forge
        .current_user()
        .await
        .context("Failed to look up the authenticated user; set [author] in the config")?;
    let name = user.name.unwrap_or_else(|| user.login.clone());
    let email = user
        .email
        .unwrap_or_else(|| format!("{}@users.noreply.github.com", user.login));
    Ok(CommitAuthor::now(name, email, Some(user.login)))
}
