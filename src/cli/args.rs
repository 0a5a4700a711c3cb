//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sitepush - publish a static site directory to a git branch
#[derive(Parser, Debug)]
#[command(name = "sitepush")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if sitepush was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; prints only results such as the commit id
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use this global config file instead of the default locations
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish a directory as the new tip of a branch
    #[command(
        long_about = "Publish a directory as the new tip of a branch.\n\n\
            Every file under DIR is stored as a blob, every directory as a tree, \
            and a single parentless commit is created for the root. The branch is \
            then force-updated to that commit; its previous history is replaced.",
        after_help = "\
EXAMPLES:
    # Publish a built site to gh-pages
    sitepush publish public --owner octocat --repo octocat.github.io

    # Publish into a local bare repository instead of GitHub
    sitepush publish public --store local --local-repo /srv/site.git"
    )]
    Publish(PublishArgs),

    /// Fetch a source branch, build it, and publish the output
    #[command(
        long_about = "Fetch a source branch, build it, and publish the output.\n\n\
            The source branch is downloaded into a fresh work directory, built with \
            the configured site generator (hugo by default), and the build output \
            is published like `sitepush publish`. The work directory is always \
            removed afterwards; if removal fails the run is reported as fatal."
    )]
    Deploy(DeployArgs),

    /// Store or inspect GitHub credentials
    Auth {
        /// Token to store (prompted for when omitted)
        #[arg(long)]
        token: Option<String>,

        /// Show whether a token is available
        #[arg(long, conflicts_with_all = ["token", "logout"])]
        status: bool,

        /// Remove the stored token
        #[arg(long, conflicts_with = "token")]
        logout: bool,
    },

    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments of `sitepush publish`.
#[derive(clap::Args, Debug, Clone)]
pub struct PublishArgs {
    /// Directory to publish
    pub dir: PathBuf,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Commit message
    #[arg(short, long)]
    pub message: Option<String>,

    /// Object store: github or local
    #[arg(long)]
    pub store: Option<String>,

    /// Bare repository used with --store local
    #[arg(long, value_name = "PATH")]
    pub local_repo: Option<PathBuf>,

    /// Maximum concurrent store calls per stage
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Follow symbolic links instead of skipping them
    #[arg(long)]
    pub follow_symlinks: bool,
}

/// Arguments of `sitepush deploy`.
#[derive(clap::Args, Debug, Clone)]
pub struct DeployArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Branch holding the site sources
    #[arg(long)]
    pub source_branch: Option<String>,

    /// Commit message
    #[arg(short, long)]
    pub message: Option<String>,

    /// Directory under which the work directory is created
    #[arg(long, value_name = "PATH")]
    pub workdir: Option<PathBuf>,
}

/// Repository and branch selection shared by publish and deploy.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct TargetArgs {
    /// Repository owner
    #[arg(long)]
    pub owner: Option<String>,

    /// Repository name
    #[arg(long)]
    pub repo: Option<String>,

    /// Branch to publish to
    #[arg(short, long)]
    pub branch: Option<String>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// List effective settings
    List,

    /// Print one effective setting
    Get {
        /// Dotted key, e.g. publish.concurrency
        key: String,
    },

    /// Write sitepush.toml in the current directory
    Init {
        #[command(flatten)]
        target: TargetArgs,

        /// Branch holding the site sources
        #[arg(long)]
        source_branch: Option<String>,

        /// Overwrite an existing sitepush.toml
        #[arg(long)]
        force: bool,
    },
}
