//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Results go to stdout and respect the quiet flag. Warnings and errors go
//! to stderr. Structured progress is logged through `tracing` instead.

use std::fmt::Display;

use crate::publish::PublishOutcome;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Summarize a finished publish.
///
/// Quiet mode prints only the commit id so scripts can capture it.
pub fn format_outcome(outcome: &PublishOutcome, branch: &str, verbosity: Verbosity) -> String {
    match verbosity {
        Verbosity::Quiet => outcome.commit.to_string(),
        Verbosity::Normal => format!(
            "Published {} to {} ({} files, {} trees)",
            outcome.commit.short(7),
            branch,
            outcome.blobs,
            outcome.trees
        ),
        Verbosity::Debug => format!(
            "Published {} to {} ({} files, {} trees, {} empty directories skipped)\n  tree:   {}\n  commit: {}",
            outcome.commit,
            branch,
            outcome.blobs,
            outcome.trees,
            outcome.pruned,
            outcome.root_tree,
            outcome.commit_url
        ),
    }
}
