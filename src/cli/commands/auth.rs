//! cli::commands::auth
//!
//! Store, inspect or remove the GitHub personal access token.
//!
//! The token is never printed. `GITHUB_TOKEN` in the environment takes
//! precedence over a stored token when publishing.
//!
//! # Example
//!
//! ```bash
//! # Prompt for the token (input hidden)
//! sitepush auth
//!
//! # Non-interactive
//! sitepush auth --token ghp_xxxx
//!
//! sitepush auth --status
//! sitepush auth --logout
//! ```

use std::io::{self, IsTerminal, Write};

use anyhow::{bail, Context as _, Result};

use crate::auth::{GITHUB_TOKEN_ENV, GITHUB_TOKEN_KEY};
use crate::cli::Context;
use crate::secrets::{self, SecretStore};
use crate::ui::output;

/// Run the auth command.
pub fn auth(ctx: &Context, token: Option<&str>, status: bool, logout: bool) -> Result<()> {
    let store = secrets::create_store(ctx.config.secrets_provider())
        .context("Failed to initialize secret store")?;

    if status {
        return show_status(store.as_ref(), ctx);
    }
    if logout {
        return do_logout(store.as_ref(), ctx);
    }

    let token_value = match token {
        Some(t) => t.trim().to_string(),
        None => prompt_token(ctx)?,
    };
    validate_token(&token_value)?;

    store
        .set(GITHUB_TOKEN_KEY, &token_value)
        .context("Failed to store token")?;

    output::print("Token stored.", ctx.verbosity);
    Ok(())
}

fn show_status(store: &dyn SecretStore, ctx: &Context) -> Result<()> {
    let from_env = std::env::var(GITHUB_TOKEN_ENV)
        .map(|t| !t.trim().is_empty())
        .unwrap_or(false);
    let stored = store.exists(GITHUB_TOKEN_KEY)?;

    if ctx.quiet() {
        // Machine-readable
        println!(
            "{}",
            if from_env || stored {
                "authenticated"
            } else {
                "not_authenticated"
            }
        );
    } else if from_env {
        println!("Authenticated through {}.", GITHUB_TOKEN_ENV);
    } else if stored {
        println!("Authenticated with a stored token.");
    } else {
        println!("Not authenticated.");
        println!("Run 'sitepush auth' or set {}.", GITHUB_TOKEN_ENV);
    }
    Ok(())
}

fn do_logout(store: &dyn SecretStore, ctx: &Context) -> Result<()> {
    store
        .delete(GITHUB_TOKEN_KEY)
        .context("Failed to remove stored token")?;
    output::print("Stored token removed.", ctx.verbosity);
    Ok(())
}

fn prompt_token(ctx: &Context) -> Result<String> {
    if ctx.quiet() || !io::stdin().is_terminal() {
        bail!("Token required. Use --token <TOKEN> or run interactively.");
    }

    print!("GitHub personal access token: ");
    io::stdout().flush()?;
    let token = rpassword::read_password().context("Failed to read token")?;
    Ok(token.trim().to_string())
}

/// Basic shape checks; the token is not checked against the API here.
fn validate_token(token: &str) -> Result<()> {
    if token.is_empty() {
        bail!("Token cannot be empty.");
    }
    if token.len() < 10 {
        bail!("Token appears to be too short.");
    }
    if token.chars().any(char::is_whitespace) {
        bail!("Token should not contain whitespace.");
    }
    Ok(())
}
