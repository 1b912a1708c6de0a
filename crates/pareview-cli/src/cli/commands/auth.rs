//! Auth command handlers.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use pareview_core::{ApiError, CredentialStore};
use tracing::debug;

use crate::cli::context::AppContext;
use crate::output::print_json;

fn prompt_line(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Whether a keychain entry was removed. Failures only reach the debug log:
/// the login error is what the user needs to see.
fn forgotten(result: Result<()>, username: &str) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            debug!(username = %username, error = %e, "Failed to remove stale keychain password");
            false
        }
    }
}

pub async fn login(ctx: &AppContext, username: Option<String>, remember: bool) -> Result<()> {
    if ctx.offline {
        anyhow::bail!("Cannot log in with --offline");
    }

    let username = match username.or_else(|| ctx.config.last_username.clone()) {
        Some(u) => u,
        None => prompt_line("Username: ")?,
    };
    if username.is_empty() {
        anyhow::bail!("Username cannot be empty");
    }

    let (password, from_keychain) = match CredentialStore::get_password(&username) {
        Ok(stored) if !remember => {
            debug!(username = %username, "Using password from keychain");
            (stored, true)
        }
        _ => (rpassword::prompt_password("Password: ").context("read password")?, false),
    };

    let user = match ctx.client.login(&username, &password).await {
        Ok(user) => user,
        Err(ApiError::Unauthorized) => {
            if from_keychain {
                // The saved password is stale; forget it so the next attempt prompts.
                forgotten(CredentialStore::delete(&username), &username);
            }
            anyhow::bail!("Invalid username or password");
        }
        Err(e) => return Err(e.into()),
    };

    if remember {
        CredentialStore::store(&username, &password)?;
    }

    let mut config = ctx.config.clone();
    config.last_username = Some(username);
    config.save().context("save config")?;

    println!("Logged in as {}", user.display_name());
    Ok(())
}

pub fn logout(ctx: &AppContext) -> Result<()> {
    ctx.client.logout();
    ctx.cache.clear()?;
    println!("Logged out.");
    Ok(())
}

pub async fn whoami(ctx: &AppContext, verify: bool) -> Result<()> {
    let Some(user) = ctx.session().user().filter(|_| ctx.session().is_authenticated()) else {
        println!("Not logged in.");
        return Ok(());
    };

    let valid = if verify && !ctx.offline {
        Some(ctx.client.verify().await?)
    } else {
        None
    };

    if ctx.json {
        return print_json(&serde_json::json!({ "user": user, "token_valid": valid }));
    }

    println!("{} ({})", user.display_name(), user.username);
    if !user.email.is_empty() {
        println!("{}", user.email);
    }
    match valid {
        Some(true) => println!("Access token is valid."),
        Some(false) => println!("Access token has expired; the next request will renew it."),
        None => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_keychain_removal_failure_is_not_fatal() {
        assert!(forgotten(Ok(()), "trader"));
        assert!(!forgotten(Err(anyhow::anyhow!("no matching entry")), "trader"));
    }
}
