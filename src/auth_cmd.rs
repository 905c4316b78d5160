//! `nile login`, `nile logout`, `nile whoami`.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::error::SessionError;
use crate::models::UserIdentity;
use crate::session::{SessionState, SessionStore};

/// Environment variable consulted for the password when `--password` is absent.
pub const PASSWORD_ENV: &str = "NILE_PASSWORD";

pub async fn run_login(config: &Config, email: &str, password: Option<String>) -> Result<()> {
    let password = match resolve_password(password, std::env::var(PASSWORD_ENV).ok()) {
        Some(p) => p,
        None => prompt_password().await?,
    };

    let session = SessionStore::from_config(config);
    match session.login(email, &password).await {
        Ok(user) => {
            println!("Logged in.");
            print_identity(&user);
            Ok(())
        }
        Err(e @ SessionError::InvalidCredentials { .. }) => Err(e.into()),
        Err(e) => Err(e).context("Login failed"),
    }
}

pub fn run_logout(config: &Config) -> Result<()> {
    SessionStore::from_config(config).logout()?;
    println!("Logged out.");
    Ok(())
}

pub async fn run_whoami(config: &Config) -> Result<()> {
    let session = SessionStore::from_config(config);
    match session.initialize().await? {
        SessionState::Authenticated { user, .. } => print_identity(&user),
        _ => println!("Not logged in. Run `nile login <email>`."),
    }
    Ok(())
}

fn print_identity(user: &UserIdentity) {
    println!("id:    {}", user.id);
    println!("email: {}", user.email);
    println!("role:  {}", user.role);
}

/// `--password` wins over the environment; blank values count as absent.
fn resolve_password(flag: Option<String>, env: Option<String>) -> Option<String> {
    flag.into_iter().chain(env).find(|p| !p.is_empty())
}

/// Read the password from the terminal without echoing it.
async fn prompt_password() -> Result<String> {
    tokio::task::spawn_blocking(|| dialoguer::Password::new().with_prompt("Password").interact())
    .await
    .context("Password prompt task failed")?
    .with_context(|| format!("Failed to read password (pass --password or set {})", PASSWORD_ENV))
}
