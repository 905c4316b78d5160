//! `nile health`: probe `GET /health` and report backend and database status.
//!
//! Exits non-zero unless the backend reports `ok`.

use anyhow::Result;

use crate::api::ApiClient;
use crate::config::Config;

/// `nile health`: print backend and database status.
pub async fn run_health(config: &Config) -> Result<()> {
    let api = ApiClient::from_config(config);
    let health = api.health().await?;

    println!("{:<10} {}", "backend", api.base_url().unwrap_or("-"));
    println!("{:<10} {}", "status", health.status);
    if let Some(ref db) = health.database {
        println!("{:<10} {}", "database", db);
    }
    if let Some(ref detail) = health.detail {
        println!("{:<10} {}", "detail", detail);
    }

    if !health.is_ok() {
        anyhow::bail!("backend reports status '{}'", health.status);
    }
    Ok(())
}
