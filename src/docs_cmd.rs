//! Admin document commands: `nile docs list | embed | upload`.
//!
//! Each command restores the persisted session first. Without a verified
//! user the request is still sent (unauthenticated); the backend decides
//! whether to reject it.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::error::ApiError;
use crate::models::DocumentDescriptor;
use crate::session::SessionStore;
use crate::upload::{CloudinaryStorage, UploadMediator};

async fn admin_session(config: &Config) -> Result<SessionStore> {
    let session = SessionStore::from_config(config);
    let state = session.initialize().await?;
    match state.user() {
        Some(user) if !user.is_admin() => {
            eprintln!("Warning: {} is not an admin; the backend may refuse this.", user.email)
        }
        Some(_) => {}
        None => eprintln!("Warning: not logged in; sending request without credentials."),
    }
    Ok(session)
}

fn auth_hint(err: ApiError) -> anyhow::Error {
    if err.is_auth_failure() {
        anyhow::Error::new(err).context("Not authorized. Run `nile login <email>` with an admin account")
    } else {
        err.into()
    }
}

pub async fn run_docs_list(config: &Config) -> Result<()> {
    let session = admin_session(config).await?;
    let token = session.token();
    let docs = session
        .api()
        .list_documents(token.as_deref())
        .await
        .map_err(auth_hint)?;
    print!("{}", format_document_table(&docs));
    Ok(())
}

/// Trigger embedding. The backend does not report completion; with
/// `refresh` the list is fetched once afterwards to show the current status.
pub async fn run_docs_embed(config: &Config, id: &str, refresh: bool) -> Result<()> {
    let session = admin_session(config).await?;
    let token = session.token();
    session
        .api()
        .trigger_embedding(token.as_deref(), id)
        .await
        .map_err(auth_hint)?;
    println!("Embedding requested for document {}.", id);

    if refresh {
        let docs = session
            .api()
            .list_documents(token.as_deref())
            .await
            .map_err(auth_hint)?;
        match docs.iter().find(|d| d.id == id) {
            Some(doc) => println!("Current status: {}", doc.status),
            None => println!("Document {} is not in the current list.", id),
        }
    }
    Ok(())
}

pub async fn run_docs_upload(config: &Config, path: &Path) -> Result<()> {
    let storage = CloudinaryStorage::from_config(&config.storage)?;
    let session = admin_session(config).await?;
    let token = session.token();
    let mediator = UploadMediator::new(session.api(), &storage, &config.upload);
    let published = mediator
        .publish_file(token.as_deref(), path)
        .await
        .with_context(|| format!("Upload of {} failed", path.display()))?;
    println!("Uploaded {} ({}).", published.filename, published.url);
    println!("Status: pending. Run `nile docs list` to follow embedding.");
    Ok(())
}

/// Render documents as a fixed-width table. An empty list renders a notice.
pub fn format_document_table(docs: &[DocumentDescriptor]) -> String {
    if docs.is_empty() {
        return "No documents uploaded yet.\n".to_string();
    }
    let mut out = format!(
        "{:<8} {:<36} {:<10} {:>10}  {}\n",
        "ID", "FILENAME", "STATUS", "SIZE", "UPLOADED"
    );
    for doc in docs {
        let uploaded = doc
            .uploaded_at()
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .or_else(|| doc.upload_date.clone())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<8} {:<36} {:<10} {:>10}  {}\n",
            doc.id,
            truncate(&doc.filename, 36),
            doc.status,
            doc.size.map(format_size).unwrap_or_else(|| "-".to_string()),
            uploaded
        ));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max - 1).collect();
        format!("{}…", head)
    }
}

pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}
