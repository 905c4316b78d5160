//! End-to-end tests of the `nile` binary against the mock backend.

mod common;

use common::spawn_backend;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn write_config(root: &Path, base_url: Option<&str>) -> PathBuf {
    let mut content = String::new();
    if let Some(url) = base_url {
        content.push_str(&format!("[backend]\nurl = \"{}\"\n\n", url));
    }
    content.push_str(&format!(
        "[session]\ntoken_path = \"{}\"\n",
        root.join("state/token").display()
    ));
    let path = root.join("nile.toml");
    fs::write(&path, content).unwrap();
    path
}

async fn run_nile(config: &Path, args: &[&str]) -> (String, String, bool) {
    let config = config.to_path_buf();
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    tokio::task::spawn_blocking(move || {
        let output = Command::new(env!("CARGO_BIN_EXE_nile"))
            .arg("--config")
            .arg(&config)
            .args(&args)
            .env_remove("NILE_API_URL")
            .env_remove("NILE_PASSWORD")
            .env_remove("NILE_CLOUD_NAME")
            .env_remove("NILE_UPLOAD_PRESET")
            .env_remove("RUST_LOG")
            .output()
            .expect("failed to run nile binary");
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.success(),
        )
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_ask_prints_answer_and_sources() {
    let backend = spawn_backend().await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), Some(backend.base_url.as_str()));

    let (stdout, stderr, ok) = run_nile(&config, &["ask", "What is X?"]).await;

    assert!(ok, "stderr: {}", stderr);
    assert!(stdout.contains("X is a fertilizer."));
    assert!(stdout.contains("sources: doc1"));
}

#[tokio::test]
async fn test_missing_backend_url_is_reported() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), None);

    let (_, stderr, ok) = run_nile(&config, &["ask", "What is X?"]).await;

    assert!(!ok);
    assert!(stderr.contains("backend address is not configured"));
}

fn run_nile_with_api_url(config: &Path, api_url: &str, args: &[&str]) -> (String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_nile"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env("NILE_API_URL", api_url)
        .env_remove("NILE_PASSWORD")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run nile binary");
    (
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

#[test]
fn test_env_backend_url_is_validated() {
    let tmp = TempDir::new().unwrap();
    let with_file = write_config(tmp.path(), Some("http://localhost:8000"));
    let without_file = tmp.path().join("absent.toml");

    for config in [&with_file, &without_file] {
        let (stderr, ok) = run_nile_with_api_url(config, "localhost:8000", &["health"]);
        assert!(!ok);
        assert!(stderr.contains("http:// or https://"), "stderr: {}", stderr);
        assert!(!stderr.contains("cannot reach backend"));
    }
}

#[tokio::test]
async fn test_login_list_logout_flow() {
    let backend = spawn_backend().await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), Some(backend.base_url.as_str()));

    let (stdout, stderr, ok) = run_nile(
        &config,
        &["login", "admin@example.com", "--password", "secret"],
    )
    .await;
    assert!(ok, "stderr: {}", stderr);
    assert!(stdout.contains("role:  admin"));
    assert!(tmp.path().join("state/token").exists());

    let (stdout, stderr, ok) = run_nile(&config, &["docs", "list"]).await;
    assert!(ok, "stderr: {}", stderr);
    assert!(stdout.contains("No documents uploaded yet."));

    let (stdout, _, ok) = run_nile(&config, &["logout"]).await;
    assert!(ok);
    assert!(stdout.contains("Logged out."));
    assert!(!tmp.path().join("state/token").exists());

    let (stdout, _, ok) = run_nile(&config, &["whoami"]).await;
    assert!(ok);
    assert!(stdout.contains("Not logged in"));
}

#[tokio::test]
async fn test_wrong_password_fails() {
    let backend = spawn_backend().await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), Some(backend.base_url.as_str()));

    let (_, stderr, ok) = run_nile(
        &config,
        &["login", "admin@example.com", "--password", "wrong"],
    )
    .await;

    assert!(!ok);
    assert!(stderr.contains("Invalid credentials"));
    assert!(!tmp.path().join("state/token").exists());
}

#[tokio::test]
async fn test_login_without_password_or_terminal_fails_cleanly() {
    let backend = spawn_backend().await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), Some(backend.base_url.as_str()));

    let (_, stderr, ok) = run_nile(&config, &["login", "admin@example.com"]).await;

    assert!(!ok);
    assert!(stderr.contains("NILE_PASSWORD"), "stderr: {}", stderr);
    assert!(!stderr.contains("secret"));
    assert_eq!(backend.recorded().token_calls, 0);
    assert!(!tmp.path().join("state/token").exists());
}

#[tokio::test]
async fn test_docs_list_without_login_is_still_sent() {
    let backend = spawn_backend().await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), Some(backend.base_url.as_str()));

    let (_, stderr, ok) = run_nile(&config, &["docs", "list"]).await;

    assert!(!ok);
    assert!(stderr.contains("not logged in"));
    assert!(stderr.contains("Not authorized"));
    assert_eq!(backend.recorded().list_auth, vec![None]);
}

#[tokio::test]
async fn test_upload_without_storage_config_fails_fast() {
    let backend = spawn_backend().await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), Some(backend.base_url.as_str()));
    let file = tmp.path().join("guide.pdf");
    fs::write(&file, b"%PDF").unwrap();

    let (_, stderr, ok) = run_nile(&config, &["docs", "upload", file.to_str().unwrap()]).await;

    assert!(!ok);
    assert!(stderr.contains("storage.cloud_name"));
    assert!(backend.recorded().upload_bodies.is_empty());
}
