//! TOML configuration for the `nile` client.
//!
//! ```toml
//! [backend]
//! url = "https://nilecare-api.example.com"
//!
//! [storage]
//! cloud_name = "nilecare"
//! upload_preset = "unsigned_pdf"
//! # endpoint = "https://api.cloudinary.com/v1_1"
//!
//! [session]
//! token_path = ".nile/token"
//!
//! [upload]
//! allowed_extensions = ["pdf"]
//! ```
//!
//! Every section is optional. The backend address may also come from the
//! `NILE_API_URL` environment variable, which takes precedence over the
//! file. An unset address is not a load error: each API call fails with a
//! precondition error instead, before touching the network.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding `[backend].url`.
pub const API_URL_ENV: &str = "NILE_API_URL";
/// Environment variable overriding `[storage].cloud_name`.
pub const CLOUD_NAME_ENV: &str = "NILE_CLOUD_NAME";
/// Environment variable overriding `[storage].upload_preset`.
pub const UPLOAD_PRESET_ENV: &str = "NILE_UPLOAD_PRESET";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BackendConfig {
    #[serde(default)]
    pub url: Option<String>,
}

/// External object storage used for step 1 of a document upload.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub cloud_name: Option<String>,
    #[serde(default)]
    pub upload_preset: Option<String>,
    #[serde(default = "default_storage_endpoint")]
    pub endpoint: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cloud_name: None,
            upload_preset: None,
            endpoint: default_storage_endpoint(),
        }
    }
}

fn default_storage_endpoint() -> String {
    "https://api.cloudinary.com/v1_1".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_path: default_token_path(),
        }
    }
}

fn default_token_path() -> PathBuf {
    PathBuf::from(".nile/token")
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

fn default_allowed_extensions() -> Vec<String> {
    vec!["pdf".to_string()]
}

impl Config {
    /// Defaults plus environment overrides, used when no config file exists.
    pub fn minimal() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Check the effective values, after any environment overrides.
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = self.backend_url() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("backend.url must start with http:// or https:// (got '{}')", url);
            }
        }

        if self.storage.endpoint.trim().is_empty() {
            anyhow::bail!("storage.endpoint must not be empty");
        }

        if self.upload.allowed_extensions.is_empty() {
            anyhow::bail!("upload.allowed_extensions must list at least one extension");
        }

        if self.session.token_path.as_os_str().is_empty() {
            anyhow::bail!("session.token_path must not be empty");
        }

        Ok(())
    }

    /// The backend base address with trailing slashes removed, if set and non-blank.
    pub fn backend_url(&self) -> Option<String> {
        normalize_url(self.backend.url.as_deref())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            self.backend.url = Some(url);
        }
        if let Ok(name) = std::env::var(CLOUD_NAME_ENV) {
            self.storage.cloud_name = Some(name);
        }
        if let Ok(preset) = std::env::var(UPLOAD_PRESET_ENV) {
            self.storage.upload_preset = Some(preset);
        }
    }
}

/// Trim whitespace and trailing slashes; blank becomes `None`.
pub fn normalize_url(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_config(&content)?;
    config.apply_env();
    config
        .validate()
        .with_context(|| format!("Invalid configuration from {} and environment", path.display()))?;
    Ok(config)
}

/// Parse and validate config text without consulting the environment.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    config.validate()?;
    Ok(config)
}
