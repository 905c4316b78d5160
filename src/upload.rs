//! Two-step document publish.
//!
//! 1. The file bytes go to external object storage, which hands back a
//!    public URL.
//! 2. `{ file_url, filename }` is registered with the backend, which
//!    creates a `pending` document.
//!
//! A step-1 failure aborts before the backend is contacted. A step-2
//! failure is reported as [`UploadError::Registration`], carrying the URL
//! of the orphaned object: the file exists in storage but the backend does
//! not know about it. Nothing is retried, since repeating step 1 would
//! store a second copy.
//!
//! # Configuration
//!
//! ```toml
//! [storage]
//! cloud_name = "nilecare"
//! upload_preset = "unsigned_pdf"
//! # endpoint = "https://api.cloudinary.com/v1_1"
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::api::{error_message, ApiClient};
use crate::config::{StorageConfig, UploadConfig};
use crate::error::{StorageError, UploadError};

/// External object storage that turns bytes into a public URL.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Returns a short identifier for logs (e.g. `"cloudinary"`).
    fn name(&self) -> &str;

    /// Store `bytes` under `filename` and return a durable public URL.
    async fn store(&self, filename: &str, bytes: Vec<u8>) -> Result<String, StorageError>;
}

/// Unsigned multipart upload to a Cloudinary-compatible endpoint.
///
/// Posts `file` and `upload_preset` to `{endpoint}/{cloud_name}/raw/upload`
/// and reads `secure_url` (or `url`) from the response.
#[derive(Debug, Clone)]
pub struct CloudinaryStorage {
    endpoint: String,
    cloud_name: String,
    upload_preset: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct CloudinaryResponse {
    #[serde(default)]
    secure_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl CloudinaryStorage {
    /// Build from config. Missing `cloud_name` or `upload_preset` is
    /// rejected here rather than producing a malformed request later.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let cloud_name = non_blank(config.cloud_name.as_deref())
            .ok_or(StorageError::MissingConfig { missing: "storage.cloud_name" })?;
        let upload_preset = non_blank(config.upload_preset.as_deref())
            .ok_or(StorageError::MissingConfig { missing: "storage.upload_preset" })?;
        let endpoint = non_blank(Some(config.endpoint.trim_end_matches('/')))
            .ok_or(StorageError::MissingConfig { missing: "storage.endpoint" })?;
        Ok(Self {
            endpoint,
            cloud_name,
            upload_preset,
            http: reqwest::Client::new(),
        })
    }

    pub fn upload_url(&self) -> String {
        format!("{}/{}/raw/upload", self.endpoint, self.cloud_name)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl ObjectStorage for CloudinaryStorage {
    fn name(&self) -> &str {
        "cloudinary"
    }

    async fn store(&self, filename: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        let url = self.upload_url();
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());

        debug!(%url, filename, "uploading to object storage");
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|source| StorageError::Unreachable {
                address: url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await;
        if !status.is_success() {
            let message = match body {
                Ok(body) => storage_error_message(&body),
                Err(e) => format!("response body could not be read: {}", e),
            };
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body = body.map_err(|e| StorageError::Decode {
            reason: e.to_string(),
        })?;
        published_url(&body)
    }
}

/// Public URL from a successful upload response: `secure_url`, else `url`.
fn published_url(body: &str) -> Result<String, StorageError> {
    let parsed: CloudinaryResponse =
        serde_json::from_str(body).map_err(|e| StorageError::Decode {
            reason: e.to_string(),
        })?;
    parsed
        .secure_url
        .or(parsed.url)
        .filter(|u| !u.is_empty())
        .ok_or(StorageError::MissingUrl)
}

/// Cloudinary reports `{"error": {"message": "..."}}`; anything else falls
/// back to the backend's detail/text extraction.
fn storage_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| error_message(body))
}

/// A document that was stored and registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedDocument {
    pub filename: String,
    pub url: String,
}

/// Coordinates storage transfer and backend registration.
pub struct UploadMediator<'a> {
    api: &'a ApiClient,
    storage: &'a dyn ObjectStorage,
    allowed_extensions: Vec<String>,
}

impl<'a> UploadMediator<'a> {
    pub fn new(api: &'a ApiClient, storage: &'a dyn ObjectStorage, config: &UploadConfig) -> Self {
        Self {
            api,
            storage,
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Read a local file and publish it under its file name.
    pub async fn publish_file(
        &self,
        token: Option<&str>,
        path: &Path,
    ) -> Result<PublishedDocument, UploadError> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.check_extension(&filename)?;
        let bytes = tokio::fs::read(path).await.map_err(|source| UploadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.publish(token, &filename, bytes).await
    }

    /// Store `bytes`, then register the resulting URL. Single attempt.
    pub async fn publish(
        &self,
        token: Option<&str>,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<PublishedDocument, UploadError> {
        self.check_extension(filename)?;

        let size = bytes.len();
        let url = self.storage.store(filename, bytes).await?;
        info!(storage = self.storage.name(), filename, size, %url, "stored document");

        if let Err(source) = self.api.register_document(token, &url, filename).await {
            warn!(
                filename,
                %url,
                error = %source,
                "document stored externally but not registered with backend"
            );
            return Err(UploadError::Registration {
                url,
                filename: filename.to_string(),
                source,
            });
        }

        info!(filename, "document registered");
        Ok(PublishedDocument {
            filename: filename.to_string(),
            url,
        })
    }

    fn check_extension(&self, filename: &str) -> Result<(), UploadError> {
        let ext = Path::new(filename)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match ext {
            Some(ext) if self.allowed_extensions.iter().any(|a| *a == ext) => Ok(()),
            _ => Err(UploadError::UnsupportedFileType {
                filename: filename.to_string(),
                allowed: self.allowed_extensions.join(", "),
            }),
        }
    }
}
