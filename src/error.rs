//! Error types for the client library.
//!
//! Failures fall into four groups:
//!
//! | Group | Variants |
//! |-------|----------|
//! | precondition (no I/O attempted) | [`ApiError::MissingBaseUrl`], [`ApiError::InvalidBaseUrl`], [`ApiError::InvalidQuestion`], [`StorageError::MissingConfig`], [`UploadError::UnsupportedFileType`] |
//! | authentication | [`SessionError::InvalidCredentials`], [`SessionError::Verification`] |
//! | application (non-2xx) | [`ApiError::Request`] |
//! | transport | [`ApiError::Unreachable`], [`StorageError::Unreachable`] |
//!
//! Nothing is retried; every error goes back to the caller.

use std::path::PathBuf;

/// Failure of a call to the backend HTTP API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("backend address is not configured (set [backend].url or NILE_API_URL)")]
    MissingBaseUrl,

    #[error("backend address '{url}' is invalid: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid question: {reason}")]
    InvalidQuestion { reason: String },

    #[error("cannot reach backend at {address}: {source}")]
    Unreachable {
        address: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request failed ({status}): {message}")]
    Request { status: u16, message: String },

    #[error("unexpected response from {path}: {reason}")]
    Decode { path: String, reason: String },
}

impl ApiError {
    /// True for 401/403 responses.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Request { status, .. } if *status == 401 || *status == 403)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Request { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure reading or writing the persisted bearer token.
#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    #[error("token store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a session lifecycle operation.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid credentials: {detail}")]
    InvalidCredentials { detail: String },

    #[error("session verification failed: {source}")]
    Verification {
        #[source]
        source: ApiError,
    },

    /// The session was logged in or out while this verification was in flight.
    #[error("session changed while verifying; result discarded")]
    Superseded,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] TokenStoreError),
}

/// Failure of the external object-storage transfer (upload step 1).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object storage is not configured: {missing} is unset")]
    MissingConfig { missing: &'static str },

    #[error("cannot reach object storage at {address}: {source}")]
    Unreachable {
        address: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("object storage rejected upload ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("object storage response had no public URL")]
    MissingUrl,

    #[error("unreadable object storage response: {reason}")]
    Decode { reason: String },
}

/// Failure of a two-step document publish.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("unsupported file type '{filename}' (allowed: {allowed})")]
    UnsupportedFileType { filename: String, allowed: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("upload to object storage failed: {0}")]
    Storage(#[from] StorageError),

    /// The file is stored externally at `url` but the backend does not know about it.
    #[error("'{filename}' was stored at {url} but registration with the backend failed: {source}")]
    Registration {
        url: String,
        filename: String,
        #[source]
        source: ApiError,
    },
}
