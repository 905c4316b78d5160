//! HTTP gateway to the Nile Care backend.
//!
//! [`ApiClient`] builds every backend request the same way and normalises
//! failures into [`ApiError`]:
//!
//! - No base address configured → [`ApiError::MissingBaseUrl`], raised
//!   before any request is built. An address that is not an absolute
//!   `http(s)` URL → [`ApiError::InvalidBaseUrl`], also before any I/O.
//! - Connection-level failure (DNS, refused, reset) →
//!   [`ApiError::Unreachable`] naming the configured address.
//! - Non-2xx status → [`ApiError::Request`] whose message is the JSON
//!   `detail` field when present, else the raw body text, else a generic
//!   message when the body could not be read.
//!
//! Authenticated calls take `Option<&str>`: when a token is present it is
//! sent as `Authorization: Bearer <token>`; when absent the request is
//! still sent and the backend decides.
//!
//! # Endpoints
//!
//! | Method | Path | Auth |
//! |--------|------|------|
//! | `POST` | `/token` | none (form-encoded) |
//! | `GET`  | `/auth/verify` | bearer |
//! | `POST` | `/ask` | none |
//! | `POST` | `/upload` | bearer |
//! | `GET`  | `/admin/documents` | bearer |
//! | `POST` | `/admin/documents/{id}/embed` | bearer |
//! | `GET`  | `/health` | none |
//!
//! Path parameters are percent-encoded as a single segment, so an id can
//! never address a different route.
//!
//! No call is retried and no client-side timeout is applied.

use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::{normalize_url, Config};
use crate::error::ApiError;
use crate::models::{
    AskRequest, AskResponse, DocumentDescriptor, HealthStatus, RegisterDocument, TokenResponse,
    UserIdentity,
};

const TRANSPORT_FAILURE: &str = "request failed and the response body could not be read";

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Option<String>,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a client for `base_url`. `None` or a blank string leaves the
    /// client unconfigured; every call then fails with
    /// [`ApiError::MissingBaseUrl`].
    pub fn new(base_url: Option<&str>) -> Self {
        Self::with_http(base_url, reqwest::Client::new())
    }

    pub fn with_http(base_url: Option<&str>, http: reqwest::Client) -> Self {
        Self {
            base_url: normalize_url(base_url),
            http,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.backend_url().as_deref())
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Exchange credentials for a bearer token (`POST /token`, form-encoded).
    pub async fn issue_token(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let req = self
            .request(Method::POST, &["token"], None)?
            .form(&[("username", username), ("password", password)]);
        self.send_json(req, "/token").await
    }

    /// Exchange a token for the identity it represents.
    pub async fn verify(&self, token: &str) -> Result<UserIdentity, ApiError> {
        let req = self.request(Method::GET, &["auth", "verify"], Some(token))?;
        self.send_json(req, "/auth/verify").await
    }

    pub async fn ask(&self, request: &AskRequest) -> Result<AskResponse, ApiError> {
        request
            .validate()
            .map_err(|reason| ApiError::InvalidQuestion { reason })?;
        let req = self.request(Method::POST, &["ask"], None)?.json(request);
        self.send_json(req, "/ask").await
    }

    /// Register an externally stored file; the backend creates a `pending` document.
    pub async fn register_document(
        &self,
        token: Option<&str>,
        file_url: &str,
        filename: &str,
    ) -> Result<(), ApiError> {
        let body = RegisterDocument { file_url, filename };
        let req = self.request(Method::POST, &["upload"], token)?.json(&body);
        self.send(req).await.map(drop)
    }

    /// Current document descriptors. Never cached.
    pub async fn list_documents(
        &self,
        token: Option<&str>,
    ) -> Result<Vec<DocumentDescriptor>, ApiError> {
        let req = self.request(Method::GET, &["admin", "documents"], token)?;
        self.send_json(req, "/admin/documents").await
    }

    /// Ask the backend to embed a document. Does not wait for completion;
    /// re-fetch the list to observe the new status.
    pub async fn trigger_embedding(
        &self,
        token: Option<&str>,
        document_id: &str,
    ) -> Result<(), ApiError> {
        let segments = ["admin", "documents", document_id, "embed"];
        let req = self.request(Method::POST, &segments, token)?;
        self.send(req).await.map(drop)
    }

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        let req = self.request(Method::GET, &["health"], None)?;
        self.send_json(req, "/health").await
    }

    fn request(
        &self,
        method: Method,
        segments: &[&str],
        token: Option<&str>,
    ) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(segments)?;
        debug!(%method, %url, authenticated = token.is_some(), "backend request");
        let mut req = self.http.request(method, url);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        Ok(req)
    }

    /// Base address joined with `segments`, each percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let base = self.base_url.as_deref().ok_or(ApiError::MissingBaseUrl)?;
        let invalid = |reason: &str| ApiError::InvalidBaseUrl {
            url: base.to_string(),
            reason: reason.to_string(),
        };
        let mut url = Url::parse(base).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        url.path_segments_mut()
            .map_err(|_| invalid("not a base URL"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        let response = req.send().await.map_err(|source| ApiError::Unreachable {
            address: self.base_url.clone().unwrap_or_default(),
            source,
        })?;
        check_status(response).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = self.send(req).await?;
        let bytes = response.bytes().await.map_err(|e| ApiError::Decode {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.text().await {
        Ok(body) => error_message(&body),
        Err(_) => TRANSPORT_FAILURE.to_string(),
    };
    debug!(status = status.as_u16(), %message, "backend rejected request");
    Err(ApiError::Request {
        status: status.as_u16(),
        message,
    })
}

/// Pick the most useful message out of an error body.
///
/// `{"detail": "..."}` yields the string; a structured `detail` (such as a
/// validation error list) is rendered as compact JSON; any other body is
/// returned as text. An empty body yields the generic transport message.
pub fn error_message(body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        match map.get("detail") {
            Some(serde_json::Value::String(s)) => return s.clone(),
            Some(serde_json::Value::Null) | None => {}
            Some(other) => return other.to_string(),
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        TRANSPORT_FAILURE.to_string()
    } else {
        trimmed.to_string()
    }
}
