//! Wire types exchanged with the backend.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Response of `POST /token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::User => write!(f, "user"),
        }
    }
}

/// Identity returned by `GET /auth/verify`.
///
/// The backend reports `{ id, email, is_admin }`; a `role` string is also
/// accepted. `id` may arrive as a number or a string and is kept opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl UserIdentity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Deserialize)]
struct RawIdentity {
    id: serde_json::Value,
    email: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    is_admin: Option<serde_json::Value>,
}

impl<'de> Deserialize<'de> for UserIdentity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawIdentity::deserialize(deserializer)?;
        let id = match raw.id {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "identity id must be a string or number, got {}",
                    other
                )))
            }
        };
        let admin = match (raw.role.as_deref(), raw.is_admin.as_ref()) {
            (Some(role), _) => role.eq_ignore_ascii_case("admin"),
            (None, Some(flag)) => truthy(flag),
            (None, None) => false,
        };
        Ok(UserIdentity {
            id,
            email: raw.email,
            role: if admin { Role::Admin } else { Role::User },
        })
    }
}

fn truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        serde_json::Value::String(s) => !s.is_empty() && s != "0" && !s.eq_ignore_ascii_case("false"),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentStatus {
    Pending,
    Embedded,
    Failed,
    /// A status this client does not know about, kept verbatim.
    Other(String),
}

impl DocumentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Embedded => "embedded",
            DocumentStatus::Failed => "failed",
            DocumentStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DocumentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(match s.to_ascii_lowercase().as_str() {
            "pending" => DocumentStatus::Pending,
            "embedded" => DocumentStatus::Embedded,
            "failed" => DocumentStatus::Failed,
            _ => DocumentStatus::Other(s),
        })
    }
}

/// Backend record describing an uploaded file. Read-only snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentDescriptor {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub upload_date: Option<String>,
    pub status: DocumentStatus,
    #[serde(default)]
    pub size: Option<u64>,
}

impl DocumentDescriptor {
    /// Parse `upload_date`, accepting RFC 3339 or a naive ISO-8601 timestamp.
    pub fn uploaded_at(&self) -> Option<NaiveDateTime> {
        let raw = self.upload_date.as_deref()?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_utc());
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()
    }
}

fn opaque_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "document id must be a string or number, got {}",
            other
        ))),
    }
}

/// Answer languages accepted by `POST /ask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Auto,
    #[default]
    En,
    Am,
    Om,
    So,
    Ti,
}

impl Language {
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Auto => "Auto",
            Language::En => "English",
            Language::Am => "Amharic",
            Language::Om => "Affan Oromo",
            Language::So => "Somali",
            Language::Ti => "Tigrinya",
        }
    }
}

pub const QUESTION_MIN_CHARS: usize = 2;
pub const QUESTION_MAX_CHARS: usize = 200;

/// Body of `POST /ask`. Absent optionals are omitted from the JSON.
#[derive(Debug, Clone, Serialize)]
pub struct AskRequest {
    pub question: String,
    pub lang: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl AskRequest {
    pub fn new(question: impl Into<String>, lang: Language) -> Self {
        Self {
            question: question.into(),
            lang,
            location: None,
            latitude: None,
            longitude: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Length check applied before the request is sent. Both bounds count
    /// characters of the question exactly as it will be sent.
    pub fn validate(&self) -> Result<(), String> {
        let len = self.question.chars().count();
        if len < QUESTION_MIN_CHARS {
            return Err(format!(
                "question must be at least {} characters",
                QUESTION_MIN_CHARS
            ));
        }
        if len > QUESTION_MAX_CHARS {
            return Err(format!(
                "question must be at most {} characters",
                QUESTION_MAX_CHARS
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<serde_json::Value>,
}

/// Body of `POST /upload`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterDocument<'a> {
    pub file_url: &'a str,
    pub filename: &'a str,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
