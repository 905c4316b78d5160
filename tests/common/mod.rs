//! In-process mock of the Nile Care backend and object storage.
//!
//! Credentials: `admin@example.com` / `secret` → `tok-admin`,
//! `farmer@example.com` / `secret` → `tok-user`. The token `tok-slow`
//! verifies as the admin after a 300 ms delay.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
pub struct Recorded {
    pub token_calls: usize,
    pub verify_calls: usize,
    pub ask_bodies: Vec<Value>,
    pub upload_bodies: Vec<Value>,
    pub upload_auth: Vec<Option<String>>,
    pub list_auth: Vec<Option<String>>,
    pub embed_ids: Vec<String>,
    pub storage_bodies: Vec<(String, Vec<u8>)>,
}

#[derive(Clone)]
pub struct MockState {
    pub recorded: Arc<Mutex<Recorded>>,
    pub documents: Arc<Mutex<Vec<Value>>>,
}

pub struct MockBackend {
    pub base_url: String,
    pub state: MockState,
}

impl MockBackend {
    pub fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.state.recorded.lock().unwrap()
    }

    pub fn set_documents(&self, docs: Vec<Value>) {
        *self.state.documents.lock().unwrap() = docs;
    }
}

pub async fn spawn_backend() -> MockBackend {
    let state = MockState {
        recorded: Arc::new(Mutex::new(Recorded::default())),
        documents: Arc::new(Mutex::new(Vec::new())),
    };

    let app = Router::new()
        .route("/token", post(issue_token))
        .route("/auth/verify", get(verify))
        .route("/ask", post(ask))
        .route("/upload", post(register_upload))
        .route("/admin/documents", get(list_documents))
        .route("/admin/documents/{id}/embed", post(embed_document))
        .route("/health", get(health))
        .route("/storage/{cloud}/raw/upload", post(storage_upload))
        .route("/storage-fail/{cloud}/raw/upload", post(storage_reject))
        .route("/storage-html/{cloud}/raw/upload", post(storage_html))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend {
        base_url: format!("http://{}", addr),
        state,
    }
}

/// An address nothing listens on.
pub async fn dead_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn detail(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "detail": msg }))).into_response()
}

fn is_admin(headers: &HeaderMap) -> bool {
    matches!(bearer(headers).as_deref(), Some("tok-admin") | Some("tok-slow"))
}

async fn issue_token(
    State(state): State<MockState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.recorded.lock().unwrap().token_calls += 1;
    let user = form.get("username").map(String::as_str);
    let pass = form.get("password").map(String::as_str);
    let token = match (user, pass) {
        (Some("admin@example.com"), Some("secret")) => "tok-admin",
        (Some("farmer@example.com"), Some("secret")) => "tok-user",
        (Some("ghost@example.com"), Some("secret")) => "tok-ghost",
        _ => return detail(StatusCode::UNAUTHORIZED, "Incorrect username or password"),
    };
    Json(json!({ "access_token": token, "token_type": "bearer" })).into_response()
}

async fn verify(State(state): State<MockState>, headers: HeaderMap) -> Response {
    state.recorded.lock().unwrap().verify_calls += 1;
    match bearer(&headers).as_deref() {
        Some("tok-admin") => {
            Json(json!({ "id": 1, "email": "admin@example.com", "is_admin": 1 })).into_response()
        }
        Some("tok-user") => {
            Json(json!({ "id": 2, "email": "farmer@example.com", "is_admin": 0 })).into_response()
        }
        Some("tok-slow") => {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Json(json!({ "id": 1, "email": "admin@example.com", "is_admin": 1 })).into_response()
        }
        _ => detail(StatusCode::UNAUTHORIZED, "Could not validate credentials"),
    }
}

async fn ask(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    state.recorded.lock().unwrap().ask_bodies.push(body.clone());
    if body["question"] == "boom" {
        return detail(StatusCode::SERVICE_UNAVAILABLE, "Unable to connect to the database.");
    }
    if body["question"] == "plain" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
    }
    Json(json!({ "answer": "X is a fertilizer.", "sources": ["doc1"] })).into_response()
}

async fn register_upload(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    {
        let mut rec = state.recorded.lock().unwrap();
        rec.upload_bodies.push(body.clone());
        rec.upload_auth.push(bearer(&headers));
    }
    if !is_admin(&headers) {
        return detail(StatusCode::FORBIDDEN, "Not enough permissions");
    }
    let mut docs = state.documents.lock().unwrap();
    let id = docs.len() + 1;
    docs.push(json!({
        "id": id,
        "filename": body["filename"],
        "upload_date": "2024-05-02T08:30:00",
        "status": "pending",
        "size": 1024
    }));
    Json(json!({ "id": id, "filename": body["filename"], "status": "pending" })).into_response()
}

async fn list_documents(State(state): State<MockState>, headers: HeaderMap) -> Response {
    state.recorded.lock().unwrap().list_auth.push(bearer(&headers));
    if bearer(&headers).is_none() {
        return detail(StatusCode::UNAUTHORIZED, "Not authenticated");
    }
    if !is_admin(&headers) {
        return detail(StatusCode::FORBIDDEN, "Not enough permissions");
    }
    Json(Value::Array(state.documents.lock().unwrap().clone())).into_response()
}

async fn embed_document(
    State(state): State<MockState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.recorded.lock().unwrap().embed_ids.push(id.clone());
    if !is_admin(&headers) {
        return detail(StatusCode::FORBIDDEN, "Not enough permissions");
    }
    let mut docs = state.documents.lock().unwrap();
    match docs.iter_mut().find(|d| d["id"].to_string() == id) {
        Some(doc) => {
            doc["status"] = json!("embedded");
            StatusCode::ACCEPTED.into_response()
        }
        None => detail(StatusCode::NOT_FOUND, "Document not found"),
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "database": "ok" }))
}

async fn storage_upload(
    State(state): State<MockState>,
    Path(cloud): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.starts_with("multipart/form-data") {
        return (StatusCode::BAD_REQUEST, "expected multipart").into_response();
    }
    state
        .recorded
        .lock()
        .unwrap()
        .storage_bodies
        .push((cloud.clone(), body.to_vec()));
    Json(json!({
        "secure_url": format!("https://cdn.test/{}/guide.pdf", cloud),
        "url": format!("http://cdn.test/{}/guide.pdf", cloud)
    }))
    .into_response()
}

async fn storage_html() -> Response {
    (StatusCode::OK, "<html>maintenance</html>").into_response()
}

async fn storage_reject() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": { "message": "Upload preset not found" } })),
    )
        .into_response()
}
