//! # Nile Care client
//!
//! Client library and CLI for the Nile Care document ingestion and
//! question-answering service.
//!
//! The backend owns token issuance, document storage, embedding and
//! retrieval. This crate owns the session lifecycle (login, verification,
//! restore, logout), uniform request construction and error mapping for
//! every backend call, and the two-step document upload.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ TokenStore │◀──│ SessionStore │──▶│  ApiClient   │──▶ backend
//! │ file / mem │   │ watch cell   │   │ bearer + err │
//! └────────────┘   └──────┬───────┘   └──────▲───────┘
//!                         │                  │
//!                  ┌──────▼───────┐   ┌──────┴────────┐
//!                  │ CLI commands │──▶│ UploadMediator│──▶ object storage
//!                  │   (nile)     │   └───────────────┘
//!                  └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export NILE_API_URL=https://nilecare-api.example.com
//! nile login admin@example.com
//! nile docs upload ./guides/tomatoes.pdf
//! nile docs list
//! nile docs embed 12 --refresh
//! nile ask "What is the best fertilizer for tomatoes?"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`models`] | Wire types |
//! | [`error`] | Error taxonomy |
//! | [`token_store`] | Bearer token persistence |
//! | [`api`] | Backend HTTP gateway |
//! | [`session`] | Session lifecycle |
//! | [`upload`] | Object storage and two-step publish |
//! | [`auth_cmd`], [`ask`], [`docs_cmd`], [`health`] | CLI commands |

pub mod api;
pub mod ask;
pub mod auth_cmd;
pub mod config;
pub mod docs_cmd;
pub mod error;
pub mod health;
pub mod models;
pub mod session;
pub mod token_store;
pub mod upload;
