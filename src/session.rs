//! Session lifecycle: login, verification, restore and logout.
//!
//! [`SessionStore`] owns the bearer token and the identity it was verified
//! as. State is published through a `tokio::sync::watch` cell: the store is
//! the single writer, and any number of dependents can [`subscribe`] and
//! observe transitions.
//!
//! ```text
//!            initialize() with persisted token
//!   ┌──────────┐ ───────────────────────────▶ ┌─────────┐
//!   │Anonymous │                              │ Loading │
//!   └──────────┘ ◀── verify rejected ──────── └────┬────┘
//!      ▲    │                                      │ verify ok
//!      │    │ login() + verify ok                  ▼
//!      │    └─────────────────────────────▶ ┌───────────────┐
//!      └────────── logout() / verify fail ──│ Authenticated │
//!                                           └───────────────┘
//! ```
//!
//! `user` is only ever set together with a token that was verified in this
//! lifecycle. Every verification failure purges the persisted token and
//! clears the identity.
//!
//! A store created over a persisted token starts in `Loading`, never
//! `Anonymous`, until [`initialize`](SessionStore::initialize) settles it.
//!
//! `login` and `logout` bump a generation counter. A verification that
//! started under an older generation discards its result, so a late
//! response can never resurrect a session the user already left. The
//! counter is only bumped and compared while holding the watch lock.
//!
//! [`subscribe`]: SessionStore::subscribe

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::{ApiError, SessionError};
use crate::models::UserIdentity;
use crate::token_store::{FileTokenStore, TokenStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// A persisted token is being verified; no decision yet.
    Loading,
    Anonymous,
    Authenticated { token: String, user: UserIdentity },
}

impl SessionState {
    pub fn user(&self) -> Option<&UserIdentity> {
        match self {
            SessionState::Authenticated { user, .. } => Some(user),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            SessionState::Authenticated { token, .. } => Some(token),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }
}

pub struct SessionStore {
    api: ApiClient,
    store: Arc<dyn TokenStore>,
    state: watch::Sender<SessionState>,
    generation: AtomicU64,
}

impl SessionStore {
    /// Create a store. With a persisted token the store starts in
    /// [`SessionState::Loading`] so dependents never see a transient
    /// "no user"; call [`initialize`](Self::initialize) to settle it.
    pub fn new(api: ApiClient, store: Arc<dyn TokenStore>) -> Self {
        let initial = match store.load() {
            Ok(None) => SessionState::Anonymous,
            _ => SessionState::Loading,
        };
        let (state, _) = watch::channel(initial);
        Self {
            api,
            store,
            state,
            generation: AtomicU64::new(0),
        }
    }

    /// Store backed by the configured token file, talking to the configured backend.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ApiClient::from_config(config),
            Arc::new(FileTokenStore::new(&config.session.token_path)),
        )
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<UserIdentity> {
        self.state.borrow().user().cloned()
    }

    /// The verified bearer token, if any.
    pub fn token(&self) -> Option<String> {
        self.state.borrow().token().map(str::to_string)
    }

    /// Restore a session from the persisted token.
    ///
    /// Without a persisted token the store settles in `Anonymous`. With
    /// one, the state is `Loading` until verification resolves. A rejected
    /// token is purged; the store still becomes ready, just without a user.
    pub async fn initialize(&self) -> Result<SessionState, SessionError> {
        let persisted = match self.store.load() {
            Ok(token) => token,
            Err(e) => {
                self.state.send_replace(SessionState::Anonymous);
                return Err(e.into());
            }
        };
        match persisted {
            None => {
                debug!("no persisted token");
                self.state.send_replace(SessionState::Anonymous);
            }
            Some(token) => {
                info!("restoring persisted session");
                self.state.send_replace(SessionState::Loading);
                match self.verify(&token).await {
                    Ok(_) => {}
                    Err(SessionError::Verification { .. }) | Err(SessionError::Superseded) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(self.state())
    }

    /// Log in with credentials.
    ///
    /// A rejected credential pair or unreachable backend leaves the current
    /// session exactly as it was. On success the token is persisted and
    /// verified before this returns; if that verification fails the new
    /// token is purged like any other unverified token.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<UserIdentity, SessionError> {
        let issued = self
            .api
            .issue_token(identifier, secret)
            .await
            .map_err(|e| match e {
                ApiError::Request { message, .. } => {
                    SessionError::InvalidCredentials { detail: message }
                }
                other => SessionError::Api(other),
            })?;

        let mut saved = Ok(());
        self.state.send_if_modified(|_| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            saved = self.store.save(&issued.access_token);
            false
        });
        saved?;
        info!(identifier, "token issued");
        self.verify(&issued.access_token).await
    }

    /// Verify `token` and adopt the identity it represents.
    ///
    /// Fail-closed: on any failure the persisted token is erased and the
    /// session becomes `Anonymous`.
    pub async fn verify(&self, token: &str) -> Result<UserIdentity, SessionError> {
        let started = self.generation.load(Ordering::SeqCst);
        let result = self.api.verify(token).await;

        let next = match &result {
            Ok(user) => SessionState::Authenticated {
                token: token.to_string(),
                user: user.clone(),
            },
            Err(_) => SessionState::Anonymous,
        };
        // The generation is compared and the state written under the watch
        // lock, which `login` and `logout` also take to bump the generation.
        let mut current = true;
        let mut cleared = Ok(());
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != started {
                current = false;
                return false;
            }
            if result.is_err() {
                cleared = self.store.clear();
            }
            *state = next;
            true
        });

        if !current {
            debug!("discarding superseded verification result");
            return Err(SessionError::Superseded);
        }

        match result {
            Ok(user) => {
                info!(email = %user.email, role = %user.role, "session verified");
                Ok(user)
            }
            Err(source) => {
                warn!(error = %source, "token verification failed; clearing session");
                cleared?;
                Err(SessionError::Verification { source })
            }
        }
    }

    /// Forget the session. No network call; safe to repeat.
    pub fn logout(&self) -> Result<(), SessionError> {
        let mut cleared = Ok(());
        self.state.send_modify(|state| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            *state = SessionState::Anonymous;
            cleared = self.store.clear();
        });
        cleared?;
        info!("logged out");
        Ok(())
    }
}
