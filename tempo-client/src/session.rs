//! Session store: the credential and the signed-in user.
//!
//! The token is shared with the transport through a [`CredentialSlot`] and
//! persisted through a [`TokenStorage`]. No other store reads it.

use crate::persistence::{PersistenceError, TokenStorage};
use crate::store::StoreError;
use crate::transport::CredentialSlot;
use serde_json::Value;
use std::sync::Arc;
use tempo_core::{RequestBody, Transport, TransportError, User};
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub token: Option<String>,
    pub user: Option<User>,
}

impl SessionState {
    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }
}

/// Result of a login attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    /// Token stored and identity fetched.
    Authenticated(User),
    /// The backend rejected the credentials.
    InvalidCredentials(String),
    /// Token stored, but the identity endpoint failed. The session stays
    /// logged in.
    IdentityUnavailable(String),
    /// No usable answer from the login endpoint.
    TransportFailure(String),
}

impl LoginOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, LoginOutcome::Authenticated(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            LoginOutcome::Authenticated(_) => None,
            LoginOutcome::InvalidCredentials(message)
            | LoginOutcome::IdentityUnavailable(message)
            | LoginOutcome::TransportFailure(message) => Some(message),
        }
    }
}

pub struct SessionStore {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn TokenStorage>,
    credential: CredentialSlot,
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    pub fn new(
        transport: Arc<dyn Transport>,
        storage: Arc<dyn TokenStorage>,
        credential: CredentialSlot,
    ) -> Self {
        Self {
            transport,
            storage,
            credential,
            state: watch::Sender::new(SessionState::default()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.borrow().is_logged_in()
    }

    /// Load a persisted token. Returns whether one was found.
    pub fn restore(&self) -> Result<bool, PersistenceError> {
        let token = self.storage.load()?;
        let found = token.is_some();
        self.credential.set(token.clone());
        self.state.send_modify(|state| {
            state.token = token;
            state.user = None;
        });
        debug!(found, "session restored");
        Ok(found)
    }

    /// Like [`restore`](Self::restore), but an unreadable token store is
    /// cleared and the session starts signed out.
    pub fn restore_or_discard(&self) -> bool {
        match self.restore() {
            Ok(found) => found,
            Err(err) => {
                warn!(error = %err, "persisted session unreadable, starting signed out");
                self.logout();
                false
            }
        }
    }

    /// Submit form-encoded credentials, then fetch the identity.
    pub async fn login(&self, username: &str, password: &str) -> LoginOutcome {
        let form = RequestBody::Form(vec![
            ("username".to_string(), username.to_string()),
            ("password".to_string(), password.to_string()),
        ]);

        let response = match self.transport.post("auth/login", form).await {
            Ok(response) => response,
            Err(err) => {
                let outcome = rejected_login(err);
                warn!(username, outcome = ?outcome, "login failed");
                return outcome;
            }
        };

        let token = match response.get("access_token").and_then(Value::as_str) {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => {
                warn!(username, "login response carried no access token");
                return LoginOutcome::TransportFailure(
                    "Login response did not include an access token".to_string(),
                );
            }
        };

        if let Err(err) = self.storage.save(&token) {
            warn!(error = %err, "failed to persist session token");
        }
        self.credential.set(Some(token.clone()));
        self.state.send_modify(|state| {
            state.token = Some(token);
            state.user = None;
        });

        match self.refresh_identity().await {
            Ok(user) => {
                info!(username, user_id = %user.id, "logged in");
                LoginOutcome::Authenticated(user)
            }
            Err(err) => {
                warn!(username, error = %err, "logged in without identity");
                LoginOutcome::IdentityUnavailable(err.to_string())
            }
        }
    }

    /// Re-fetch the identity of the current token.
    pub async fn refresh_identity(&self) -> Result<User, StoreError> {
        let fallback = "Failed to fetch user information";
        let value = self
            .transport
            .get("auth/me", &[])
            .await
            .map_err(|err| StoreError::from_transport(err, fallback))?;
        if value.is_null() {
            return Err(StoreError::not_found("No user information available"));
        }
        let user: User = serde_json::from_value(value)
            .map_err(|e| StoreError::malformed(format!("{}: {}", fallback, e)))?;
        self.state.send_modify(|state| state.user = Some(user.clone()));
        Ok(user)
    }

    /// Clear token, identity and persisted storage. Never fails.
    pub fn logout(&self) {
        self.credential.clear();
        self.state.send_replace(SessionState::default());
        if let Err(err) = self.storage.clear() {
            warn!(error = %err, "failed to clear persisted session token");
        }
        info!("logged out");
    }
}

fn rejected_login(err: TransportError) -> LoginOutcome {
    let status = err.status();
    let message = StoreError::from_transport(err, "Invalid username or password").to_string();
    match status {
        Some(400 | 401 | 403 | 422) => LoginOutcome::InvalidCredentials(message),
        _ => LoginOutcome::TransportFailure(message),
    }
}
