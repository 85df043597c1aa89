//! Persistence for the session token.
//!
//! The token is the only state that survives a restart. It is stored as a
//! single string under [`TOKEN_STORAGE_KEY`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Well-known key the token is stored under.
pub const TOKEN_STORAGE_KEY: &str = "token";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSession {
    token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Token storage lock poisoned")]
    LockPoisoned,
}

/// Storage for the persisted session token.
pub trait TokenStorage: Send + Sync {
    fn load(&self) -> Result<Option<String>, PersistenceError>;

    fn save(&self, token: &str) -> Result<(), PersistenceError>;

    fn clear(&self) -> Result<(), PersistenceError>;
}

/// JSON file holding `{"token": "..."}`.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> Result<Option<String>, PersistenceError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let session = serde_json::from_str::<PersistedSession>(&contents)?;
        if session.token.is_empty() {
            return Ok(None);
        }
        Ok(Some(session.token))
    }

    fn save(&self, token: &str) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&PersistedSession {
            token: token.to_string(),
        })?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), PersistenceError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Process-local storage, for ephemeral sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> Result<Option<String>, PersistenceError> {
        let token = self.token.lock().map_err(|_| PersistenceError::LockPoisoned)?;
        Ok(token.clone())
    }

    fn save(&self, token: &str) -> Result<(), PersistenceError> {
        let mut slot = self.token.lock().map_err(|_| PersistenceError::LockPoisoned)?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), PersistenceError> {
        let mut slot = self.token.lock().map_err(|_| PersistenceError::LockPoisoned)?;
        *slot = None;
        Ok(())
    }
}
