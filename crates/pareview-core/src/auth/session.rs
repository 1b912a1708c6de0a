use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::User;

/// Fixed key the session is persisted under.
pub const STORAGE_KEY: &str = "auth-storage";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Who is logged in and with which tokens.
///
/// `is_authenticated()` holds exactly when both `user` and `tokens` are
/// present; it is derived, never stored independently.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionData {
    pub user: Option<User>,
    pub tokens: Option<TokenPair>,
}

impl SessionData {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.tokens.is_some()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.tokens
            .as_ref()
            .map(|t| t.access.as_str())
            .filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.tokens
            .as_ref()
            .map(|t| t.refresh.as_str())
            .filter(|t| !t.is_empty())
    }
}

// On-disk shape. `isAuthenticated` is written for readers of the file but
// recomputed on load.
#[derive(Serialize, Deserialize)]
struct StoredSession {
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    tokens: Option<TokenPair>,
    #[serde(rename = "isAuthenticated", default)]
    is_authenticated: bool,
}

impl From<&SessionData> for StoredSession {
    fn from(data: &SessionData) -> Self {
        Self {
            user: data.user.clone(),
            tokens: data.tokens.clone(),
            is_authenticated: data.is_authenticated(),
        }
    }
}

impl From<StoredSession> for SessionData {
    fn from(stored: StoredSession) -> Self {
        Self {
            user: stored.user,
            tokens: stored.tokens,
        }
    }
}

/// Process-wide session, shared by the API client and its callers through
/// an `Arc`. Mutated only by `set`, `update_tokens` and `clear`; each
/// mutation writes through to disk when a storage directory is configured.
pub struct Session {
    storage_dir: Option<PathBuf>,
    data: RwLock<SessionData>,
}

impl Session {
    /// A session persisted under `storage_dir`.
    pub fn new(storage_dir: PathBuf) -> Self {
        Self {
            storage_dir: Some(storage_dir),
            data: RwLock::new(SessionData::default()),
        }
    }

    /// A session that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            storage_dir: None,
            data: RwLock::new(SessionData::default()),
        }
    }

    /// A persisted session, restored from disk if a saved one exists.
    pub fn restore(storage_dir: PathBuf) -> Result<Self> {
        let session = Self::new(storage_dir);
        session.load()?;
        Ok(session)
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionData> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionData> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Load session from disk. Returns whether an authenticated session was
    /// restored.
    pub fn load(&self) -> Result<bool> {
        let Some(path) = self.session_path() else {
            return Ok(false);
        };
        if !path.exists() {
            return Ok(false);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let stored: StoredSession =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        let data = SessionData::from(stored);
        let authenticated = data.is_authenticated();
        *self.write() = data;
        debug!(authenticated, "Session restored");
        Ok(authenticated)
    }

    /// Save session to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = self.session_path() else {
            return Ok(());
        };
        let stored = StoredSession::from(&*self.read());
        write_session_file(&path, &stored)
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            warn!(error = %e, "Failed to save session");
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SessionData {
        self.read().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token().map(str::to_string)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token().map(str::to_string)
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    /// Record a successful login.
    pub fn set(&self, user: User, tokens: TokenPair) {
        {
            let mut data = self.write();
            data.user = Some(user);
            data.tokens = Some(tokens);
        }
        self.persist();
    }

    /// Replace the token pair in place, keeping the user.
    pub fn update_tokens(&self, tokens: TokenPair) {
        self.write().tokens = Some(tokens);
        self.persist();
    }

    /// Forget user and tokens. Clearing an empty session is a no-op.
    pub fn clear(&self) {
        {
            let mut data = self.write();
            if data.user.is_none() && data.tokens.is_none() {
                return;
            }
            *data = SessionData::default();
        }
        if let Some(path) = self.session_path() {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!(error = %e, "Failed to remove session file");
                }
            }
        }
    }

    fn session_path(&self) -> Option<PathBuf> {
        self.storage_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", STORAGE_KEY)))
    }
}

fn write_session_file(path: &Path, stored: &StoredSession) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(stored)?;

    // Tokens are credentials; keep the file private to the user.
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .with_context(|| format!("Failed to open {} for writing", path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write to {}", path.display()))?;
    }

    #[cfg(not(unix))]
    {
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write to {}", path.display()))?;
    }

    Ok(())
}
