//! On-disk OAuth token cache.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{GsuiteError, GsuiteResult};

/// Tokens persisted between runs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl StoredToken {
    /// Create a token expiring `expires_in` seconds from now.
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
            scopes,
        }
    }

    /// Expired or expiring within `grace_period`.
    #[must_use]
    pub fn is_expired(&self, grace_period: Duration) -> bool {
        Utc::now() + grace_period >= self.expires_at
    }

    /// Whether the token was granted every scope in `required`.
    #[must_use]
    pub fn covers(&self, required: &[&str]) -> bool {
        required
            .iter()
            .all(|scope| self.scopes.iter().any(|s| s == scope))
    }
}

impl fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredToken")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// JSON token file with owner-only permissions.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached token, if any.
    ///
    /// # Errors
    ///
    /// Returns `GsuiteError::TokenStore` if the file exists but is unreadable.
    pub fn load(&self) -> GsuiteResult<Option<StoredToken>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = std::fs::read_to_string(&self.path).map_err(|e| {
            GsuiteError::TokenStore(format!("cannot read {}: {e}", self.path.display()))
        })?;
        let token = serde_json::from_str(&json).map_err(|e| {
            GsuiteError::TokenStore(format!("invalid token file {}: {e}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), "Loaded cached token");
        Ok(Some(token))
    }

    /// Persist `token`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `GsuiteError::TokenStore` if the file cannot be written.
    pub fn save(&self, token: &StoredToken) -> GsuiteResult<()> {
        let json = serde_json::to_string_pretty(token)?;
        let write_error =
            |e: std::io::Error| GsuiteError::TokenStore(format!("cannot write {}: {e}", self.path.display()));

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_error)?;
            }
        }

        std::fs::write(&self.path, json).map_err(write_error)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms).map_err(write_error)?;
        }

        debug!(path = %self.path.display(), "Saved token");
        Ok(())
    }

    /// Remove the cached token.
    ///
    /// # Errors
    ///
    /// Returns `GsuiteError::TokenStore` if an existing file cannot be removed.
    pub fn clear(&self) -> GsuiteResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GsuiteError::TokenStore(format!(
                "cannot remove {}: {e}",
                self.path.display()
            ))),
        }
    }
}
