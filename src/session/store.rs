// src/session/store.rs
//! Persisted guest credential store.
//!
//! The browser front-end keeps `guest_token` / `guest_expires_at` /
//! `guest_session_id` in local storage; here they live in a small TOML
//! file under the user's config directory. The store is injected as a
//! trait so the flow can be tested against an in-memory double.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestCredentials {
    pub guest_token: String,
    pub guest_expires_at: DateTime<Utc>,
    pub guest_session_id: String,
}

impl GuestCredentials {
    /// Strict comparison: a credential expiring exactly now is expired.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.guest_expires_at
    }
}

pub trait CredentialStore: Send + Sync {
    fn store(&self, credentials: &GuestCredentials) -> Result<()>;

    fn get(&self) -> Option<GuestCredentials>;

    /// Local pre-filter only; the server's session-info check is the
    /// authority. Missing or corrupt data reads as invalid, never as an
    /// error, so callers treat "invalid" and "absent" identically.
    fn is_valid(&self) -> bool {
        match self.get() {
            Some(credentials) => credentials.is_valid_at(Utc::now()),
            None => false,
        }
    }

    fn clear(&self) -> Result<()>;
}

/// File-backed store. No locking: concurrent clients can race and the
/// last writer wins, which is acceptable for a server-authoritative
/// guest grant.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default location under the per-user config directory.
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("Could not determine user config directory")?;
        Ok(base.join("cvlens").join("guest_credentials.toml"))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn store(&self, credentials: &GuestCredentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create credentials directory: {}", parent.display())
            })?;
        }

        let content =
            toml::to_string(credentials).context("Failed to serialize guest credentials")?;

        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write credentials: {}", self.path.display()))
    }

    fn get(&self) -> Option<GuestCredentials> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match toml::from_str(&content) {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                warn!("Ignoring unreadable credential file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).with_context(|| {
                format!("Failed to remove credentials: {}", self.path.display())
            })?;
        }
        Ok(())
    }
}
