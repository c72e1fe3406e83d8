// src/types/session.rs
//! Guest session types returned by the analysis service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A guest usage grant: time-boxed, credit-limited, identified by an
/// opaque bearer token. Issued by POST /guest/session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestSession {
    #[serde(rename = "guest_token")]
    pub token: String,
    pub credits: u32,
    pub expires_at: DateTime<Utc>,
    pub session_id: String,
}

/// Current snapshot of an existing session, from GET /guest/session/info.
/// The server is the authority on expiry; a rejected token means the
/// session is gone regardless of what the client has stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub credits: u32,
    pub expires_at: DateTime<Utc>,
    pub session_id: String,
}

/// Error body shape the service uses. All fields optional because older
/// deployments send plain-text bodies or different field names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    pub error_code: Option<String>,
    pub error: Option<String>,
    pub message: Option<String>,
    pub detail: Option<String>,
}

impl ApiErrorBody {
    /// Best human-readable message out of the body, if any.
    pub fn text(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .or(self.detail.as_deref())
    }
}
