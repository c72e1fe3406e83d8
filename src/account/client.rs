// src/account/client.rs
//! Account-facing endpoints: feedback form and marketing-email
//! preferences. These use the signed-in bearer token, not the guest
//! token; feedback also works anonymously.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

const FEEDBACK_ENDPOINT: &str = "/api/feedback";
const EMAIL_PREFERENCES_ENDPOINT: &str = "/api/user/email-preferences";
const UNSUBSCRIBE_ENDPOINT: &str = "/api/user/unsubscribe";

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackRequest {
    pub category: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Marketing-email flags. Unknown categories added server-side survive
/// a read-modify-write cycle through `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailPreferences {
    #[serde(default)]
    pub product_updates: bool,
    #[serde(default)]
    pub tips_and_guides: bool,
    #[serde(default)]
    pub promotions: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

pub struct AccountClient {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl AccountClient {
    pub fn new(base_url: String, auth_token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            auth_token,
        })
    }

    fn require_auth(&self) -> Result<&str> {
        self.auth_token
            .as_deref()
            .context("This command needs a signed-in account token (set CVLENS_AUTH_TOKEN)")
    }

    pub async fn submit_feedback(&self, feedback: &FeedbackRequest) -> Result<()> {
        let url = format!("{}{}", self.base_url, FEEDBACK_ENDPOINT);
        info!("Submitting feedback: {}", url);

        let mut request = self.client.post(&url).json(feedback);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.context("Failed to submit feedback")?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("Feedback failed with status {}: {}", status, error_text)
        }
    }

    pub async fn email_preferences(&self) -> Result<EmailPreferences> {
        let token = self.require_auth()?;
        let url = format!("{}{}", self.base_url, EMAIL_PREFERENCES_ENDPOINT);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to fetch email preferences")?;

        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .context("Failed to parse email preferences")
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!(
                "Fetching email preferences failed with status {}: {}",
                status,
                error_text
            )
        }
    }

    pub async fn update_email_preferences(&self, preferences: &EmailPreferences) -> Result<()> {
        let token = self.require_auth()?;
        let url = format!("{}{}", self.base_url, EMAIL_PREFERENCES_ENDPOINT);
        info!("Updating email preferences: {}", url);

        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .json(preferences)
            .send()
            .await
            .context("Failed to update email preferences")?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!(
                "Updating email preferences failed with status {}: {}",
                status,
                error_text
            )
        }
    }

    /// Disable every email category at once.
    pub async fn unsubscribe_all(&self) -> Result<()> {
        let token = self.require_auth()?;
        let url = format!("{}{}", self.base_url, UNSUBSCRIBE_ENDPOINT);
        info!("Unsubscribing from all email: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to unsubscribe")?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("Unsubscribe failed with status {}: {}", status, error_text)
        }
    }
}
