// src/session/client.rs
//! HTTP client for the guest endpoints - the only network-facing part
//! of the guest flow.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use tracing::{info, trace};

use crate::session::error::{classify_body, GuestError};
use crate::types::{
    analysis::{AnalysisRequest, AnalysisResult, AnalyzeResponse},
    session::{GuestSession, SessionSnapshot},
};
use crate::utils::content_type_for;

const CREATE_SESSION_ENDPOINT: &str = "/guest/session";
const SESSION_INFO_ENDPOINT: &str = "/guest/session/info";
const ANALYZE_ENDPOINT: &str = "/guest/analyze";
const ANALYSIS_ENDPOINT: &str = "/guest/analysis";

/// Seam for the guest endpoints so the flow can run against a scripted
/// fake in tests.
#[async_trait]
pub trait GuestApi: Send + Sync {
    async fn create_session(&self) -> Result<GuestSession, GuestError>;

    async fn session_info(&self, token: &str) -> Result<SessionSnapshot, GuestError>;

    async fn analyze_resume(
        &self,
        token: &str,
        request: &AnalysisRequest,
    ) -> Result<AnalyzeResponse, GuestError>;

    async fn analysis(&self, token: &str, id: &str) -> Result<AnalysisResult, GuestError>;
}

pub struct GuestClient {
    client: reqwest::Client,
    base_url: String,
}

impl GuestClient {
    /// No client-wide timeout: only session creation carries a
    /// client-enforced deadline, applied by the caller. Everything else
    /// relies on transport defaults.
    pub fn new(base_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    async fn error_from_response(response: reqwest::Response) -> GuestError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        trace!("Guest API error response ({}): {}", status, body);

        // A rejected bearer token means the session is gone, whatever
        // the body says.
        if status == StatusCode::UNAUTHORIZED {
            return GuestError::SessionInvalid;
        }

        classify_body(&body)
    }
}

#[async_trait]
impl GuestApi for GuestClient {
    async fn create_session(&self) -> Result<GuestSession, GuestError> {
        let url = format!("{}{}", self.base_url, CREATE_SESSION_ENDPOINT);
        info!("Creating guest session: {}", url);

        let response = self.client.post(&url).send().await?;

        let status = response.status();
        if status.is_success() {
            response
                .json::<GuestSession>()
                .await
                .map_err(|e| GuestError::SessionCreation(e.to_string()))
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(GuestError::SessionCreation(body))
        }
    }

    async fn session_info(&self, token: &str) -> Result<SessionSnapshot, GuestError> {
        let url = format!("{}{}", self.base_url, SESSION_INFO_ENDPOINT);
        trace!("Fetching guest session info: {}", url);

        let response = self.client.get(&url).bearer_auth(token).send().await?;

        if response.status().is_success() {
            response
                .json::<SessionSnapshot>()
                .await
                .map_err(|e| GuestError::Generic(e.to_string()))
        } else {
            Err(Self::error_from_response(response).await)
        }
    }

    async fn analyze_resume(
        &self,
        token: &str,
        request: &AnalysisRequest,
    ) -> Result<AnalyzeResponse, GuestError> {
        let url = format!("{}{}", self.base_url, ANALYZE_ENDPOINT);

        let file_name = request
            .resume_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("resume")
            .to_string();

        let content_type = content_type_for(&file_name)
            .map_err(|e| GuestError::Generic(e.to_string()))?;

        let file_content = tokio::fs::read(&request.resume_path).await.map_err(|e| {
            GuestError::Generic(format!(
                "Failed to read resume file {}: {}",
                request.resume_path.display(),
                e
            ))
        })?;

        let mut form = Form::new()
            .part(
                "resume",
                Part::bytes(file_content)
                    .file_name(file_name)
                    .mime_str(content_type)
                    .map_err(|e| GuestError::Generic(e.to_string()))?,
            )
            .text("job_description", request.job_description.clone());

        if let Some(job_title) = &request.job_title {
            form = form.text("job_title", job_title.clone());
        }
        if let Some(company_name) = &request.company_name {
            form = form.text("company_name", company_name.clone());
        }

        info!("Submitting resume analysis: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        trace!("Analyze response status: {}", status);

        if status.is_success() {
            response
                .json::<AnalyzeResponse>()
                .await
                .map_err(|e| GuestError::Generic(format!("Failed to parse analysis: {}", e)))
        } else {
            Err(Self::error_from_response(response).await)
        }
    }

    async fn analysis(&self, token: &str, id: &str) -> Result<AnalysisResult, GuestError> {
        let url = format!("{}{}/{}", self.base_url, ANALYSIS_ENDPOINT, id);
        trace!("Fetching analysis: {}", url);

        let response = self.client.get(&url).bearer_auth(token).send().await?;

        if response.status().is_success() {
            response
                .json::<AnalysisResult>()
                .await
                .map_err(|e| GuestError::Generic(e.to_string()))
        } else {
            Err(Self::error_from_response(response).await)
        }
    }
}
