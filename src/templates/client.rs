// src/templates/client.rs
//! HTTP client for the document-template pipeline: structured-resume
//! fetch/save, parse trigger, preview rendering and PDF download.

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, trace};

use crate::types::resume::{TemplateInfo, TemplateKind};
use crate::utils::{ensure_directory, pdf_output_path};

pub struct TemplateClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl TemplateClient {
    pub fn new(base_url: String, token: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Available templates of one kind.
    pub async fn list_templates(&self, kind: TemplateKind) -> Result<Vec<TemplateInfo>> {
        let url = format!("{}{}", self.base_url, kind.endpoint());
        trace!("Listing templates: {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("Failed to list templates")?;

        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .context("Failed to parse template list")
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("Template listing failed with status {}: {}", status, error_text)
        }
    }

    /// Parsed resume JSON for an analysis, or `None` if the analysis
    /// has not been structured yet.
    pub async fn structured_resume(&self, analysis_id: &str) -> Result<Option<Value>> {
        let url = format!("{}/analyze/{}/structured-resume", self.base_url, analysis_id);
        trace!("Fetching structured resume: {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("Failed to fetch structured resume")?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status.is_success() {
            let data = response
                .json()
                .await
                .context("Failed to parse structured resume")?;
            Ok(Some(data))
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!(
                "Structured resume fetch failed with status {}: {}",
                status,
                error_text
            )
        }
    }

    /// Save edited resume data back to the analysis.
    pub async fn save_structured_resume(&self, analysis_id: &str, data: &Value) -> Result<()> {
        let url = format!("{}/analyze/{}/structured-resume", self.base_url, analysis_id);
        info!("Saving structured resume: {}", url);

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .json(data)
            .send()
            .await
            .context("Failed to save structured resume")?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("Saving resume failed with status {}: {}", status, error_text)
        }
    }

    /// Kick off AI structuring of the optimized resume.
    pub async fn trigger_parse(&self, analysis_id: &str) -> Result<()> {
        let url = format!("{}/analyze/{}/parse-resume", self.base_url, analysis_id);
        info!("Triggering resume parse: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("Failed to trigger resume parse")?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("Resume parse failed with status {}: {}", status, error_text)
        }
    }

    /// Fetch the structured resume, auto-triggering the parse step when
    /// it is missing.
    pub async fn ensure_structured_resume(&self, analysis_id: &str) -> Result<Value> {
        if let Some(data) = self.structured_resume(analysis_id).await? {
            return Ok(data);
        }

        info!("No structured resume for {}, parsing first", analysis_id);
        self.trigger_parse(analysis_id).await?;

        self.structured_resume(analysis_id)
            .await?
            .with_context(|| format!("Analysis {} has no structured resume after parsing", analysis_id))
    }

    /// Server-rendered HTML for the given template and form data.
    pub async fn preview_html(
        &self,
        analysis_id: &str,
        template_id: &str,
        data: &Value,
    ) -> Result<String> {
        let url = format!("{}/analyze/{}/preview-html", self.base_url, analysis_id);
        trace!("Rendering preview: {} ({})", url, template_id);

        let payload = serde_json::json!({
            "template": template_id,
            "data": data,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .context("Failed to render preview")?;

        let status = response.status();
        if status.is_success() {
            response.text().await.context("Failed to read preview HTML")
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("Preview failed with status {}: {}", status, error_text)
        }
    }

    /// Render the PDF server-side and write it into `output_dir`.
    /// Returns the written path.
    pub async fn download_pdf(
        &self,
        analysis_id: &str,
        template_id: &str,
        data: &Value,
        output_dir: &Path,
    ) -> Result<PathBuf> {
        let url = format!("{}/analyze/{}/download-pdf", self.base_url, analysis_id);
        info!("Downloading PDF: {} ({})", url, template_id);

        let payload = serde_json::json!({
            "template": template_id,
            "data": data,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .context("Failed to request PDF")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("PDF download failed with status {}: {}", status, error_text)
        }

        let bytes = response.bytes().await.context("Failed to read PDF body")?;

        ensure_directory(&output_dir.to_path_buf()).await?;
        let output_path = pdf_output_path(output_dir, analysis_id, template_id);
        tokio::fs::write(&output_path, &bytes)
            .await
            .with_context(|| format!("Failed to write PDF: {}", output_path.display()))?;

        Ok(output_path)
    }
}
