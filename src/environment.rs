// src/environment.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::session::store::FileCredentialStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub api_base_url: String,
    pub output_path: PathBuf,
    /// Override for the guest credential file; defaults to the per-user
    /// config directory.
    pub credentials_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    local: EnvironmentConfig,
    production: EnvironmentConfig,
}

impl EnvironmentConfig {
    /// Load configuration based on environment
    pub fn load() -> Result<Self> {
        let environment = Self::get_environment();
        info!("Loading configuration for environment: {}", environment);

        let mut config = if PathBuf::from("config.yaml").exists() {
            Self::load_from_file(&environment)?
        } else {
            Self::defaults(&environment)
        };

        // Env overrides so one-off runs don't need a config file edit.
        if let Ok(url) = std::env::var("CVLENS_API_URL") {
            config.api_base_url = url;
        }

        config.output_path = Self::resolve_path(&config.output_path)?;
        if let Some(path) = config.credentials_path.take() {
            config.credentials_path = Some(Self::resolve_path(&path)?);
        }
        Ok(config)
    }

    fn get_environment() -> String {
        std::env::var("CVLENS_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .or_else(|_| std::env::var("ENV"))
            .unwrap_or_else(|_| "local".to_string())
    }

    fn defaults(environment: &str) -> Self {
        let api_base_url = match environment {
            "production" => "https://api.cvlens.app".to_string(),
            _ => "http://127.0.0.1:8000".to_string(),
        };
        Self {
            api_base_url,
            output_path: PathBuf::from("out"),
            credentials_path: None,
        }
    }

    fn load_from_file(environment: &str) -> Result<Self> {
        let config_content =
            std::fs::read_to_string("config.yaml").context("Failed to read config.yaml")?;

        let config_file: ConfigFile =
            serde_yaml::from_str(&config_content).context("Failed to parse config.yaml")?;

        Ok(match environment {
            "production" => config_file.production,
            _ => config_file.local,
        })
    }

    fn resolve_path(path: &PathBuf) -> Result<PathBuf> {
        if path.is_absolute() {
            Ok(path.clone())
        } else {
            let current_dir = std::env::current_dir().context("Failed to get current directory")?;
            Ok(current_dir.join(path))
        }
    }

    /// Location of the guest credential file.
    pub fn credentials_file(&self) -> Result<PathBuf> {
        match &self.credentials_path {
            Some(path) => Ok(path.clone()),
            None => FileCredentialStore::default_path(),
        }
    }

    /// Signed-in account token, when the user has one configured.
    pub fn auth_token() -> Option<String> {
        std::env::var("CVLENS_AUTH_TOKEN").ok()
    }

    /// Ensure all configured directories exist
    pub async fn ensure_directories(&self) -> Result<()> {
        crate::utils::ensure_directory(&self.output_path).await?;

        if let Some(parent) = self.credentials_file()?.parent() {
            crate::utils::ensure_directory(&parent.to_path_buf()).await?;
        }

        Ok(())
    }
}
