use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub github: GithubConfig,
    pub gemini: GeminiConfig,
    pub confluence: ConfluenceConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_request_body_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfluenceConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root directory for per-run repository snapshots
    pub workdir: PathBuf,
    /// Delay between file-store status polls, in seconds
    pub poll_interval_secs: u64,
    /// Maximum number of status polls per uploaded file
    pub poll_max_attempts: u32,
    /// Overall per-file deadline for reaching a terminal state, in seconds
    pub poll_deadline_secs: u64,
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "9000".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid PORT value".to_string()))?;

        let max_request_body_size = std::env::var("MAX_REQUEST_BODY_SIZE")
            .unwrap_or_else(|_| "1048576".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid MAX_REQUEST_BODY_SIZE value".to_string()))?;

        let github_base_url = std::env::var("GITHUB_BASE_URL")
            .unwrap_or_else(|_| "https://api.github.com".to_string());
        let github_token = std::env::var("GITHUB_TOKEN").ok();

        let gemini_base_url = std::env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string());
        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| Error::Config("GEMINI_API_KEY must be set".to_string()))?;

        let confluence_base_url = std::env::var("CONFLUENCE_BASE_URL")
            .map_err(|_| Error::Config("CONFLUENCE_BASE_URL must be set".to_string()))?;
        let confluence_client_id = std::env::var("CONFLUENCE_CLIENT_ID")
            .map_err(|_| Error::Config("CONFLUENCE_CLIENT_ID must be set".to_string()))?;
        let confluence_client_secret = std::env::var("CONFLUENCE_CLIENT_SECRET")
            .map_err(|_| Error::Config("CONFLUENCE_CLIENT_SECRET must be set".to_string()))?;

        let workdir = std::env::var("WORKDIR")
            .unwrap_or_else(|_| "./data/runs".to_string())
            .into();

        let poll_interval_secs = std::env::var("UPLOAD_POLL_INTERVAL")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid UPLOAD_POLL_INTERVAL value".to_string()))?;

        let poll_max_attempts = std::env::var("UPLOAD_POLL_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid UPLOAD_POLL_MAX_ATTEMPTS value".to_string()))?;

        let poll_deadline_secs = std::env::var("UPLOAD_POLL_DEADLINE")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid UPLOAD_POLL_DEADLINE value".to_string()))?;

        Ok(Settings {
            server: ServerConfig {
                host,
                port,
                max_request_body_size,
            },
            github: GithubConfig {
                base_url: github_base_url,
                token: github_token,
                user_agent: format!("Repodoc/{}", env!("CARGO_PKG_VERSION")),
            },
            gemini: GeminiConfig {
                base_url: gemini_base_url,
                api_key: gemini_api_key,
            },
            confluence: ConfluenceConfig {
                base_url: confluence_base_url,
                client_id: confluence_client_id,
                client_secret: confluence_client_secret,
            },
            pipeline: PipelineConfig {
                workdir,
                poll_interval_secs,
                poll_max_attempts,
                poll_deadline_secs,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("Port must be non-zero".to_string()));
        }

        for (name, value) in [
            ("GITHUB_BASE_URL", &self.github.base_url),
            ("GEMINI_BASE_URL", &self.gemini.base_url),
            ("CONFLUENCE_BASE_URL", &self.confluence.base_url),
        ] {
            url::Url::parse(value)
                .map_err(|_| Error::Config(format!("{name} is not a valid URL: {value}")))?;
        }

        if self.gemini.api_key.is_empty() {
            return Err(Error::Config("GEMINI_API_KEY must not be empty".to_string()));
        }

        if self.confluence.client_id.is_empty() || self.confluence.client_secret.is_empty() {
            return Err(Error::Config(
                "Confluence credentials must not be empty".to_string(),
            ));
        }

        if self.pipeline.poll_interval_secs == 0 {
            return Err(Error::Config(
                "Upload poll interval must be non-zero".to_string(),
            ));
        }

        if self.pipeline.poll_max_attempts == 0 {
            return Err(Error::Config(
                "Upload poll attempt count must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}
