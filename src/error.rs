use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("GitHub API error: {0}")]
    GitHub(String),

    #[error("Gemini API error: {0}")]
    Gemini(String),

    #[error("Confluence API error: {0}")]
    Confluence(String),

    #[error("File processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Upload processing timed out: {0}")]
    UploadTimeout(String),

    #[error("Wiki page version conflict: {0}")]
    VersionConflict(String),

    #[error("No files were uploaded; nothing to document")]
    EmptyBatch,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Message form that is safe to write to logs, with secret-bearing
    /// text redacted
    pub fn log_safe(&self) -> String {
        match self {
            // reqwest errors can embed full request URLs, key included
            Error::Http(_) => "External HTTP request failed".to_string(),

            // Internal messages may quote configuration values
            Error::Internal(msg) => {
                if msg.to_lowercase().contains("password")
                    || msg.to_lowercase().contains("secret")
                    || msg.to_lowercase().contains("token")
                    || msg.to_lowercase().contains("key")
                {
                    "Internal error (details redacted)".to_string()
                } else {
                    format!("Internal error: {msg}")
                }
            }

            // Safe to log verbatim
            Error::Io(_) => "File system operation failed".to_string(),
            Error::Zip(e) => format!("Archive error: {e}"),
            Error::GitHub(msg) => format!("GitHub API error: {msg}"),
            Error::Gemini(msg) => format!("Gemini API error: {msg}"),
            Error::Confluence(msg) => format!("Confluence API error: {msg}"),
            Error::ProcessingFailed(msg) => format!("File processing failed: {msg}"),
            Error::UploadTimeout(msg) => format!("Upload processing timed out: {msg}"),
            Error::VersionConflict(msg) => format!("Wiki page version conflict: {msg}"),
            Error::EmptyBatch => "No files were uploaded; nothing to document".to_string(),
            Error::Config(msg) => format!("Configuration error: {msg}"),
            Error::Validation(msg) => format!("Validation error: {msg}"),
        }
    }
}

// Implement IntoResponse so any pipeline error surfaces through the
// webhook handler as a structured error response
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Logged internally before mapping to a response status
        tracing::error!("Request error: {}", self.log_safe());

        let (status, error_message) = match &self {
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Error::VersionConflict(_) => (
                StatusCode::CONFLICT,
                "Wiki page version conflict".to_string(),
            ),
            Error::EmptyBatch => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "No files were uploaded; nothing to document".to_string(),
            ),
            Error::Http(_) | Error::GitHub(_) | Error::Gemini(_) | Error::Confluence(_) => (
                StatusCode::BAD_GATEWAY,
                "External service error".to_string(),
            ),
            Error::UploadTimeout(_) => (
                StatusCode::GATEWAY_TIMEOUT,
                "Upload processing timed out".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
