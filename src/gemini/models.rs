use serde::{Deserialize, Serialize};

/// File store entry as reported by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiFile {
    /// Resource name, `files/{id}`
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub uri: String,
    pub mime_type: String,
    pub state: FileState,
}

/// Processing state of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    Processing,
    Active,
    Failed,
    #[serde(other)]
    StateUnspecified,
}

/// Response wrapper returned by the upload endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFileResponse {
    pub file: GeminiFile,
}

/// Opaque handle to an uploaded file, ready to cite in a generate request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    pub uri: String,
    pub mime_type: String,
    pub display_name: String,
}

/// One part of a generate request or response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<FileData>,
}

impl Part {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            text: Some(value.into()),
            file_data: None,
        }
    }

    pub fn file(uri: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            text: None,
            file_data: Some(FileData {
                file_uri: uri.into(),
                mime_type: mime_type.into(),
            }),
        }
    }
}

/// Uploaded-file citation inside a generate request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileData {
    pub file_uri: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Content,
}
