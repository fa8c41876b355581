use serde::{Deserialize, Serialize};

/// Wiki page as returned by the content API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiPage {
    pub id: String,
    pub title: String,
    pub version: PageVersion,
    #[serde(default)]
    pub body: Option<PageBody>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageVersion {
    pub number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageBody {
    pub storage: StorageBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageBody {
    pub value: String,
    pub representation: String,
}

/// Update request for an existing page
#[derive(Debug, Clone, Serialize)]
pub struct PageUpdate {
    #[serde(rename = "type")]
    pub content_type: String,
    pub title: String,
    pub version: PageVersion,
    pub body: PageBody,
}

impl PageUpdate {
    /// Build a storage-format update carrying the given version number
    pub fn new(title: impl Into<String>, version: u32, body: impl Into<String>) -> Self {
        Self {
            content_type: "page".to_string(),
            title: title.into(),
            version: PageVersion { number: version },
            body: PageBody {
                storage: StorageBody {
                    value: body.into(),
                    representation: "storage".to_string(),
                },
            },
        }
    }
}
