use crate::error::Result;
use crate::gemini::client::GeminiClient;
use crate::gemini::models::{FileReference, Part};
use tracing::debug;

/// Model every generation request is sent to
pub const GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Instruction prepended to every generation request
pub const DOC_PROMPT: &str = "Going through these source files of this application repo, \
document the application at high level without getting into code details. Documentation \
format should be such that it can be directly pushed into atlassian confluence wiki page. \
Include simple mermaid diagrams where applicable.";

/// Ask the model for high-level documentation over the uploaded files.
///
/// Builds one multi-part request: the fixed instruction first, then one
/// file citation per reference in batch order.
pub async fn generate_documentation(
    client: &GeminiClient,
    references: &[FileReference],
) -> Result<String> {
    let mut parts = Vec::with_capacity(references.len() + 1);
    parts.push(Part::text(DOC_PROMPT));
    for reference in references {
        parts.push(Part::file(
            reference.uri.as_str(),
            reference.mime_type.as_str(),
        ));
    }

    debug!(
        "Requesting documentation over {} file references",
        references.len()
    );
    client.generate_content(GEMINI_MODEL, parts).await
}
