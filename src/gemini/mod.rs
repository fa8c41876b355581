pub mod batcher;
pub mod client;
pub mod generator;
pub mod models;

pub use batcher::{PollPolicy, SkipReason, SkippedUpload, UploadBatch, UploadBatcher};
pub use client::GeminiClient;
pub use generator::{generate_documentation, DOC_PROMPT, GEMINI_MODEL};
pub use models::{FileReference, FileState, GeminiFile};
