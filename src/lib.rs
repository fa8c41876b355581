pub mod config;
pub mod error;

// Inbound webhook surface
pub mod api;

// Pipeline stages
pub mod confluence;
pub mod gemini;
pub mod github;
pub mod pipeline;

// Process surface
pub mod cli;

// Re-exports
pub use config::Settings;
pub use error::{Error, Result};
