pub mod client;
pub mod models;
pub mod publisher;

pub use client::ConfluenceClient;
pub use models::{PageUpdate, WikiPage};
pub use publisher::publish;
