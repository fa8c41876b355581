pub mod archive;
pub mod client;
pub mod fetcher;
pub mod models;

pub use client::GitHubClient;
pub use fetcher::{FetchedRepository, RepoFetcher};
pub use models::PushEvent;
