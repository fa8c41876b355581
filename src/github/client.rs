use crate::config::GithubConfig;
use crate::error::{Error, Result};
use crate::github::models::Comparison;
use futures::StreamExt;
use reqwest::{header, Client, Response, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::sleep;
use tracing::{debug, warn};

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// GitHub API client
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    config: GithubConfig,
}

impl GitHubClient {
    /// Create a new GitHub client
    pub fn new(config: GithubConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );

        // Add authentication if token is provided
        if let Some(token) = &config.token {
            let auth_value = format!("Bearer {token}");
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Internal(format!("Invalid GitHub token: {e}")))?,
            );
        }

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            // Zipball downloads of large repositories take a while
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(Error::Http)?;

        Ok(Self { client, config })
    }

    /// Download a repository zipball for a branch, streaming it to `dest`.
    /// Returns the number of bytes written.
    pub async fn download_zipball(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        dest: &Path,
    ) -> Result<u64> {
        let url = format!(
            "{}/repos/{owner}/{repo}/zipball/{branch}",
            self.config.base_url
        );
        debug!("GitHub API request: GET {}", url);

        let response = self.send_with_retry(|| self.client.get(&url)).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::GitHub(format!(
                "Zipball download failed for {owner}/{repo}@{branch}: {status} - {body}"
            )));
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!("Downloaded {} bytes to {}", written, dest.display());
        Ok(written)
    }

    /// Compare two commits
    pub async fn compare(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<Comparison> {
        let url = format!(
            "{}/repos/{owner}/{repo}/compare/{base}...{head}",
            self.config.base_url
        );
        debug!("GitHub API request: GET {}", url);

        let response = self.send_with_retry(|| self.client.get(&url)).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::GitHub(format!(
                "Compare failed for {base}...{head}: {status} - {body}"
            )));
        }

        response.json::<Comparison>().await.map_err(Error::Http)
    }

    /// Send a request, retrying rate-limited responses with exponential backoff.
    /// Only HTTP 429 is retried; every other failure propagates to the caller.
    async fn send_with_retry<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut retries = 0;
        let mut backoff = INITIAL_BACKOFF;

        loop {
            let response = build().send().await?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RETRIES {
                retries += 1;
                warn!(
                    "GitHub rate limited (attempt {}/{}). Retrying in {:?}",
                    retries, MAX_RETRIES, backoff
                );
                sleep(backoff).await;
                backoff *= 2;
                continue;
            }

            return Ok(response);
        }
    }
}
