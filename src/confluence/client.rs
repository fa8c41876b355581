use crate::config::ConfluenceConfig;
use crate::confluence::models::{PageUpdate, WikiPage};
use crate::error::{Error, Result};
use reqwest::{header, Client, Response, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Confluence content API client
#[derive(Clone)]
pub struct ConfluenceClient {
    client: Client,
    config: ConfluenceConfig,
}

impl ConfluenceClient {
    /// Create a new Confluence client
    pub fn new(config: ConfluenceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(Error::Http)?;

        Ok(Self { client, config })
    }

    /// Fetch a page with its storage body and version
    pub async fn get_page(&self, id: &str) -> Result<WikiPage> {
        let url = self.content_url(id);
        debug!("Confluence API request: GET {}", url);

        let response = self
            .send_with_retry(|| {
                self.client
                    .get(&url)
                    .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
                    .header(header::ACCEPT, "application/json")
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::Confluence(format!(
                "Page fetch failed for {id}: {status} - {body}"
            )));
        }

        response.json::<WikiPage>().await.map_err(Error::Http)
    }

    /// Overwrite a page. The update must carry the next version number;
    /// a stale version is rejected by the API with a conflict.
    pub async fn update_page(&self, id: &str, update: &PageUpdate) -> Result<WikiPage> {
        let url = self.content_url(id);
        debug!("Confluence API request: PUT {}", url);

        let response = self
            .send_with_retry(|| {
                self.client
                    .put(&url)
                    .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
                    .header(header::ACCEPT, "application/json")
                    .json(update)
            })
            .await?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            return Err(Error::VersionConflict(format!(
                "Page {id} changed since it was read (update carried version {})",
                update.version.number
            )));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::Confluence(format!(
                "Page update failed for {id}: {status} - {body}"
            )));
        }

        response.json::<WikiPage>().await.map_err(Error::Http)
    }

    fn content_url(&self, id: &str) -> String {
        format!(
            "{}/wiki/rest/api/content/{id}?expand=body.storage,version",
            self.config.base_url
        )
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
                    "Confluence rate limited (attempt {}/{}). Retrying in {:?}",
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
