use crate::config::GeminiConfig;
use crate::error::{Error, Result};
use crate::gemini::models::{
    Content, CreateFileResponse, GeminiFile, GenerateContentRequest, GenerateContentResponse, Part,
};
use reqwest::{header, Client, Response, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Every repository file is uploaded as plain text regardless of extension
pub const UPLOAD_MIME_TYPE: &str = "text/plain";

/// Client for the generative-model file store and generation endpoints
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(Error::Http)?;

        Ok(Self { client, config })
    }

    /// Upload raw bytes to the file store and return the created entry.
    ///
    /// Uses the two-step resumable protocol: a `start` request carrying the
    /// display name, then a single `upload, finalize` request with the bytes.
    pub async fn upload_file(&self, bytes: Vec<u8>, display_name: &str) -> Result<GeminiFile> {
        let start_url = format!(
            "{}/upload/v1beta/files?key={}",
            self.config.base_url, self.config.api_key
        );
        let metadata = serde_json::json!({ "file": { "display_name": display_name } });
        let content_length = bytes.len().to_string();

        debug!("Gemini upload start: {}", display_name);
        let start = self
            .send_with_retry(|| {
                self.client
                    .post(&start_url)
                    .header("X-Goog-Upload-Protocol", "resumable")
                    .header("X-Goog-Upload-Command", "start")
                    .header("X-Goog-Upload-Header-Content-Length", &content_length)
                    .header("X-Goog-Upload-Header-Content-Type", UPLOAD_MIME_TYPE)
                    .json(&metadata)
            })
            .await?;

        let status = start.status();
        if !status.is_success() {
            let body = start
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::Gemini(format!(
                "Upload session rejected for {display_name}: {status} - {body}"
            )));
        }

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                Error::Gemini("Upload session response missing x-goog-upload-url".to_string())
            })?
            .to_string();

        let response = self
            .send_with_retry(|| {
                self.client
                    .post(&upload_url)
                    .header("X-Goog-Upload-Command", "upload, finalize")
                    .header("X-Goog-Upload-Offset", "0")
                    .header(header::CONTENT_TYPE, UPLOAD_MIME_TYPE)
                    .body(bytes.clone())
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::Gemini(format!(
                "Upload failed for {display_name}: {status} - {body}"
            )));
        }

        let created: CreateFileResponse = response.json().await.map_err(Error::Http)?;
        Ok(created.file)
    }

    /// Fetch current file metadata by resource name (`files/{id}`)
    pub async fn get_file(&self, name: &str) -> Result<GeminiFile> {
        let url = format!(
            "{}/v1beta/{}?key={}",
            self.config.base_url, name, self.config.api_key
        );

        let response = self.send_with_retry(|| self.client.get(&url)).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::Gemini(format!(
                "File lookup failed for {name}: {status} - {body}"
            )));
        }

        response.json::<GeminiFile>().await.map_err(Error::Http)
    }

    /// Submit one multi-part generation request and return the response text
    pub async fn generate_content(&self, model: &str, parts: Vec<Part>) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.base_url, model, self.config.api_key
        );
        let request = GenerateContentRequest {
            contents: vec![Content { parts }],
        };

        debug!("Gemini generate request: model {}", model);
        let response = self
            .send_with_retry(|| self.client.post(&url).json(&request))
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::Gemini(format!(
                "Generation failed: {status} - {body}"
            )));
        }

        let body: GenerateContentResponse = response.json().await.map_err(Error::Http)?;
        let Some(candidate) = body.candidates.into_iter().next() else {
            return Err(Error::Gemini(
                "Generation response contained no candidates".to_string(),
            ));
        };

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        if text.is_empty() {
            return Err(Error::Gemini(
                "Generation response contained no text".to_string(),
            ));
        }

        Ok(text)
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
                    "Gemini rate limited (attempt {}/{}). Retrying in {:?}",
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

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(base_url: String) -> GeminiConfig {
        GeminiConfig {
            base_url,
            api_key: "test-key".to_string(),
        }
    }

    #[test]
    fn test_client_creation() {
        let client = GeminiClient::new(test_config("https://example.test".to_string()));
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_generate_content_concatenates_candidate_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "POST",
                "/v1beta/models/gemini-2.0-flash:generateContent?key=test-key",
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "candidates": [{
                        "content": {"parts": [{"text": "Hello "}, {"text": "world"}]}
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = GeminiClient::new(test_config(server.url())).unwrap();
        let text = client
            .generate_content("gemini-2.0-flash", vec![Part::text("hi")])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(text, "Hello world");
    }

    #[tokio::test]
    async fn test_generate_content_rejects_empty_candidates() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock(
                "POST",
                "/v1beta/models/gemini-2.0-flash:generateContent?key=test-key",
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({"candidates": []}).to_string())
            .create_async()
            .await;

        let client = GeminiClient::new(test_config(server.url())).unwrap();
        let result = client
            .generate_content("gemini-2.0-flash", vec![Part::text("hi")])
            .await;

        assert!(matches!(result, Err(Error::Gemini(_))));
    }

    #[tokio::test]
    async fn test_rate_limited_request_retries_until_exhausted() {
        let mut server = mockito::Server::new_async().await;
        let limited = server
            .mock("GET", "/v1beta/files/abc?key=test-key")
            .with_status(429)
            .expect(4)
            .create_async()
            .await;

        let client = GeminiClient::new(test_config(server.url())).unwrap();
        let result = client.get_file("files/abc").await;

        limited.assert_async().await;
        assert!(matches!(result, Err(Error::Gemini(_))));
    }
}
