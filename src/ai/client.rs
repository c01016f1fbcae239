//! Gemini REST API Client
//!
//! HTTP client for the hosted multimodal model: text/photo generation and
//! video upload through the provider's file store.

use crate::ai::backend::{MediaHandle, ModelBackend, ModelError, ModelRequest, Part};
use async_trait::async_trait;
use base64::Engine as _;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Default model used for triage and audits
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Gemini REST API client
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

/// Configuration for the Gemini client
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key; `None` leaves the client unconfigured
    pub api_key: Option<String>,
    /// Model name, e.g. "gemini-2.0-flash"
    pub model: String,
    /// Base URL (e.g., "https://generativelanguage.googleapis.com")
    pub base_url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Maximum attempts for retryable failures
    pub max_retries: u32,
    /// Backoff unit; attempt `n` waits `n² × base`
    pub retry_base_delay_ms: u64,
    /// Delay between media state polls
    pub media_poll_interval_ms: u64,
    /// Give up waiting for media processing after this long
    pub media_max_wait_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            request_timeout_ms: 120_000,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            media_poll_interval_ms: 2000,
            media_max_wait_secs: 300,
        }
    }
}

impl GeminiClient {
    /// Create a new client with the given configuration
    pub fn new(config: GeminiConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn api_key(&self) -> Result<&str, ModelError> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ModelError::NotConfigured)
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/v1beta/files", self.config.base_url.trim_end_matches('/'))
    }

    fn file_url(&self, name: &str) -> String {
        format!("{}/v1beta/{}", self.config.base_url.trim_end_matches('/'), name)
    }

    /// Send a request with retry logic
    ///
    /// Timeouts, connection failures, 429 and 5xx responses are retried with
    /// quadratic backoff (1s, 4s, 9s...). A 429 `Retry-After` replaces the
    /// next backoff, capped at the request timeout. Other statuses fail
    /// immediately.
    async fn send_with_retry<F>(&self, build: F) -> Result<Response, ModelError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut last_error = ModelError::Unavailable;
        let attempts = self.config.max_retries.max(1);
        let mut retry_after: Option<Duration> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let backoff =
                    Duration::from_millis(self.config.retry_base_delay_ms * (attempt as u64).pow(2));
                tokio::time::sleep(retry_after.take().unwrap_or(backoff)).await;
            }

            match build().send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    } else if status == StatusCode::TOO_MANY_REQUESTS {
                        let cap = Duration::from_millis(self.config.request_timeout_ms);
                        retry_after = retry_after_header(&response).map(|d| d.min(cap));
                        tracing::warn!(
                            attempt,
                            retry_after_ms = retry_after.map(|d| d.as_millis() as u64),
                            "Model API rate limited"
                        );
                        last_error = ModelError::RateLimited;
                        continue;
                    } else if status.is_server_error() {
                        let text = response.text().await.unwrap_or_default();
                        tracing::warn!(status = status.as_u16(), attempt, "Model API server error");
                        last_error = ModelError::ApiError {
                            status: status.as_u16(),
                            message: text,
                        };
                        continue;
                    } else {
                        let text = response.text().await.unwrap_or_default();
                        return Err(ModelError::ApiError {
                            status: status.as_u16(),
                            message: text,
                        });
                    }
                }
                Err(e) => {
                    last_error = classify(e);
                    tracing::warn!(attempt, error = %last_error, "Model API request failed");
                    continue;
                }
            }
        }

        Err(last_error)
    }

    async fn get_file(&self, name: &str) -> Result<FileResource, ModelError> {
        let key = self.api_key()?;
        let url = self.file_url(name);

        let response = self
            .send_with_retry(|| self.client.get(&url).header("x-goog-api-key", key))
            .await?;

        response.json().await.map_err(ModelError::Request)
    }
}

#[async_trait]
impl ModelBackend for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn is_configured(&self) -> bool {
        self.api_key().is_ok()
    }

    async fn generate(&self, request: ModelRequest) -> Result<String, ModelError> {
        let key = self.api_key()?;
        let url = self.generate_url();
        let body = GenerateRequest::from_request(&request);

        let started = Instant::now();
        let response = self
            .send_with_retry(|| {
                self.client
                    .post(&url)
                    .header("x-goog-api-key", key)
                    .json(&body)
            })
            .await?;

        let reply: GenerateResponse = response.json().await.map_err(ModelError::Request)?;
        let text = reply.text().ok_or(ModelError::EmptyResponse)?;

        tracing::debug!(
            model = %self.config.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            reply_chars = text.len(),
            "Model reply received"
        );

        Ok(text)
    }

    async fn upload_media(&self, data: Vec<u8>, mime_type: &str) -> Result<MediaHandle, ModelError> {
        let key = self.api_key()?;
        let url = self.upload_url();
        let size = data.len();

        let response = self
            .send_with_retry(|| {
                self.client
                    .post(&url)
                    .header("x-goog-api-key", key)
                    .header("X-Goog-Upload-Protocol", "raw")
                    .header(reqwest::header::CONTENT_TYPE, mime_type)
                    .body(data.clone())
            })
            .await?;

        let uploaded: UploadResponse = response.json().await.map_err(ModelError::Request)?;
        let mut file = uploaded.file;
        tracing::info!(file = %file.name, bytes = size, "Media uploaded, waiting for processing");

        // Wait for processing to complete
        let deadline = Instant::now() + Duration::from_secs(self.config.media_max_wait_secs);
        while file.state.as_deref() == Some("PROCESSING") {
            if Instant::now() >= deadline {
                return Err(ModelError::MediaTimeout(self.config.media_max_wait_secs));
            }
            tokio::time::sleep(Duration::from_millis(self.config.media_poll_interval_ms)).await;
            file = self.get_file(&file.name).await?;
        }

        if file.state.as_deref() == Some("FAILED") {
            return Err(ModelError::MediaFailed(file.name));
        }

        Ok(MediaHandle {
            name: file.name,
            uri: file.uri,
            mime_type: file.mime_type.unwrap_or_else(|| mime_type.to_string()),
        })
    }

    async fn delete_media(&self, handle: &MediaHandle) -> Result<(), ModelError> {
        let key = self.api_key()?;
        let url = self.file_url(&handle.name);

        self.send_with_retry(|| self.client.delete(&url).header("x-goog-api-key", key))
            .await?;
        Ok(())
    }
}

/// Seconds form of `Retry-After`; HTTP dates are ignored
fn retry_after_header(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn classify(e: reqwest::Error) -> ModelError {
    if e.is_timeout() {
        ModelError::Timeout
    } else if e.is_connect() {
        ModelError::Unavailable
    } else {
        ModelError::Request(e)
    }
}

// ============================================
// Request/Response DTOs
// ============================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

impl GenerateRequest {
    fn from_request(request: &ModelRequest) -> Self {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => WirePart::Text { text: text.clone() },
                Part::Inline { mime_type, data } => WirePart::InlineData {
                    inline_data: Blob {
                        mime_type: mime_type.clone(),
                        data: base64::engine::general_purpose::STANDARD.encode(data),
                    },
                },
                Part::Media(handle) => WirePart::FileData {
                    file_data: FileData {
                        mime_type: handle.mime_type.clone(),
                        file_uri: handle.uri.clone(),
                    },
                },
            })
            .collect();

        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum WirePart {
    Text { text: String },
    InlineData { inline_data: Blob },
    FileData { file_data: FileData },
}

#[derive(Debug, Serialize, Deserialize)]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    /// Text of the first candidate, parts joined
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| match p {
                WirePart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();

        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: FileResource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResource {
    name: String,
    #[serde(default)]
    uri: String,
    mime_type: Option<String>,
    state: Option<String>,
}
