//! Model backend abstraction
//!
//! Every AI feature (triage, photo diagnosis, video audit) talks to the hosted
//! model through [`ModelBackend`], so handlers and tests can swap the real
//! client for a scripted one.

use async_trait::async_trait;
use thiserror::Error;

/// Reference to media uploaded to the provider's file store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle {
    /// Provider resource name, e.g. "files/abc123"
    pub name: String,
    /// URI to reference the file from a prompt
    pub uri: String,
    pub mime_type: String,
}

/// One piece of a multimodal prompt
#[derive(Debug, Clone)]
pub enum Part {
    Text(String),
    /// Small binary payload sent inline (photos)
    Inline { mime_type: String, data: Vec<u8> },
    /// Previously uploaded media (videos)
    Media(MediaHandle),
}

/// A single-turn generation request
#[derive(Debug, Clone, Default)]
pub struct ModelRequest {
    pub parts: Vec<Part>,
}

impl ModelRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::Text(prompt.into())],
        }
    }

    pub fn with_inline(mut self, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.parts.push(Part::Inline {
            mime_type: mime_type.into(),
            data,
        });
        self
    }

    pub fn with_media(mut self, handle: MediaHandle) -> Self {
        self.parts.push(Part::Media(handle));
        self
    }

    /// Concatenated text parts, used for logging and by scripted backends
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_attachment(&self) -> bool {
        self.parts.iter().any(|p| !matches!(p, Part::Text(_)))
    }
}

/// Hosted model operations needed by the backend
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Short backend name for logs and health output
    fn name(&self) -> &str;

    /// Whether credentials are present; unconfigured backends fail every call
    fn is_configured(&self) -> bool {
        true
    }

    /// Generate a text reply
    async fn generate(&self, request: ModelRequest) -> Result<String, ModelError>;

    /// Upload media and wait until the provider has finished processing it
    async fn upload_media(&self, data: Vec<u8>, mime_type: &str) -> Result<MediaHandle, ModelError>;

    /// Remove previously uploaded media
    async fn delete_media(&self, handle: &MediaHandle) -> Result<(), ModelError>;
}

/// Errors that can occur when talking to the hosted model
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model API key not configured")]
    NotConfigured,

    #[error("Model service unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Rate limited")]
    RateLimited,

    #[error("Model returned no text")]
    EmptyResponse,

    #[error("Media processing failed: {0}")]
    MediaFailed(String),

    #[error("Media processing did not finish within {0} seconds")]
    MediaTimeout(u64),
}
