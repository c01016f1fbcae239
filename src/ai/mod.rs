//! Hosted Model Integration
//!
//! Thin layer over the multimodal model that does the actual diagnosis and
//! damage comparison.
//!
//! ## Architecture
//!
//! - **Backend**: `ModelBackend` trait and prompt part types
//! - **Client**: Gemini REST implementation with retries and media upload
//! - **Reply**: Lenient JSON extraction from model replies

mod backend;
mod client;
pub mod reply;
#[cfg(test)]
pub mod scripted;

pub use backend::{MediaHandle, ModelBackend, ModelError, ModelRequest, Part};
pub use client::{GeminiClient, GeminiConfig, DEFAULT_MODEL};
pub use reply::parse_json_reply;
