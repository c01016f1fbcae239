//! Multipart form collection
//!
//! The widget posts plain HTML forms: a few text fields plus at most one file.
//! Everything is buffered in memory; the router's body limit caps the size.

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use std::collections::HashMap;

use crate::api::error::{ApiError, ApiResult};
use crate::media::Upload;

/// Buffered multipart form
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, Upload>,
}

impl FormData {
    /// Drain a multipart body
    ///
    /// File parts without a filename and without content are treated as
    /// absent, which is what browsers send for an empty file input.
    pub async fn from_multipart(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = FormData::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let filename = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);

            if filename.is_some() || content_type.is_some() {
                let data = field.bytes().await.map_err(multipart_error)?;
                if data.is_empty() && filename.as_deref().map_or(true, str::is_empty) {
                    continue;
                }
                let mut upload = Upload::new(
                    content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
                    data.to_vec(),
                );
                upload.filename = filename;
                form.files.insert(name, upload);
            } else {
                let value = field.text().await.map_err(multipart_error)?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Trimmed text field; blank counts as missing
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn require_text(&self, name: &str) -> ApiResult<&str> {
        self.text(name)
            .ok_or_else(|| ApiError::Validation(format!("Missing form field '{}'", name)))
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }

    pub fn require_file(&mut self, name: &str) -> ApiResult<Upload> {
        self.take_file(name)
            .ok_or_else(|| ApiError::Validation(format!("Missing file field '{}'", name)))
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::Validation(format!("Invalid multipart body: {}", err.body_text()))
    }
}
