//! Uploaded media
//!
//! MIME allow-lists for photos and walkthrough videos, plus the in-memory
//! representation of an uploaded file.

/// Photo types accepted by chat and diagnosis
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Video types accepted by audits
pub const ALLOWED_VIDEO_TYPES: &[&str] = &[
    "video/mp4",
    "video/quicktime",
    "video/x-msvideo",
    "video/webm",
    "video/mpeg",
];

/// A file received in a multipart request
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: Option<String>,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Upload {
    pub fn new(content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: None,
            content_type: content_type.into(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_image(&self) -> bool {
        is_allowed_image(&self.content_type)
    }

    pub fn is_video(&self) -> bool {
        is_allowed_video(&self.content_type)
    }
}

fn essence(mime: &str) -> String {
    mime.split(';').next().unwrap_or("").trim().to_lowercase()
}

pub fn is_allowed_image(mime: &str) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&essence(mime).as_str())
}

pub fn is_allowed_video(mime: &str) -> bool {
    ALLOWED_VIDEO_TYPES.contains(&essence(mime).as_str())
}
