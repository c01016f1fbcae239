//! Scripted model backend for tests

use crate::ai::backend::{MediaHandle, ModelBackend, ModelError, ModelRequest};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays canned replies in order and records what it was asked
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<ModelRequest>>,
    uploads: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    fail_uploads: bool,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
        self
    }

    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Err(message.into()));
        self
    }

    pub fn failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> String {
        self.prompts
            .lock()
            .unwrap()
            .last()
            .map(|r| r.prompt_text())
            .unwrap_or_default()
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: ModelRequest) -> Result<String, ModelError> {
        self.prompts.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(ModelError::ApiError {
                status: 500,
                message,
            }),
            None => Err(ModelError::EmptyResponse),
        }
    }

    async fn upload_media(&self, data: Vec<u8>, mime_type: &str) -> Result<MediaHandle, ModelError> {
        if self.fail_uploads {
            return Err(ModelError::MediaFailed("files/failed".to_string()));
        }
        let mut uploads = self.uploads.lock().unwrap();
        let name = format!("files/test-{}", uploads.len());
        uploads.push(format!("{}:{}:{}", name, mime_type, data.len()));
        Ok(MediaHandle {
            uri: format!("https://files.test/{}", name),
            name,
            mime_type: mime_type.to_string(),
        })
    }

    async fn delete_media(&self, handle: &MediaHandle) -> Result<(), ModelError> {
        self.deleted.lock().unwrap().push(handle.name.clone());
        Ok(())
    }
}
