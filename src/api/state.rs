//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::ai::ModelBackend;
use crate::analyze::Diagnoser;
use crate::api::error::{ApiError, ApiResult};
use crate::audit::VideoAuditor;
use crate::config::Config;
use crate::storage::Store;
use crate::triage::TriageAgent;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Ticket, unit, lead and audit records
    pub store: Arc<Store>,
    /// Hosted model used by chat, analyze and audit
    pub model: Arc<dyn ModelBackend>,
    pub config: Arc<Config>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<Store>, model: Arc<dyn ModelBackend>, config: Config) -> Self {
        Self {
            store,
            model,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn api_configured(&self) -> bool {
        self.model.is_configured()
    }

    /// Fail fast for AI routes when no API key is set
    pub fn require_model(&self) -> ApiResult<()> {
        if self.api_configured() {
            Ok(())
        } else {
            Err(ApiError::ServiceUnavailable(
                "AI model is not configured (set GEMINI_API_KEY)".to_string(),
            ))
        }
    }

    pub fn triage_agent(&self) -> TriageAgent {
        TriageAgent::new(Arc::clone(&self.model))
    }

    pub fn diagnoser(&self) -> Diagnoser {
        Diagnoser::new(Arc::clone(&self.model))
    }

    pub fn auditor(&self) -> VideoAuditor {
        VideoAuditor::new(Arc::clone(&self.model), Arc::clone(&self.store))
    }
}
