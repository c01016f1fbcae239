//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{ChatMessage, RiskLevel, UnitBaseline};
use crate::triage::{EscalationMode, FilledSlots, TicketData, TriageAction};

// ============================================
// HEALTH DTOs
// ============================================

/// Root ping response
#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub status: String,
    pub version: String,
}

/// Full health status response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: String,
    pub version: String,
    /// Whether a model API key is present
    pub api_configured: bool,
    /// "ok" or "error"
    pub database: String,
    pub uptime_seconds: u64,
}

// ============================================
// CHAT DTOs
// ============================================

/// Reply to one chat turn
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Ticket id backing the conversation; send it back on the next turn
    pub session_id: String,
    pub response: String,
    pub risk: RiskLevel,
    pub action: TriageAction,
    pub category: String,
    pub missing_info: Vec<String>,
    pub filled_slots: FilledSlots,
    pub request_photo: bool,
    pub ticket_data: Option<TicketData>,
    pub escalation_mode: EscalationMode,
    pub history: Vec<ChatMessage>,
}

// ============================================
// ADMIN DTOs
// ============================================

/// Query parameters for ticket listing
#[derive(Debug, Default, Deserialize)]
pub struct TicketListParams {
    /// Filter by status (Open, Deflected, Escalated)
    #[serde(default)]
    pub status: Option<String>,
}

/// Unit row for the dashboard
#[derive(Debug, Serialize)]
pub struct UnitResponse {
    pub id: i64,
    pub unit_id: String,
    pub move_in_video_summary: Option<String>,
    pub has_baseline: bool,
    pub last_audit_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl From<UnitBaseline> for UnitResponse {
    fn from(b: UnitBaseline) -> Self {
        Self {
            id: b.id,
            unit_id: b.unit_id,
            has_baseline: b.baseline_json.is_some() || b.move_in_video_summary.is_some(),
            move_in_video_summary: b.move_in_video_summary,
            last_audit_date: b.last_audit_date,
            last_updated: b.last_updated,
        }
    }
}
