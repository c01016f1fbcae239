//! Core record types
//!
//! Plain rows created by API calls and read back by the admin dashboard.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Lifecycle status of a maintenance ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TicketStatus {
    #[default]
    Open,
    /// Resolved by self-help instructions, no dispatch needed
    Deflected,
    /// Handed to a professional or the emergency line
    Escalated,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "Open",
            TicketStatus::Deflected => "Deflected",
            TicketStatus::Escalated => "Escalated",
        }
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(TicketStatus::Open),
            "deflected" => Ok(TicketStatus::Deflected),
            "escalated" => Ok(TicketStatus::Escalated),
            other => Err(format!("Unknown ticket status: {}", other)),
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Traffic-light risk classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum RiskLevel {
    /// Cosmetic or minor, can wait
    #[default]
    Green,
    /// Needs attention within days or weeks
    Yellow,
    /// Safety hazard, needs immediate attention
    Red,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Green => "Green",
            RiskLevel::Yellow => "Yellow",
            RiskLevel::Red => "Red",
        }
    }

    /// Lenient parse of model output such as "Yellow (needs attention soon)"
    pub fn parse_loose(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        if lower.starts_with("red") {
            Some(RiskLevel::Red)
        } else if lower.starts_with("yellow") || lower.starts_with("amber") {
            Some(RiskLevel::Yellow)
        } else if lower.starts_with("green") {
            Some(RiskLevel::Green)
        } else {
            None
        }
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_loose(s).ok_or_else(|| format!("Unknown risk level: {}", s))
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatch priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Emergency,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Emergency => "Emergency",
        }
    }

    /// Map a free-text severity ("minor", "urgent", "High"...) to a priority
    ///
    /// Whole words only; the strongest plain keyword wins. A negated keyword
    /// ("not urgent") only counts when nothing else matched.
    pub fn from_severity(severity: &str) -> Self {
        let mut strongest: Option<Priority> = None;
        let mut negated: Option<Priority> = None;

        for caps in severity_regex().captures_iter(severity) {
            let level = match caps[2].to_lowercase().as_str() {
                "emergency" => Priority::Emergency,
                "high" | "urgent" | "severe" => Priority::High,
                _ => Priority::Low,
            };

            if caps.get(1).is_some() {
                negated.get_or_insert(match level {
                    Priority::High => Priority::Low,
                    _ => Priority::Medium,
                });
            } else {
                strongest = strongest.max(Some(level));
            }
        }

        strongest.or(negated).unwrap_or(Priority::Medium)
    }
}

fn severity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b((?:not|no|isn'?t)\s+(?:an?\s+|very\s+|that\s+|too\s+|really\s+)?)?(emergency|high|urgent|severe|low|minor|cosmetic)\b",
        )
        .expect("valid severity pattern")
    })
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "emergency" => Ok(Priority::Emergency),
            other => Err(format!("Unknown priority: {}", other)),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Speaker of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// A single message in a ticket's conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Triage action the assistant took on this turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            action: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            action: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }
}

/// Maintenance ticket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub postal_code: String,
    pub unit_id: Option<String>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub status: TicketStatus,
    pub risk_level: RiskLevel,
    pub summary: Option<String>,
    pub contact_info: Option<serde_json::Value>,
    pub issue_title: Option<String>,
    pub issue_description: Option<String>,
    pub ai_estimated_cost: Option<String>,
    pub ai_diagnosis: Option<String>,
    pub ai_recommended_action: Option<String>,
    pub conversation_history: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to open a ticket
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub name: String,
    pub phone: String,
    pub postal_code: String,
}

impl NewTicket {
    /// Placeholder contact used when the chat widget opens an anonymous session
    pub fn widget_session() -> Self {
        Self {
            name: "Widget User".to_string(),
            phone: "N/A".to_string(),
            postal_code: "N/A".to_string(),
        }
    }
}

/// Slot data copied onto a ticket when the tenant confirms it
#[derive(Debug, Clone, Default)]
pub struct TicketDetails {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub unit_id: Option<String>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub summary: Option<String>,
    pub issue_title: Option<String>,
    pub issue_description: Option<String>,
    pub contact_info: Option<serde_json::Value>,
}

/// Stored move-in baseline for a unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitBaseline {
    pub id: i64,
    pub unit_id: String,
    pub move_in_video_summary: Option<String>,
    pub baseline_json: Option<serde_json::Value>,
    pub last_audit_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Homeowner contact captured for service referral
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub postal_code: String,
    pub issue_category: Option<String>,
    pub ai_estimated_cost: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLead {
    pub name: String,
    pub phone: String,
    pub postal_code: String,
    #[serde(default)]
    pub issue_category: Option<String>,
    #[serde(default)]
    pub ai_estimated_cost: Option<String>,
}

/// One line of an audit report: a room baseline or a newly found damage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditItem {
    pub id: i64,
    pub unit_id: String,
    pub item: String,
    pub room: String,
    pub condition: String,
    pub is_new: bool,
    pub estimated_cost: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditItem {
    pub item: String,
    pub room: String,
    pub condition: String,
    pub is_new: bool,
    pub estimated_cost: Option<String>,
}
