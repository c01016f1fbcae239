//! Triage Agent
//!
//! Runs one turn of the slot-filling conversation: frames the prompt, asks the
//! model, then enforces the conversation rules on whatever comes back.
//!
//! # Rules enforced locally
//!
//! - CONFIRM and CREATE_TICKET require all seven slots
//! - CREATE_TICKET requires a read-back followed by a tenant "yes"
//! - Contact must contain a phone number or email
//! - Life-safety keywords always produce EMERGENCY / Red

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};

use crate::ai::reply::{bool_field, str_field};
use crate::ai::{parse_json_reply, ModelBackend, ModelRequest};
use crate::media::Upload;
use crate::storage::{ChatMessage, Priority, RiskLevel, Role, TicketDetails};
use crate::triage::prompt::{build_triage_prompt, IMAGE_MARKER};
use crate::triage::slots::{contact_from_history, is_valid_contact, FilledSlots, Slot};

const FALLBACK_TEXT: &str =
    "Sorry, I'm having trouble right now. Could you describe the issue you're experiencing and share a photo if possible?";

const DEFAULT_CATEGORY: &str = "General";

/// Next step chosen for the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriageAction {
    Question,
    Confirm,
    CreateTicket,
    Emergency,
}

impl TriageAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
            "QUESTION" | "ASK" => Some(TriageAction::Question),
            "CONFIRM" | "CONFIRMATION" => Some(TriageAction::Confirm),
            "CREATE_TICKET" | "CREATE" | "TICKET" => Some(TriageAction::CreateTicket),
            "EMERGENCY" | "ESCALATE" => Some(TriageAction::Emergency),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriageAction::Question => "QUESTION",
            TriageAction::Confirm => "CONFIRM",
            TriageAction::CreateTicket => "CREATE_TICKET",
            TriageAction::Emergency => "EMERGENCY",
        }
    }
}

/// Who handles the issue once the ticket exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationMode {
    SelfHelp,
    Dispatch,
    Emergency,
}

impl EscalationMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "self_help" | "diy" | "deflect" => Some(EscalationMode::SelfHelp),
            "dispatch" | "technician" | "standard" => Some(EscalationMode::Dispatch),
            "emergency" => Some(EscalationMode::Emergency),
            _ => None,
        }
    }
}

/// Slot data handed to ticket creation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketData {
    #[serde(flatten)]
    pub slots: FilledSlots,
    pub category: String,
    pub priority: Priority,
    pub summary: Option<String>,
}

impl TicketData {
    /// Ticket columns to update from the gathered slots
    pub fn to_details(&self) -> TicketDetails {
        let contact_info = self.slots.contact.as_ref().map(|contact| {
            let mut info = Map::new();
            if contact.contains('@') {
                info.insert("email".to_string(), Value::String(contact.clone()));
            } else {
                info.insert("phone".to_string(), Value::String(contact.clone()));
            }
            if let Some(access) = &self.slots.access {
                info.insert("access".to_string(), Value::String(access.clone()));
            }
            Value::Object(info)
        });

        let phone = self
            .slots
            .contact
            .as_ref()
            .filter(|c| !c.contains('@'))
            .cloned();

        let summary = self.summary.clone().or_else(|| {
            self.slots.issue.as_ref().map(|issue| match &self.slots.location {
                Some(location) => format!("{} ({})", issue, location),
                None => issue.clone(),
            })
        });

        TicketDetails {
            name: self.slots.tenant_name.clone(),
            phone,
            unit_id: self.slots.unit.clone(),
            category: Some(self.category.clone()),
            priority: Some(self.priority),
            summary,
            issue_title: self.slots.issue.clone(),
            issue_description: self.slots.severity.clone(),
            contact_info,
        }
    }
}

/// Result of one triage turn
#[derive(Debug, Clone, Serialize)]
pub struct TriageOutcome {
    pub text: String,
    pub risk: RiskLevel,
    pub action: TriageAction,
    pub category: String,
    pub missing_info: Vec<String>,
    pub filled_slots: FilledSlots,
    pub request_photo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_data: Option<TicketData>,
    pub escalation_mode: EscalationMode,
    /// Set when the model call failed and this is the canned reply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TriageOutcome {
    /// Canned reply used when the model cannot be reached
    pub fn fallback(error: impl Into<String>) -> Self {
        Self {
            text: FALLBACK_TEXT.to_string(),
            risk: RiskLevel::Green,
            action: TriageAction::Question,
            category: DEFAULT_CATEGORY.to_string(),
            missing_info: Slot::ALL.iter().map(|s| s.label().to_string()).collect(),
            filled_slots: FilledSlots::default(),
            request_photo: false,
            ticket_data: None,
            escalation_mode: EscalationMode::Dispatch,
            error: Some(error.into()),
        }
    }
}

/// Slot-filling triage over a model backend
pub struct TriageAgent {
    backend: Arc<dyn ModelBackend>,
}

impl TriageAgent {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self { backend }
    }

    /// Run a text-only turn
    pub async fn triage(&self, history: &[ChatMessage]) -> TriageOutcome {
        self.triage_with_image(history, None).await
    }

    /// Run a turn, attaching the tenant's photo when one was just uploaded
    pub async fn triage_with_image(
        &self,
        history: &[ChatMessage],
        image: Option<&Upload>,
    ) -> TriageOutcome {
        let has_image = image.is_some() || history_has_image(history);
        let prompt = build_triage_prompt(history, has_image);

        let mut request = ModelRequest::text(prompt);
        if let Some(image) = image {
            request = request.with_inline(image.content_type.clone(), image.data.clone());
        }

        match self.backend.generate(request).await {
            Ok(reply) => {
                let outcome = interpret_reply(&reply, history, has_image);
                tracing::debug!(
                    action = outcome.action.as_str(),
                    risk = %outcome.risk,
                    missing = outcome.missing_info.len(),
                    "Triage turn complete"
                );
                outcome
            }
            Err(e) => {
                tracing::warn!(error = %e, backend = self.backend.name(), "Triage model call failed");
                let mut outcome = TriageOutcome::fallback(e.to_string());
                // Safety advice does not depend on the model
                if latest_user_message(history).map_or(false, is_emergency) {
                    escalate_emergency(&mut outcome);
                }
                outcome
            }
        }
    }
}

/// Turn a raw model reply into an outcome that obeys the conversation rules
pub fn interpret_reply(reply: &str, history: &[ChatMessage], has_image: bool) -> TriageOutcome {
    let map = parse_json_reply(reply);

    let mut slots = FilledSlots::from_value(map.get("filled_slots"));
    if !slots.contact.as_deref().map_or(false, is_valid_contact) {
        slots.clear(Slot::Contact);
        if let Some(found) = contact_from_history(history) {
            slots.set(Slot::Contact, found);
        }
    }

    let mut text = str_field(&map, "text")
        .or_else(|| str_field(&map, "response"))
        .unwrap_or_else(|| FALLBACK_TEXT.to_string());

    let mut action = str_field(&map, "action")
        .and_then(|a| TriageAction::parse(&a))
        .unwrap_or(TriageAction::Question);

    let missing = slots.missing();

    if matches!(action, TriageAction::Confirm | TriageAction::CreateTicket) && !missing.is_empty() {
        action = TriageAction::Question;
        text = missing[0].question().to_string();
    }

    if action == TriageAction::CreateTicket && !tenant_confirmed(history) {
        action = TriageAction::Confirm;
        text = format!(
            "Before I submit your request, please confirm these details are correct:\n{}",
            slots.summary()
        );
    }

    let risk = str_field(&map, "risk")
        .or_else(|| str_field(&map, "risk_level"))
        .and_then(|r| RiskLevel::parse_loose(&r))
        .unwrap_or_default();

    let escalation_mode = str_field(&map, "escalation_mode")
        .and_then(|m| EscalationMode::parse(&m))
        .unwrap_or(EscalationMode::Dispatch);

    let category = str_field(&map, "category").unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    let request_photo = !has_image && bool_field(&map, "request_photo").unwrap_or(false);

    let mut outcome = TriageOutcome {
        text,
        risk,
        action,
        category,
        missing_info: missing.iter().map(|s| s.label().to_string()).collect(),
        filled_slots: slots,
        request_photo,
        ticket_data: None,
        escalation_mode,
        error: None,
    };

    let emergency_reported = latest_user_message(history).map_or(false, is_emergency);
    if outcome.action == TriageAction::Emergency || emergency_reported {
        escalate_emergency(&mut outcome);
    }

    if matches!(
        outcome.action,
        TriageAction::Confirm | TriageAction::CreateTicket | TriageAction::Emergency
    ) {
        let severity = outcome.filled_slots.severity.clone().unwrap_or_default();
        let priority = match (outcome.action, outcome.risk) {
            (TriageAction::Emergency, _) => Priority::Emergency,
            (_, RiskLevel::Red) => Priority::High,
            _ => Priority::from_severity(&severity),
        };

        outcome.ticket_data = Some(TicketData {
            slots: outcome.filled_slots.clone(),
            category: outcome.category.clone(),
            priority,
            summary: str_field(&map, "summary"),
        });
    }

    outcome
}

fn escalate_emergency(outcome: &mut TriageOutcome) {
    if outcome.action != TriageAction::Emergency {
        outcome.text = format!(
            "This sounds like an emergency. Please get to a safe place and call 911 right away. {}",
            outcome.text
        );
    }
    outcome.action = TriageAction::Emergency;
    outcome.risk = RiskLevel::Red;
    outcome.escalation_mode = EscalationMode::Emergency;
    outcome.request_photo = false;
}

fn latest_user_message(history: &[ChatMessage]) -> Option<&str> {
    history
        .iter()
        .rev()
        .find(|m| m.role == Role::User && m.content != IMAGE_MARKER)
        .map(|m| m.content.as_str())
}

fn history_has_image(history: &[ChatMessage]) -> bool {
    history
        .iter()
        .any(|m| m.role == Role::User && m.content == IMAGE_MARKER)
}

fn emergency_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(gas (leak|smell)|smell(s|ing)? (of )?gas|fire|flames?|on fire|smoke|smoking outlet|sparks?|sparking|carbon monoxide|co alarm|flood(ing|ed)?|burst pipe|electrocut\w*|exposed live wire)\b",
        )
        .expect("valid emergency pattern")
    })
}

fn detector_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(smoke|fire)\s+(detector|alarm)s?\b").expect("valid detector pattern")
    })
}

fn detector_upkeep_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(chirp\w*|beep\w*|batter(y|ies))\b").expect("valid upkeep pattern")
    })
}

/// Life-safety keywords in a tenant message
///
/// A chirping smoke detector or a fire alarm battery is routine upkeep, so
/// detector mentions are ignored in those messages.
pub fn is_emergency(text: &str) -> bool {
    if !emergency_regex().is_match(text) {
        return false;
    }
    if detector_upkeep_regex().is_match(text) {
        let without_detectors = detector_regex().replace_all(text, "");
        return emergency_regex().is_match(&without_detectors);
    }
    true
}

fn affirmation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(yes|yep|yeah|yup|correct|confirm(ed)?|that'?s (all )?(right|correct)|looks (good|right)|sounds good|ok(ay)?|sure|please (submit|do))\b",
        )
        .expect("valid affirmation pattern")
    })
}

/// The tenant's latest message says "yes" to the assistant's CONFIRM read-back
fn tenant_confirmed(history: &[ChatMessage]) -> bool {
    let mut turns = history.iter().rev().filter(|m| m.content != IMAGE_MARKER);

    match (turns.next(), turns.next()) {
        (Some(last), Some(previous)) => {
            last.role == Role::User
                && previous.role == Role::Assistant
                && previous.action.as_deref() == Some(TriageAction::Confirm.as_str())
                && affirmation_regex().is_match(&last.content)
        }
        _ => false,
    }
}
