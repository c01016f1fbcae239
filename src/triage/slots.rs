//! Ticket slots
//!
//! The seven pieces of information a maintenance ticket needs before it can
//! be created.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

use crate::ai::reply::str_field;
use crate::storage::{ChatMessage, Role};

/// A required ticket field gathered during chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    TenantName,
    Unit,
    Issue,
    Severity,
    Location,
    Access,
    Contact,
}

impl Slot {
    /// All slots in the order they are asked for
    pub const ALL: [Slot; 7] = [
        Slot::TenantName,
        Slot::Unit,
        Slot::Issue,
        Slot::Severity,
        Slot::Location,
        Slot::Access,
        Slot::Contact,
    ];

    /// JSON key inside `filled_slots`
    pub fn key(&self) -> &'static str {
        match self {
            Slot::TenantName => "tenant_name",
            Slot::Unit => "unit",
            Slot::Issue => "issue",
            Slot::Severity => "severity",
            Slot::Location => "location",
            Slot::Access => "access",
            Slot::Contact => "contact",
        }
    }

    /// Name used in the system prompt
    pub fn prompt_name(&self) -> &'static str {
        match self {
            Slot::TenantName => "TENANT_NAME",
            Slot::Unit => "UNIT",
            Slot::Issue => "ISSUE",
            Slot::Severity => "SEVERITY",
            Slot::Location => "LOCATION",
            Slot::Access => "ACCESS",
            Slot::Contact => "CONTACT",
        }
    }

    /// Label reported in `missing_info`
    pub fn label(&self) -> &'static str {
        match self {
            Slot::TenantName => "Tenant_Name",
            Slot::Unit => "Unit",
            Slot::Issue => "Issue",
            Slot::Severity => "Severity",
            Slot::Location => "Location",
            Slot::Access => "Access",
            Slot::Contact => "Contact",
        }
    }

    /// Follow-up question used when the model's own text cannot be trusted
    pub fn question(&self) -> &'static str {
        match self {
            Slot::TenantName => "Could you tell me your full name?",
            Slot::Unit => "Which unit or apartment number are you in?",
            Slot::Issue => "Can you describe the problem you're seeing?",
            Slot::Severity => {
                "How serious is it right now? Is it getting worse, or stopping you from using anything?"
            }
            Slot::Location => "Where exactly in the unit is the problem?",
            Slot::Access => {
                "How should our technician get in? Can we use the master key, or should we schedule a time with you?"
            }
            Slot::Contact => "What's the best phone number or email to reach you?",
        }
    }
}

/// Slot values known so far; every key is always serialized
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilledSlots {
    pub tenant_name: Option<String>,
    pub unit: Option<String>,
    pub issue: Option<String>,
    pub severity: Option<String>,
    pub location: Option<String>,
    pub access: Option<String>,
    pub contact: Option<String>,
}

impl FilledSlots {
    /// Read slots from the model's `filled_slots` object, ignoring blanks
    pub fn from_value(value: Option<&Value>) -> Self {
        let mut slots = FilledSlots::default();
        if let Some(Value::Object(map)) = value {
            for slot in Slot::ALL {
                if let Some(v) = str_field(map, slot.key()) {
                    slots.set(slot, v);
                }
            }
        }
        slots
    }

    pub fn get(&self, slot: Slot) -> Option<&str> {
        match slot {
            Slot::TenantName => self.tenant_name.as_deref(),
            Slot::Unit => self.unit.as_deref(),
            Slot::Issue => self.issue.as_deref(),
            Slot::Severity => self.severity.as_deref(),
            Slot::Location => self.location.as_deref(),
            Slot::Access => self.access.as_deref(),
            Slot::Contact => self.contact.as_deref(),
        }
    }

    pub fn set(&mut self, slot: Slot, value: String) {
        let field = match slot {
            Slot::TenantName => &mut self.tenant_name,
            Slot::Unit => &mut self.unit,
            Slot::Issue => &mut self.issue,
            Slot::Severity => &mut self.severity,
            Slot::Location => &mut self.location,
            Slot::Access => &mut self.access,
            Slot::Contact => &mut self.contact,
        };
        *field = Some(value);
    }

    pub fn clear(&mut self, slot: Slot) {
        match slot {
            Slot::TenantName => self.tenant_name = None,
            Slot::Unit => self.unit = None,
            Slot::Issue => self.issue = None,
            Slot::Severity => self.severity = None,
            Slot::Location => self.location = None,
            Slot::Access => self.access = None,
            Slot::Contact => self.contact = None,
        }
    }

    /// Slots still empty, in asking order
    pub fn missing(&self) -> Vec<Slot> {
        Slot::ALL
            .into_iter()
            .filter(|slot| self.get(*slot).is_none())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// Human-readable read-back used before a ticket is created
    pub fn summary(&self) -> String {
        Slot::ALL
            .into_iter()
            .filter_map(|slot| self.get(slot).map(|v| format!("- {}: {}", readable(slot), v)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn readable(slot: Slot) -> &'static str {
    match slot {
        Slot::TenantName => "Name",
        Slot::Unit => "Unit",
        Slot::Issue => "Issue",
        Slot::Severity => "Severity",
        Slot::Location => "Location",
        Slot::Access => "Access",
        Slot::Contact => "Contact",
    }
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\+?\d[\d\s().-]{5,}\d").expect("valid phone pattern"))
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email pattern")
    })
}

/// First phone number (at least 7 digits) or email address in `text`
pub fn find_contact(text: &str) -> Option<String> {
    if let Some(m) = email_regex().find(text) {
        return Some(m.as_str().to_string());
    }

    phone_regex()
        .find_iter(text)
        .find(|m| m.as_str().chars().filter(|c| c.is_ascii_digit()).count() >= 7)
        .map(|m| m.as_str().trim().to_string())
}

/// A contact slot is only valid when it carries a reachable number or email;
/// "contact me" or "call me" on its own is not enough.
pub fn is_valid_contact(value: &str) -> bool {
    find_contact(value).is_some()
}

/// Scan the tenant's messages, newest first, for a phone number or email
pub fn contact_from_history(history: &[ChatMessage]) -> Option<String> {
    history
        .iter()
        .rev()
        .filter(|m| m.role == Role::User)
        .find_map(|m| find_contact(&m.content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_slots_have_distinct_keys() {
        let keys: std::collections::HashSet<_> = Slot::ALL.iter().map(|s| s.key()).collect();
        assert_eq!(keys.len(), 7);
    }

    #[test]
    fn test_from_value_skips_blank_entries() {
        let value = json!({
            "tenant_name": "John",
            "unit": "5A",
            "issue": "",
            "severity": null,
            "location": "null",
            "access": "master key"
        });
        let slots = FilledSlots::from_value(Some(&value));

        assert_eq!(slots.tenant_name.as_deref(), Some("John"));
        assert_eq!(slots.access.as_deref(), Some("master key"));
        assert_eq!(
            slots.missing(),
            vec![Slot::Issue, Slot::Severity, Slot::Location, Slot::Contact]
        );
        assert!(!slots.is_complete());
    }

    #[test]
    fn test_serializes_every_key() {
        let json = serde_json::to_value(FilledSlots::default()).unwrap();
        for slot in Slot::ALL {
            assert!(json.as_object().unwrap().contains_key(slot.key()));
        }
    }

    #[test]
    fn test_contact_validation() {
        assert!(is_valid_contact("555-987-6543"));
        assert!(is_valid_contact("call me at (416) 555 0199"));
        assert!(is_valid_contact("sarah@example.com"));
        assert!(!is_valid_contact("contact me"));
        assert!(!is_valid_contact("call me"));
        assert!(!is_valid_contact("unit 12"));
    }

    #[test]
    fn test_contact_from_history_prefers_latest() {
        let history = vec![
            ChatMessage::user("my number is 555-111-2222"),
            ChatMessage::assistant("Thanks, reach you at 555-000-0000?"),
            ChatMessage::user("actually use jo@example.org"),
        ];
        assert_eq!(contact_from_history(&history).as_deref(), Some("jo@example.org"));
        assert_eq!(contact_from_history(&[ChatMessage::user("leak")]), None);
    }

    #[test]
    fn test_summary_lists_known_slots() {
        let mut slots = FilledSlots::default();
        slots.set(Slot::TenantName, "Sarah".to_string());
        slots.set(Slot::Unit, "12B".to_string());
        assert_eq!(slots.summary(), "- Name: Sarah\n- Unit: 12B");

        slots.clear(Slot::Unit);
        assert_eq!(slots.get(Slot::Unit), None);
    }
}
