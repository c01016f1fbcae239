//! Maintenance Triage
//!
//! Multi-turn slot-filling chat. Each turn the model proposes the next
//! action; the agent keeps it honest.
//!
//! ## State machine
//!
//! ```text
//!   QUESTION ──(all 7 slots)──► CONFIRM ──(tenant says yes)──► CREATE_TICKET
//!      │                          │
//!      └──────(danger words)──────┴──────────► EMERGENCY
//! ```

mod agent;
mod prompt;
mod slots;

pub use agent::{
    interpret_reply, is_emergency, EscalationMode, TicketData, TriageAction, TriageAgent,
    TriageOutcome,
};
pub use prompt::{build_triage_prompt, conversation_context, IMAGE_MARKER, TRIAGE_SYSTEM_PROMPT};
pub use slots::{find_contact, is_valid_contact, FilledSlots, Slot};
