//! # Fix-It
//!
//! Backend for an embeddable tenant-maintenance chat widget and property
//! manager dashboard. Diagnosis and damage comparison are done by a hosted
//! multimodal model; this crate runs the conversation rules, persists the
//! results and serves the REST API.
//!
//! ## Modules
//!
//! - [`triage`]: Slot-filling chat that ends in a confirmed ticket or an emergency
//! - [`analyze`]: Single-photo diagnosis with a repair cost estimate
//! - [`audit`]: Move-in baseline and move-out damage comparison from video
//! - [`ai`]: Model backend trait and the Gemini REST client
//! - [`storage`]: SQLite records (tickets, unit baselines, leads, audit items)
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fixit::ai::{GeminiClient, GeminiConfig};
//! use fixit::storage::ChatMessage;
//! use fixit::triage::TriageAgent;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let model = Arc::new(GeminiClient::new(GeminiConfig {
//!         api_key: std::env::var("GEMINI_API_KEY").ok(),
//!         ..Default::default()
//!     })?);
//!
//!     let agent = TriageAgent::new(model);
//!     let history = vec![ChatMessage::user("The kitchen sink is leaking")];
//!     let outcome = agent.triage(&history).await;
//!
//!     println!("{}: {}", outcome.action.as_str(), outcome.text);
//!     Ok(())
//! }
//! ```

pub mod ai;
pub mod analyze;
pub mod api;
pub mod audit;
pub mod config;
pub mod media;
pub mod storage;
pub mod triage;

// Re-export top-level types for convenience
pub use storage::{
    AuditItem, ChatMessage, Lead, RiskLevel, Store, StorageError, StorageResult, Ticket,
    TicketStatus, UnitBaseline,
};

pub use ai::{GeminiClient, GeminiConfig, ModelBackend, ModelError};

pub use triage::{TriageAction, TriageAgent, TriageOutcome};

pub use analyze::{AnalysisResult, Diagnoser, Diagnosis};

pub use audit::{AuditError, AuditMode, AuditReport, VideoAuditor};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{Config, ConfigError};
