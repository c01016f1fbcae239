//! Fix-It Storage
//!
//! SQLite persistence for the maintenance backend:
//!
//! - **types**: Record types (Ticket, UnitBaseline, Lead, AuditItem)
//! - **store**: The `Store` with schema setup and CRUD operations
//! - **error**: Error types
//!
//! # Example
//!
//! ```rust,no_run
//! use fixit::storage::{NewTicket, Store};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Store::from_database_url("sqlite://./fixit.db")?;
//!     let ticket = store.create_ticket(&NewTicket::widget_session())?;
//!     println!("Opened ticket {}", ticket.id);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod store;
pub mod types;

pub use error::{StorageError, StorageResult};
pub use store::Store;
pub use types::{
    AuditItem, ChatMessage, Lead, NewAuditItem, NewLead, NewTicket, Priority, RiskLevel, Role,
    Ticket, TicketDetails, TicketStatus, UnitBaseline,
};
