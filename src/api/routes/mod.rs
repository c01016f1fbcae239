//! API Routes
//!
//! Route handlers organized by functionality.

pub mod admin;
pub mod analyze;
pub mod audit;
pub mod chat;
pub mod health;
pub mod leads;
