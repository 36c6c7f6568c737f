//! Consumer-facing services.
//!
//! # Responsibility
//! - Wrap repository calls into stage-only and stage-and-commit operations.
//! - Keep callers decoupled from session and SQL details.

pub mod data_service;

pub use data_service::{DataService, EntryState};
