//! Persisted record types.
//!
//! # Invariants
//! - Every entity carries a stable key and a creation timestamp.
//! - Deletion is physical; there are no tombstones.

pub mod entity;
pub mod response;
