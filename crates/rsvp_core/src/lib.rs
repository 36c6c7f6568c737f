//! Core of the RSVP response store.
//!
//! Persists guest responses through a unit-of-work repository layer over
//! SQLite and finds a response by a possibly misspelled guest name.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod store;

pub use config::{ConfigError, CoreConfig};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::entity::{Entity, EpochMillis};
pub use model::response::{Response, ResponseId};
pub use repo::{Repository, UnitOfWork};
pub use search::{FuzzyMatchService, MatchCandidate, MINIMUM_SCORE, SEARCH_LIMIT};
pub use service::{DataService, EntryState};
pub use store::{
    CancellationToken, Direction, Filter, Include, ListOptions, StoreError, StoreResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
