//! Name lookup over stored responses.
//!
//! # Responsibility
//! - Score names with edit-based similarity measures.
//! - Pick the single best response for a possibly misspelled name.
//!
//! # Invariants
//! - Search is read-only; it never touches the store.

pub mod fuzzy_match;
pub mod similarity;

pub use fuzzy_match::{FuzzyMatchService, MatchCandidate, MINIMUM_SCORE, SEARCH_LIMIT};
pub use similarity::Score;
