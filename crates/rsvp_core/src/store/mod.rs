//! Entity store: the only layer that issues SQL against entity tables.
//!
//! # Responsibility
//! - Translate typed list/find/get requests into parameterized SQL.
//! - Stage inserts, replacements and removals until the session commits.
//!
//! # Invariants
//! - Reads never raise for missing rows.
//! - Staged changes become durable only through [`Session::commit`].

mod adapter;
mod cancel;
mod error;
pub mod query;
mod session;

pub use adapter::EntityStore;
pub use cancel::CancellationToken;
pub use error::{StoreError, StoreResult};
pub use query::{Direction, Filter, Include, ListOptions, OrderBy};
pub use session::{ChangeKind, Session};
