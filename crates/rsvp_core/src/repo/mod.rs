//! Repository and unit-of-work layer.
//!
//! # Responsibility
//! - Bind generic store access to one entity type per repository.
//! - Scope repositories and staged changes to one transaction.
//!
//! # Invariants
//! - Repositories are only obtained through a `UnitOfWork`.
//! - All repositories of one unit of work share its session.

mod repository;
mod unit_of_work;

pub use repository::Repository;
pub use unit_of_work::UnitOfWork;
