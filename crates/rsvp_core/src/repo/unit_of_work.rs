//! Unit of work: one session, one repository per entity type, atomic commit.
//!
//! # Responsibility
//! - Scope one logical transaction over a single connection.
//! - Hand out a stable repository instance per entity type.
//! - Commit every staged change across repositories at once.
//!
//! # Invariants
//! - At most one `Repository<T>` exists per unit of work and entity type.
//! - Commit failures are returned unchanged; staged changes survive them.
//! - Dispose is idempotent and also runs on drop.
//! - Using a disposed unit of work panics.

use super::repository::Repository;
use crate::config::CoreConfig;
use crate::db::{open_db_in_memory, open_db_with_timeout};
use crate::model::entity::Entity;
use crate::store::{CancellationToken, ChangeKind, Session, StoreResult};
use log::debug;
use rusqlite::Connection;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

type RepositoryCache = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Transaction scope shared by every repository it hands out.
///
/// Callers normally create one per inbound request and let it drop (or call
/// [`UnitOfWork::dispose`]) when the request ends.
pub struct UnitOfWork {
    session: Arc<Session>,
    repositories: Mutex<RepositoryCache>,
}

impl UnitOfWork {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            session: Arc::new(Session::new(conn)),
            repositories: Mutex::new(HashMap::new()),
        }
    }

    /// Opens the configured database file in a fresh unit of work.
    pub fn open(config: &CoreConfig) -> StoreResult<Self> {
        let conn = open_db_with_timeout(&config.database_path, config.busy_timeout())?;
        Ok(Self::new(conn))
    }

    /// Opens a private in-memory database in a fresh unit of work.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Returns this unit of work's repository for `T`, creating it on first use.
    ///
    /// Concurrent first calls race on one lock; every caller receives the same
    /// instance.
    ///
    /// # Panics
    /// Panics when the unit of work has been disposed.
    pub fn repository<T: Entity>(&self) -> Arc<Repository<T>> {
        assert!(!self.session.is_disposed(), "unit of work used after dispose");

        let mut cache = self
            .repositories
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = cache.entry(TypeId::of::<T>()).or_insert_with(|| {
            debug!("event=repository_create module=repo status=ok entity={}", T::NAME);
            Arc::new(Repository::<T>::new(Arc::clone(&self.session)))
        });

        match Arc::clone(entry).downcast::<Repository<T>>() {
            Ok(repository) => repository,
            Err(_) => unreachable!("repository cache slot for {} holds another type", T::NAME),
        }
    }

    /// Applies every staged change atomically and returns the affected row count.
    ///
    /// # Panics
    /// Panics when the unit of work has been disposed.
    pub fn commit(&self, cancel: &CancellationToken) -> StoreResult<usize> {
        self.session.commit(cancel)
    }

    /// [`commit`](Self::commit) without a cancellation signal.
    pub fn save_changes(&self) -> StoreResult<usize> {
        self.commit(&CancellationToken::new())
    }

    /// Number of records with a staged change.
    pub fn pending_changes(&self) -> usize {
        self.session.pending_len()
    }

    pub(crate) fn staged_kind<T: Entity>(&self, key: &T::Key) -> Option<ChangeKind> {
        self.session.staged_kind::<T>(key)
    }

    pub(crate) fn discard<T: Entity>(&self, key: &T::Key) -> bool {
        self.session.discard::<T>(key)
    }

    /// Releases the connection and discards anything still staged.
    pub fn dispose(&self) {
        if self.session.dispose() {
            self.repositories
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
            debug!("event=uow_dispose module=repo status=ok");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.session.is_disposed()
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        self.dispose();
    }
}
