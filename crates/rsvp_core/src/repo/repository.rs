//! Typed repository façade for one entity type.
//!
//! # Invariants
//! - A `Repository<T>` only ever reads or stages rows of `T`.
//! - It holds nothing besides its store; all state lives in the session.

use crate::model::entity::Entity;
use crate::store::{EntityStore, ListOptions, Session, StoreResult};
use std::sync::Arc;

/// CRUD and query access to entity `T` inside one unit of work.
///
/// Obtain instances through
/// [`UnitOfWork::repository`](crate::repo::UnitOfWork::repository).
pub struct Repository<T: Entity> {
    store: EntityStore<T>,
}

impl<T: Entity> Repository<T> {
    pub(crate) fn new(session: Arc<Session>) -> Self {
        Self {
            store: EntityStore::new(session),
        }
    }

    pub fn find(&self, options: &ListOptions) -> StoreResult<Option<T>> {
        self.store.find(options)
    }

    pub fn list(&self, options: &ListOptions) -> StoreResult<Vec<T>> {
        self.store.list(options)
    }

    pub fn get_by_key(&self, key: &T::Key) -> StoreResult<Option<T>> {
        self.store.get_by_key(key)
    }

    pub fn add(&self, entity: T) -> T {
        self.store.add(entity)
    }

    pub fn add_range(&self, entities: Vec<T>) -> Vec<T> {
        self.store.add_range(entities)
    }

    pub fn update(&self, entity: T) -> T {
        self.store.update(entity)
    }

    pub fn update_range(&self, entities: Vec<T>) -> Vec<T> {
        self.store.update_range(entities)
    }

    pub fn remove_by_key(&self, key: &T::Key) -> StoreResult<bool> {
        self.store.remove_by_key(key)
    }

    pub fn remove(&self, entity: &T) {
        self.store.remove(entity)
    }

    pub fn remove_range(&self, entities: &[T]) {
        self.store.remove_range(entities)
    }
}
