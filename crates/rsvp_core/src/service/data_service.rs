//! Consumer-facing data service over one unit of work.
//!
//! # Responsibility
//! - Offer stage-only and stage-and-commit variants of every mutation.
//! - Log each persistence failure with entity and operation context.
//!
//! # Invariants
//! - Errors are returned exactly as the store produced them; the service only
//!   annotates them in the log.
//! - A missing record is `Ok(None)`, never an error.
//! - Stage-only operations write nothing until [`DataService::save_changes`].

use crate::model::entity::Entity;
use crate::model::response::Response;
use crate::repo::{Repository, UnitOfWork};
use crate::store::{ChangeKind, Filter, ListOptions, StoreResult};
use log::{debug, error};
use std::marker::PhantomData;

/// Where an entity stands in the current unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// No staged change.
    Unchanged,
    Added,
    Modified,
    Deleted,
}

impl From<Option<ChangeKind>> for EntryState {
    fn from(value: Option<ChangeKind>) -> Self {
        match value {
            None => Self::Unchanged,
            Some(ChangeKind::Insert) => Self::Added,
            Some(ChangeKind::Update) => Self::Modified,
            Some(ChangeKind::Delete) => Self::Deleted,
        }
    }
}

/// Data access for entity `T` within one unit of work.
pub struct DataService<'uow, T: Entity> {
    uow: &'uow UnitOfWork,
    _entity: PhantomData<fn() -> T>,
}

impl<'uow, T: Entity> DataService<'uow, T> {
    pub fn new(uow: &'uow UnitOfWork) -> Self {
        Self {
            uow,
            _entity: PhantomData,
        }
    }

    /// Every stored record, including this unit of work's staged edits.
    pub fn get_all(&self) -> StoreResult<Vec<T>> {
        self.run("get_all", |repo| repo.list(&ListOptions::default()))
    }

    pub fn get_by_id(&self, id: &T::Key) -> StoreResult<Option<T>> {
        self.run("get_by_id", |repo| repo.get_by_key(id))
    }

    /// First record matching `filter`.
    pub fn find(&self, filter: Filter) -> StoreResult<Option<T>> {
        self.run("find", |repo| repo.find(&ListOptions::new().filter(filter)))
    }

    /// Records matching `options`.
    pub fn list(&self, options: &ListOptions) -> StoreResult<Vec<T>> {
        self.run("list", |repo| repo.list(options))
    }

    /// Stages an insert.
    pub fn add(&self, entity: T) -> StoreResult<T> {
        self.run("add", |repo| Ok(repo.add(entity)))
    }

    pub fn add_range(&self, entities: Vec<T>) -> StoreResult<Vec<T>> {
        self.run("add_range", |repo| Ok(repo.add_range(entities)))
    }

    /// Stages an insert and commits everything staged so far.
    pub fn add_and_save(&self, entity: T) -> StoreResult<T> {
        self.run("add_and_save", |repo| {
            let added = repo.add(entity);
            self.uow.save_changes()?;
            Ok(added)
        })
    }

    /// Stages a full replacement; the returned copy carries the new `updated_at`.
    pub fn update(&self, entity: T) -> StoreResult<T> {
        self.run("update", |repo| Ok(repo.update(entity)))
    }

    pub fn update_range(&self, entities: Vec<T>) -> StoreResult<Vec<T>> {
        self.run("update_range", |repo| Ok(repo.update_range(entities)))
    }

    pub fn update_and_save(&self, entity: T) -> StoreResult<T> {
        self.run("update_and_save", |repo| {
            let updated = repo.update(entity);
            self.uow.save_changes()?;
            Ok(updated)
        })
    }

    pub fn update_range_and_save(&self, entities: Vec<T>) -> StoreResult<Vec<T>> {
        self.run("update_range_and_save", |repo| {
            let updated = repo.update_range(entities);
            self.uow.save_changes()?;
            Ok(updated)
        })
    }

    /// Stages a removal.
    pub fn delete(&self, entity: &T) -> StoreResult<()> {
        self.run("delete", |repo| {
            repo.remove(entity);
            Ok(())
        })
    }

    pub fn delete_range(&self, entities: &[T]) -> StoreResult<()> {
        self.run("delete_range", |repo| {
            repo.remove_range(entities);
            Ok(())
        })
    }

    /// Stages a removal, commits, and hands the removed record back.
    pub fn delete_and_save(&self, entity: T) -> StoreResult<T> {
        self.run("delete_and_save", |repo| {
            repo.remove(&entity);
            self.uow.save_changes()?;
            Ok(entity)
        })
    }

    pub fn delete_range_and_save(&self, entities: Vec<T>) -> StoreResult<Vec<T>> {
        self.run("delete_range_and_save", |repo| {
            repo.remove_range(&entities);
            self.uow.save_changes()?;
            Ok(entities)
        })
    }

    /// Commits whatever is staged; returns the affected row count.
    pub fn save_changes(&self) -> StoreResult<usize> {
        self.run("save_changes", |_| self.uow.save_changes())
    }

    pub fn entry_state(&self, entity: &T) -> EntryState {
        self.uow.staged_kind::<T>(&entity.key()).into()
    }

    /// Drops any staged change for `entity`; returns whether one existed.
    pub fn discard_changes(&self, entity: &T) -> bool {
        self.uow.discard::<T>(&entity.key())
    }

    fn run<R>(
        &self,
        operation: &'static str,
        op: impl FnOnce(&Repository<T>) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let repo = self.uow.repository::<T>();
        match op(&repo) {
            Ok(value) => {
                debug!(
                    "event=data_service_op module=service status=ok entity={} op={operation}",
                    T::NAME
                );
                Ok(value)
            }
            Err(err) => {
                error!(
                    "event=data_service_op module=service status=error entity={} op={operation} error={err}",
                    T::NAME
                );
                Err(err)
            }
        }
    }
}

impl DataService<'_, Response> {
    /// Companion response linked through `plus_one_id`, if any.
    pub fn plus_one_of(&self, response: &Response) -> StoreResult<Option<Response>> {
        match response.plus_one_id {
            Some(companion) => self.run("plus_one_of", |repo| repo.get_by_key(&companion)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DataService, EntryState};
    use crate::model::response::Response;
    use crate::repo::UnitOfWork;

    #[test]
    fn entry_state_tracks_staged_changes() {
        let uow = UnitOfWork::open_in_memory().expect("in-memory unit of work");
        let service = DataService::<Response>::new(&uow);

        let response = Response::new("Ada", "Lovelace", "ada@example.com", true);
        assert_eq!(service.entry_state(&response), EntryState::Unchanged);

        let added = service.add(response).expect("stage add");
        assert_eq!(service.entry_state(&added), EntryState::Added);

        service.save_changes().expect("commit");
        assert_eq!(service.entry_state(&added), EntryState::Unchanged);

        let updated = service.update(added).expect("stage update");
        assert_eq!(service.entry_state(&updated), EntryState::Modified);

        service.delete(&updated).expect("stage delete");
        assert_eq!(service.entry_state(&updated), EntryState::Deleted);

        assert!(service.discard_changes(&updated));
        assert_eq!(service.entry_state(&updated), EntryState::Unchanged);
    }

    #[test]
    fn add_then_delete_before_commit_stages_nothing() {
        let uow = UnitOfWork::open_in_memory().expect("in-memory unit of work");
        let service = DataService::<Response>::new(&uow);

        let added = service
            .add(Response::new("Ada", "Lovelace", "", true))
            .expect("stage add");
        service.delete(&added).expect("stage delete");

        assert_eq!(uow.pending_changes(), 0);
        assert_eq!(service.save_changes().expect("commit"), 0);
        assert!(service.get_by_id(&added.id).expect("lookup").is_none());
    }

    #[test]
    fn plus_one_resolves_companion() {
        let uow = UnitOfWork::open_in_memory().expect("in-memory unit of work");
        let service = DataService::<Response>::new(&uow);

        let companion = service
            .add_and_save(Response::new("Charles", "Babbage", "", true))
            .expect("save companion");
        let guest = service
            .add_and_save(Response::new("Ada", "Lovelace", "", true).with_plus_one(companion.id))
            .expect("save guest");

        let resolved = service.plus_one_of(&guest).expect("lookup companion");
        assert_eq!(resolved, Some(companion.clone()));
        assert_eq!(service.plus_one_of(&companion).expect("no companion"), None);
    }
}
