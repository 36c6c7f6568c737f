//! Generic entity store over one session.
//!
//! # Invariants
//! - Mutations are staged on the session; nothing is written before commit.
//! - Absence is reported as `None`, never as an error.
//! - Tracked reads see this session's staged changes to the rows they return;
//!   untracked reads see committed state only.

use super::error::StoreResult;
use super::query::{select_sql, ListOptions};
use super::session::{ChangeKind, PendingChange, Session};
use crate::model::entity::{touch, Entity};
use rusqlite::{params_from_iter, Connection};
use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;

/// Typed access to the rows of entity `T` within one session.
pub struct EntityStore<T: Entity> {
    session: Arc<Session>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> EntityStore<T> {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            _entity: PhantomData,
        }
    }

    /// First row matching `options`, or `None`.
    pub fn find(&self, options: &ListOptions) -> StoreResult<Option<T>> {
        if options.no_tracking {
            return self
                .session
                .read(|conn, _| query_rows::<T>(conn, options, Some(1)))
                .map(|rows| rows.into_iter().next());
        }
        // A staged removal can hide the first committed row, so the whole
        // candidate list is overlaid before picking.
        Ok(self.list(options)?.into_iter().next())
    }

    /// Every row matching `options`, in requested or store order.
    pub fn list(&self, options: &ListOptions) -> StoreResult<Vec<T>> {
        self.session.read(|conn, pending| {
            let rows = query_rows::<T>(conn, options, None)?;
            if options.no_tracking {
                return Ok(rows);
            }
            Ok(rows
                .into_iter()
                .filter_map(|row| overlay(row, pending))
                .collect())
        })
    }

    /// Row with primary key `key`, including rows staged for insert.
    pub fn get_by_key(&self, key: &T::Key) -> StoreResult<Option<T>> {
        self.session.read(|conn, pending| {
            let key_value = T::key_value(key);
            if let Some(staged) = pending
                .iter()
                .find(|change| change_targets::<T>(change, &key_value))
            {
                return Ok(match staged.kind() {
                    ChangeKind::Delete => None,
                    ChangeKind::Insert | ChangeKind::Update => staged.snapshot::<T>(),
                });
            }

            let sql = format!(
                "SELECT {} FROM {} WHERE {} = ?1;",
                T::COLUMNS.join(", "),
                T::TABLE,
                T::KEY_COLUMN
            );
            let mut stmt = conn.prepare_cached(&sql)?;
            let mut rows = stmt.query([&key_value])?;
            match rows.next()? {
                Some(row) => Ok(Some(T::from_row(row)?)),
                None => Ok(None),
            }
        })
    }

    pub fn add(&self, entity: T) -> T {
        self.session.stage(PendingChange::insert(&entity));
        entity
    }

    pub fn add_range(&self, entities: Vec<T>) -> Vec<T> {
        entities.into_iter().map(|entity| self.add(entity)).collect()
    }

    /// Stages a full-record replacement and stamps `updated_at`.
    pub fn update(&self, mut entity: T) -> T {
        touch(&mut entity);
        self.session.stage(PendingChange::update(&entity));
        entity
    }

    pub fn update_range(&self, entities: Vec<T>) -> Vec<T> {
        entities
            .into_iter()
            .map(|entity| self.update(entity))
            .collect()
    }

    /// Stages removal of the row with `key` when it exists.
    ///
    /// Returns whether a removal was staged.
    pub fn remove_by_key(&self, key: &T::Key) -> StoreResult<bool> {
        if self.get_by_key(key)?.is_none() {
            return Ok(false);
        }
        self.session.stage(PendingChange::delete::<T>(key));
        Ok(true)
    }

    pub fn remove(&self, entity: &T) {
        self.session.stage(PendingChange::delete::<T>(&entity.key()));
    }

    pub fn remove_range(&self, entities: &[T]) {
        for entity in entities {
            self.remove(entity);
        }
    }
}

fn change_targets<T: Entity>(change: &PendingChange, key: &rusqlite::types::Value) -> bool {
    change.is_for(TypeId::of::<T>(), key)
}

fn overlay<T: Entity>(row: T, pending: &[PendingChange]) -> Option<T> {
    let key = T::key_value(&row.key());
    match pending.iter().find(|change| change_targets::<T>(change, &key)) {
        None => Some(row),
        Some(change) => match change.kind() {
            ChangeKind::Delete => None,
            ChangeKind::Insert | ChangeKind::Update => change.snapshot::<T>().or(Some(row)),
        },
    }
}

fn query_rows<T: Entity>(
    conn: &Connection,
    options: &ListOptions,
    limit: Option<u32>,
) -> StoreResult<Vec<T>> {
    let (sql, params) = select_sql::<T>(options, limit);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(params))?;
    let mut entities = Vec::new();
    while let Some(row) = rows.next()? {
        entities.push(T::from_row(row)?);
    }
    Ok(entities)
}
