//! One transactional session: a connection plus its staged changes.
//!
//! # Responsibility
//! - Own the connection behind one unit of work.
//! - Record staged inserts, replacements and removals across entity types.
//! - Apply every staged change in one immediate transaction on commit.
//!
//! # Invariants
//! - Commit applies all staged changes or none of them.
//! - A failed or cancelled commit leaves the staged set untouched.
//! - At most one staged change exists per (entity type, key).
//! - Any access after `dispose` panics.

use super::cancel::CancellationToken;
use super::error::{StoreError, StoreResult};
use crate::model::entity::Entity;
use log::{debug, error, info};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, TransactionBehavior};
use std::any::{Any, TypeId};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

const DISPOSED_MESSAGE: &str = "unit of work used after dispose";

/// Kind of change staged for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

pub(crate) struct PendingChange {
    entity_type: TypeId,
    entity_name: &'static str,
    table: &'static str,
    key_column: &'static str,
    columns: &'static [&'static str],
    key: Value,
    key_display: String,
    kind: ChangeKind,
    row: Vec<Value>,
    snapshot: Option<Box<dyn Any + Send + Sync>>,
}

impl PendingChange {
    pub(crate) fn insert<T: Entity>(entity: &T) -> Self {
        Self::with_snapshot(ChangeKind::Insert, entity)
    }

    pub(crate) fn update<T: Entity>(entity: &T) -> Self {
        Self::with_snapshot(ChangeKind::Update, entity)
    }

    pub(crate) fn delete<T: Entity>(key: &T::Key) -> Self {
        Self {
            entity_type: TypeId::of::<T>(),
            entity_name: T::NAME,
            table: T::TABLE,
            key_column: T::KEY_COLUMN,
            columns: T::COLUMNS,
            key: T::key_value(key),
            key_display: key.to_string(),
            kind: ChangeKind::Delete,
            row: Vec::new(),
            snapshot: None,
        }
    }

    fn with_snapshot<T: Entity>(kind: ChangeKind, entity: &T) -> Self {
        let key = entity.key();
        Self {
            entity_type: TypeId::of::<T>(),
            entity_name: T::NAME,
            table: T::TABLE,
            key_column: T::KEY_COLUMN,
            columns: T::COLUMNS,
            key: T::key_value(&key),
            key_display: key.to_string(),
            kind,
            row: entity.to_row(),
            snapshot: Some(Box::new(entity.clone())),
        }
    }

    pub(crate) fn kind(&self) -> ChangeKind {
        self.kind
    }

    /// Staged record value, if this change carries one of type `T`.
    pub(crate) fn snapshot<T: Entity>(&self) -> Option<T> {
        self.snapshot
            .as_ref()
            .and_then(|snapshot| snapshot.downcast_ref::<T>())
            .cloned()
    }

    pub(crate) fn is_for(&self, entity_type: TypeId, key: &Value) -> bool {
        self.entity_type == entity_type && &self.key == key
    }

    /// Folds a newer change for the same record into this one.
    ///
    /// Returns `None` when the two cancel out (insert then delete).
    fn merge(self, newer: PendingChange) -> Option<PendingChange> {
        match (self.kind, newer.kind) {
            (ChangeKind::Insert, ChangeKind::Delete) => None,
            (ChangeKind::Insert, _) => Some(PendingChange {
                kind: ChangeKind::Insert,
                ..newer
            }),
            (ChangeKind::Delete, ChangeKind::Insert) => Some(PendingChange {
                kind: ChangeKind::Update,
                ..newer
            }),
            _ => Some(newer),
        }
    }

    fn apply(&self, conn: &Connection) -> StoreResult<usize> {
        let changed = match self.kind {
            ChangeKind::Insert => {
                let placeholders = (1..=self.columns.len())
                    .map(|index| format!("?{index}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!(
                    "INSERT INTO {} ({}) VALUES ({placeholders});",
                    self.table,
                    self.columns.join(", ")
                );
                conn.prepare_cached(&sql)?
                    .execute(params_from_iter(self.row.iter()))?
            }
            ChangeKind::Update => {
                let assignments = self
                    .columns
                    .iter()
                    .enumerate()
                    .skip(1)
                    .map(|(index, column)| format!("{column} = ?{}", index + 1))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!(
                    "UPDATE {} SET {assignments} WHERE {} = ?1;",
                    self.table, self.key_column
                );
                conn.prepare_cached(&sql)?
                    .execute(params_from_iter(self.row.iter()))?
            }
            ChangeKind::Delete => {
                let sql = format!("DELETE FROM {} WHERE {} = ?1;", self.table, self.key_column);
                conn.prepare_cached(&sql)?.execute([&self.key])?
            }
        };

        if changed == 0 && self.kind != ChangeKind::Insert {
            return Err(StoreError::Conflict {
                entity: self.entity_name,
                key: self.key_display.clone(),
            });
        }

        Ok(changed)
    }
}

struct SessionState {
    conn: Option<Connection>,
    pending: Vec<PendingChange>,
}

/// Connection and staged-change set shared by every repository of one unit
/// of work.
///
/// All access is serialized through one lock; the connection never runs two
/// commands at once.
pub struct Session {
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(conn: Connection) -> Self {
        Self {
            state: Mutex::new(SessionState {
                conn: Some(conn),
                pending: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the state of a session that has not been disposed.
    fn lock_live(&self) -> MutexGuard<'_, SessionState> {
        let state = self.lock();
        assert!(state.conn.is_some(), "{DISPOSED_MESSAGE}");
        state
    }

    /// Runs `read` against the connection and the currently staged changes.
    ///
    /// # Panics
    /// Panics when the session has been disposed.
    pub(crate) fn read<R>(
        &self,
        read: impl FnOnce(&Connection, &[PendingChange]) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let state = self.lock();
        let conn = state.conn.as_ref().expect(DISPOSED_MESSAGE);
        read(conn, &state.pending)
    }

    /// Records a change, folding it into any change already staged for the
    /// same record.
    ///
    /// # Panics
    /// Panics when the session has been disposed.
    pub(crate) fn stage(&self, change: PendingChange) {
        let mut state = self.lock_live();

        let existing = state
            .pending
            .iter()
            .position(|staged| staged.is_for(change.entity_type, &change.key));

        match existing {
            Some(index) => {
                let staged = state.pending.remove(index);
                if let Some(merged) = staged.merge(change) {
                    state.pending.insert(index, merged);
                }
            }
            None => state.pending.push(change),
        }
    }

    /// Kind of change staged for `key` of entity type `T`, if any.
    ///
    /// # Panics
    /// Panics when the session has been disposed.
    pub fn staged_kind<T: Entity>(&self, key: &T::Key) -> Option<ChangeKind> {
        let state = self.lock_live();
        let key = T::key_value(key);
        state
            .pending
            .iter()
            .find(|staged| staged.is_for(TypeId::of::<T>(), &key))
            .map(PendingChange::kind)
    }

    /// Drops the staged change for `key` of entity type `T`.
    ///
    /// Returns whether a change was discarded.
    ///
    /// # Panics
    /// Panics when the session has been disposed.
    pub fn discard<T: Entity>(&self, key: &T::Key) -> bool {
        let mut state = self.lock_live();
        let key = T::key_value(key);
        let before = state.pending.len();
        state
            .pending
            .retain(|staged| !staged.is_for(TypeId::of::<T>(), &key));
        state.pending.len() != before
    }

    /// # Panics
    /// Panics when the session has been disposed.
    pub fn pending_len(&self) -> usize {
        self.lock_live().pending.len()
    }

    /// Applies every staged change in one immediate transaction.
    ///
    /// Returns the number of affected rows. With nothing staged this is a
    /// no-op returning zero.
    ///
    /// # Errors
    /// - [`StoreError::Cancelled`] when `cancel` fires before the transaction
    ///   commits; nothing is applied.
    /// - [`StoreError::Conflict`] when a staged update or removal matches no row.
    /// - [`StoreError::Db`] for any database failure.
    ///
    /// # Panics
    /// Panics when the session has been disposed.
    pub fn commit(&self, cancel: &CancellationToken) -> StoreResult<usize> {
        let started_at = Instant::now();
        let mut guard = self.lock();
        let state = &mut *guard;
        let conn = state.conn.as_mut().expect(DISPOSED_MESSAGE);

        if cancel.is_cancelled() {
            debug!(
                "event=session_commit module=store status=cancelled pending={}",
                state.pending.len()
            );
            return Err(StoreError::Cancelled);
        }
        if state.pending.is_empty() {
            return Ok(0);
        }

        let result = apply_all(conn, &state.pending, cancel);
        match result {
            Ok(affected) => {
                info!(
                    "event=session_commit module=store status=ok changes={} affected={} duration_ms={}",
                    state.pending.len(),
                    affected,
                    started_at.elapsed().as_millis()
                );
                state.pending.clear();
                Ok(affected)
            }
            Err(err) => {
                error!(
                    "event=session_commit module=store status=error changes={} duration_ms={} error={}",
                    state.pending.len(),
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Closes the connection and discards staged changes.
    ///
    /// Returns `true` only for the call that actually released the session.
    pub fn dispose(&self) -> bool {
        let mut state = self.lock();
        let Some(conn) = state.conn.take() else {
            return false;
        };
        let discarded = state.pending.len();
        state.pending.clear();
        drop(state);

        if let Err((_, err)) = conn.close() {
            error!("event=session_dispose module=store status=error error={err}");
        }
        debug!("event=session_dispose module=store status=ok discarded={discarded}");
        true
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().conn.is_none()
    }
}

fn apply_all(
    conn: &mut Connection,
    pending: &[PendingChange],
    cancel: &CancellationToken,
) -> StoreResult<usize> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut affected = 0;
    for change in pending {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        affected += change.apply(&tx)?;
    }
    if cancel.is_cancelled() {
        return Err(StoreError::Cancelled);
    }
    tx.commit()?;
    Ok(affected)
}
