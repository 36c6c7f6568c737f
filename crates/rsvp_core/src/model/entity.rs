//! Storage contract shared by every persisted record type.
//!
//! # Invariants
//! - `key()` never changes over an entity's lifetime.
//! - `updated_at()`, when set, is not earlier than `created_at()`.
//! - `COLUMNS[0] == KEY_COLUMN`, and `to_row()` yields values in `COLUMNS` order.

use crate::store::StoreResult;
use rusqlite::types::Value;
use rusqlite::Row;
use std::fmt::Display;
use std::time::{SystemTime, UNIX_EPOCH};

/// Unix epoch milliseconds, the timestamp unit used across the store.
pub type EpochMillis = i64;

/// A uniquely identified record type that the generic store can persist.
///
/// Implementors describe their table layout statically; the store never
/// discovers columns at runtime.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Identifier type; assigned once at creation.
    type Key: Clone + PartialEq + Display + Send + Sync + 'static;

    /// Human-readable type name used in logs and errors.
    const NAME: &'static str;
    const TABLE: &'static str;
    const KEY_COLUMN: &'static str;
    /// Every persisted column, key first.
    const COLUMNS: &'static [&'static str];

    fn key(&self) -> Self::Key;

    /// Converts a key into the value bound for `KEY_COLUMN`.
    fn key_value(key: &Self::Key) -> Value;

    fn created_at(&self) -> EpochMillis;

    fn updated_at(&self) -> Option<EpochMillis>;

    fn set_updated_at(&mut self, at: EpochMillis);

    /// Full-record values in `COLUMNS` order.
    fn to_row(&self) -> Vec<Value>;

    /// Decodes one row selected with `COLUMNS`.
    fn from_row(row: &Row<'_>) -> StoreResult<Self>;
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> EpochMillis {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| EpochMillis::try_from(elapsed.as_millis()).unwrap_or(EpochMillis::MAX))
        .unwrap_or_default()
}

/// Stamps `updated_at` for a staged modification.
///
/// The stamp is strictly later than `created_at` even when both fall inside
/// the same millisecond.
pub fn touch<T: Entity>(entity: &mut T) {
    let floor = entity.created_at().saturating_add(1);
    entity.set_updated_at(now_epoch_ms().max(floor));
}
