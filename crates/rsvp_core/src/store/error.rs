use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence failure raised by the store, repository and unit-of-work layers.
///
/// A missing record is never one of these: lookups report absence as `None`.
#[derive(Debug)]
pub enum StoreError {
    /// The database rejected a statement or could not be reached.
    Db(DbError),
    /// A staged update or removal matched no stored row at commit time.
    Conflict { entity: &'static str, key: String },
    /// Commit observed its cancellation signal before applying anything.
    Cancelled,
    /// A stored row could not be decoded into its entity.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Conflict { entity, key } => write!(
                f,
                "{entity} {key} was changed or removed since it was loaded"
            ),
            Self::Cancelled => write!(f, "commit cancelled before any change was applied"),
            Self::InvalidData(message) => write!(f, "invalid stored data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Conflict { .. } | Self::Cancelled | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
