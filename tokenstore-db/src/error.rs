//! Error types for the key-value backend.

use std::fmt;

/// Broad classification of a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// The database could not be opened or created.
    Open,
    /// The on-disk state is inconsistent and was not (or could not be) repaired.
    Corrupted,
    /// A filesystem operation failed.
    Io,
    /// A read or write transaction failed.
    Transaction,
    /// The requested location or feature is not available in this build.
    Unsupported,
}

impl fmt::Display for DbErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Corrupted => "corrupted",
            Self::Io => "io",
            Self::Transaction => "transaction",
            Self::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// Error returned by backend operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbError {
    /// Failure classification.
    pub kind: DbErrorKind,
    /// Human-readable error message from the engine.
    pub message: String,
}

impl DbError {
    /// Creates a new backend error.
    pub fn new(kind: DbErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns true when the error reports on-disk inconsistency.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        self.kind == DbErrorKind::Corrupted
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "backend {} error: {}", self.kind, self.message)
    }
}

impl std::error::Error for DbError {}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        Self::new(DbErrorKind::Io, err.to_string())
    }
}

impl From<redb::DatabaseError> for DbError {
    fn from(err: redb::DatabaseError) -> Self {
        let kind = match &err {
            redb::DatabaseError::RepairAborted
            | redb::DatabaseError::Storage(redb::StorageError::Corrupted(_)) => {
                DbErrorKind::Corrupted
            }
            _ => DbErrorKind::Open,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<redb::StorageError> for DbError {
    fn from(err: redb::StorageError) -> Self {
        let kind = match &err {
            redb::StorageError::Corrupted(_) => DbErrorKind::Corrupted,
            redb::StorageError::Io(_) => DbErrorKind::Io,
            _ => DbErrorKind::Transaction,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<redb::TransactionError> for DbError {
    fn from(err: redb::TransactionError) -> Self {
        Self::new(DbErrorKind::Transaction, err.to_string())
    }
}

impl From<redb::TableError> for DbError {
    fn from(err: redb::TableError) -> Self {
        Self::new(DbErrorKind::Transaction, err.to_string())
    }
}

impl From<redb::CommitError> for DbError {
    fn from(err: redb::CommitError) -> Self {
        Self::new(DbErrorKind::Transaction, err.to_string())
    }
}

/// Result type for backend operations.
pub type DbResult<T> = Result<T, DbError>;
