//! The production [`StorageEngine`] backed by `redb`.

use super::backend::{KvBackend, Location, OpenOptions, StorageEngine};
use super::connection::Database;
use super::error::{DbError, DbErrorKind, DbResult};

/// Opens and repairs `redb` databases.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedbEngine;

impl RedbEngine {
    /// Creates the engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl StorageEngine for RedbEngine {
    fn open(&self, location: &Location, options: OpenOptions) -> DbResult<Box<dyn KvBackend>> {
        match location {
            Location::Path(dir) => Ok(Box::new(Database::open(dir, options)?)),
            Location::Memory => open_memory(),
        }
    }

    fn repair(&self, location: &Location) -> DbResult<()> {
        match location {
            Location::Path(dir) => Database::repair(dir),
            Location::Memory => Err(DbError::new(
                DbErrorKind::Unsupported,
                "in-memory databases cannot be repaired",
            )),
        }
    }

    fn supports_memory(&self) -> bool {
        cfg!(feature = "memory")
    }
}

#[cfg(feature = "memory")]
fn open_memory() -> DbResult<Box<dyn KvBackend>> {
    Ok(Box::new(Database::open_in_memory()?))
}

#[cfg(not(feature = "memory"))]
fn open_memory() -> DbResult<Box<dyn KvBackend>> {
    Err(DbError::new(
        DbErrorKind::Unsupported,
        "compiled without in-memory database support",
    ))
}
