//! Safe wrapper around a `redb` database holding a single byte-keyed table.
//!
//! # Open flow
//!
//! 1. **Open** -- the database file `<dir>/store.redb` is opened (or created).
//!    In strict mode `redb`'s automatic crash recovery is aborted, so an
//!    unclean file surfaces as a [`DbErrorKind::Corrupted`] error instead of
//!    being silently rewritten.
//!
//! 2. **Verify** -- in strict mode a full integrity check runs immediately.
//!    Any inconsistency it finds fails the open.
//!
//! 3. **Prepare** -- the object table is created if it does not exist yet, so
//!    later read transactions never observe a missing table.
//!
//! Repair is the same sequence with recovery allowed and the integrity check
//! permitted to rewrite what it can.

use std::fs;
use std::path::{Path, PathBuf};

use redb::{Builder, Durability, ReadableTable, TableDefinition};

use super::backend::{KvBackend, OpenOptions};
use super::error::{DbError, DbErrorKind, DbResult};

/// File name of the `redb` database inside a database directory.
pub const DATABASE_FILENAME: &str = "store.redb";

const OBJECTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("objects");

/// An open database.
///
/// `redb` serializes writers internally, so the handle is `Send + Sync`;
/// callers still need their own exclusion for read-modify-write sequences.
pub struct Database {
    db: redb::Database,
    label: String,
}

impl Database {
    /// Opens (or creates) the database stored in directory `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be opened, if strict
    /// checking detects an inconsistency, or if the table cannot be created.
    pub fn open(dir: &Path, options: OpenOptions) -> DbResult<Self> {
        let file = database_file(dir);
        if options.create_if_missing {
            fs::create_dir_all(dir)?;
        }
        let mut builder = Builder::new();
        if options.strict {
            builder.set_repair_callback(|session| session.abort());
        }
        let mut db = if options.create_if_missing {
            builder.create(&file)?
        } else {
            builder.open(&file)?
        };
        if options.strict && !db.check_integrity()? {
            return Err(DbError::new(
                DbErrorKind::Corrupted,
                format!("integrity check failed for {}", file.display()),
            ));
        }
        Self::prepare(db, file.display().to_string())
    }

    /// Opens an ephemeral database that lives only in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory backend cannot be initialized.
    #[cfg(feature = "memory")]
    pub fn open_in_memory() -> DbResult<Self> {
        let db = Builder::new().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::prepare(db, super::backend::MEMORY_MARKER.to_string())
    }

    /// Repairs the database stored in directory `dir` in place.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no database file or the damage cannot be
    /// repaired.
    pub fn repair(dir: &Path) -> DbResult<()> {
        let file = database_file(dir);
        if !file.is_file() {
            return Err(DbError::new(
                DbErrorKind::Io,
                format!("no database file at {}", file.display()),
            ));
        }
        let mut builder = Builder::new();
        builder.set_repair_callback(|session| {
            log::warn!("Repairing database: {:.0}% done", session.progress() * 100.0);
        });
        let mut db = builder.open(&file)?;
        if !db.check_integrity()? {
            log::warn!("Integrity check rewrote damaged pages in {}", file.display());
        }
        Ok(())
    }

    fn prepare(db: redb::Database, label: String) -> DbResult<Self> {
        let txn = db.begin_write()?;
        txn.open_table(OBJECTS)?;
        txn.commit()?;
        Ok(Self { db, label })
    }

    fn write(
        &self,
        durable: bool,
        apply: impl FnOnce(&mut redb::Table<'_, &'static [u8], &'static [u8]>) -> DbResult<()>,
    ) -> DbResult<()> {
        let mut txn = self.db.begin_write()?;
        txn.set_durability(if durable {
            Durability::Immediate
        } else {
            Durability::Eventual
        });
        {
            let mut table = txn.open_table(OBJECTS)?;
            apply(&mut table)?;
        }
        txn.commit()?;
        Ok(())
    }
}

impl KvBackend for Database {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(OBJECTS)?;
        let value = table.get(key)?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8], durable: bool) -> DbResult<()> {
        self.write(durable, |table| {
            table.insert(key, value)?;
            Ok(())
        })
    }

    fn delete(&self, key: &[u8], durable: bool) -> DbResult<()> {
        self.write(durable, |table| {
            table.remove(key)?;
            Ok(())
        })
    }

    fn scan(&self, visit: &mut dyn FnMut(&[u8], &[u8])) -> DbResult<()> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(OBJECTS)?;
        for entry in table.iter()? {
            let (key, value) = entry?;
            visit(key.value(), value.value());
        }
        Ok(())
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("location", &self.label)
            .finish_non_exhaustive()
    }
}

/// Returns the database file path inside directory `dir`.
#[must_use]
pub fn database_file(dir: &Path) -> PathBuf {
    dir.join(DATABASE_FILENAME)
}
