//! Backend contract consumed by the object store.
//!
//! The store only ever talks to a [`KvBackend`] obtained from a
//! [`StorageEngine`]. The engine owns the open/repair half of the contract so
//! that recovery can be driven (and scripted in tests) without knowing which
//! database sits underneath.

use std::path::{Path, PathBuf};

use super::error::DbResult;

/// Reserved location string selecting the ephemeral in-memory backend.
pub const MEMORY_MARKER: &str = ":memory:";

/// Where a database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Ephemeral storage that disappears with the process.
    Memory,
    /// A database directory on the local filesystem.
    Path(PathBuf),
}

impl Location {
    /// Parses a configured location, honouring [`MEMORY_MARKER`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw == MEMORY_MARKER {
            Self::Memory
        } else {
            Self::Path(PathBuf::from(raw))
        }
    }

    /// Returns the filesystem path, if this is an on-disk location.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Memory => None,
            Self::Path(path) => Some(path),
        }
    }

    /// Returns true for the in-memory location.
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => f.write_str(MEMORY_MARKER),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Options applied when opening a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    /// Create an empty database when none exists at the location.
    pub create_if_missing: bool,
    /// Fail on any detected inconsistency instead of silently repairing it.
    pub strict: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            strict: true,
        }
    }
}

/// Durable sorted mapping of byte-string keys to byte-string values.
pub trait KvBackend: Send + Sync {
    /// Reads the value stored under `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// With `durable` set the write is synced to stable storage before
    /// returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn put(&self, key: &[u8], value: &[u8], durable: bool) -> DbResult<()>;

    /// Removes `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete(&self, key: &[u8], durable: bool) -> DbResult<()>;

    /// Visits every entry in ascending key order.
    ///
    /// Each call starts from the first key and sees a consistent snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan cannot be started or a page cannot be read.
    fn scan(&self, visit: &mut dyn FnMut(&[u8], &[u8])) -> DbResult<()>;
}

/// Opens and repairs databases at a [`Location`].
pub trait StorageEngine: Send + Sync {
    /// Opens the database at `location`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or, with
    /// [`OpenOptions::strict`], if any inconsistency is detected.
    fn open(&self, location: &Location, options: OpenOptions) -> DbResult<Box<dyn KvBackend>>;

    /// Attempts an out-of-band repair of the database at `location`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be brought back to a
    /// consistent state.
    fn repair(&self, location: &Location) -> DbResult<()>;

    /// Whether this engine can serve [`Location::Memory`].
    fn supports_memory(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_marker_parses_to_memory() {
        assert_eq!(Location::parse(":memory:"), Location::Memory);
        assert!(Location::parse(":memory:").path().is_none());
    }

    #[test]
    fn test_other_strings_parse_to_paths() {
        let location = Location::parse("/var/lib/tokens");
        assert_eq!(location.path(), Some(Path::new("/var/lib/tokens")));
        assert!(!location.is_memory());
        assert_eq!(location.to_string(), "/var/lib/tokens");
    }

    #[test]
    fn test_default_open_options_are_conservative() {
        let options = OpenOptions::default();
        assert!(options.create_if_missing);
        assert!(options.strict);
    }
}
