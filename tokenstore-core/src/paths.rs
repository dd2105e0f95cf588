//! Storage path helpers.

use std::path::{Path, PathBuf};

const DATABASE_DIRNAME: &str = "database";
const QUARANTINE_DIRNAME: &str = "database_corrupt";

/// Paths for object store artifacts under a storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    root: PathBuf,
}

impl StorePaths {
    /// Builds storage paths rooted at `root`.
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Returns the storage root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory holding the live database.
    #[must_use]
    pub fn database_dir(&self) -> PathBuf {
        self.root.join(DATABASE_DIRNAME)
    }

    /// Returns the directory a corrupted database is moved to before a
    /// fresh one is created.
    #[must_use]
    pub fn quarantine_dir(&self) -> PathBuf {
        self.root.join(QUARANTINE_DIRNAME)
    }
}
