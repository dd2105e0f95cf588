//! Store configuration.

use std::path::PathBuf;
use std::sync::Arc;

use tokenstore_db::Location;

use crate::events::{EventSink, LogEventSink};
use crate::keys::MasterKey;

/// Configuration for [`crate::ObjectStore::open`], built once at startup.
#[derive(Clone)]
pub struct StoreConfig {
    /// Storage root, or [`Location::Memory`] for an ephemeral store. The
    /// live database is kept in `<root>/database`.
    pub location: Location,
    /// Destination for lifecycle events.
    pub events: Arc<dyn EventSink>,
    /// Master key for private objects, if already known at open time.
    pub encryption_key: Option<MasterKey>,
}

impl StoreConfig {
    /// Creates a configuration for `location` with the default event sink
    /// and no encryption key.
    #[must_use]
    pub fn new(location: Location) -> Self {
        Self {
            location,
            events: Arc::new(LogEventSink),
            encryption_key: None,
        }
    }

    /// Creates a configuration for a storage root given as a string.
    /// `":memory:"` selects an ephemeral store.
    #[must_use]
    pub fn from_path_str(path: &str) -> Self {
        Self::new(Location::parse(path))
    }

    /// Creates a configuration for an on-disk storage root.
    #[must_use]
    pub fn at_root(root: impl Into<PathBuf>) -> Self {
        Self::new(Location::Path(root.into()))
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Sets the master key used for private objects.
    #[must_use]
    pub fn with_encryption_key(mut self, key: MasterKey) -> Self {
        self.encryption_key = Some(key);
        self
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("location", &self.location)
            .field("has_encryption_key", &self.encryption_key.is_some())
            .finish_non_exhaustive()
    }
}
