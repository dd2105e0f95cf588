//! Persistent object store for a PKCS#11 token service.
//!
//! Objects are opaque byte payloads, either public or private, addressed by
//! store-allocated [`Handle`]s. Every payload is sealed in an authenticated
//! envelope before it reaches disk: private objects under the caller's
//! [`MasterKey`], public objects under a fixed obfuscation key. Small
//! internal blobs are kept unencrypted beside them for the token's own
//! metadata.
//!
//! [`ObjectStore::open`] brings the database up and recovers from
//! corruption on its own: a failed open is followed by a repair, and a failed
//! repair by a fresh database with the damaged one kept in a quarantine
//! directory.
//!
//! ```rust
//! # #[cfg(feature = "memory")]
//! # fn demo() -> tokenstore_core::StoreResult<()> {
//! use tokenstore_core::{MasterKey, ObjectBlob, ObjectStore, StoreConfig};
//!
//! let config = StoreConfig::from_path_str(":memory:")
//!     .with_encryption_key(MasterKey::from_bytes([7; 32]));
//! let store = ObjectStore::open(config)?;
//!
//! let handle = store.insert(&ObjectBlob::private(b"secret".to_vec()))?;
//! assert_eq!(store.load_private()?[&handle].payload, b"secret");
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod allocator;
pub use allocator::{DATABASE_VERSION, DATABASE_VERSION_KEY, FIRST_HANDLE, NEXT_BLOB_ID_KEY};

pub mod codec;
pub use codec::BlobCategory;

mod config;
pub use config::StoreConfig;

pub mod envelope;

mod error;
pub use error::{StoreError, StoreResult};

mod events;
pub use events::{EventSink, LogEventSink, NoopEventSink, StoreEvent};

pub mod keys;
pub use keys::{MasterKey, KEY_SIZE};

mod lifecycle;
pub use lifecycle::RecoveryOutcome;

pub mod logger;

mod paths;
pub use paths::StorePaths;

mod store;
pub use store::ObjectStore;

mod types;
pub use types::{Handle, ObjectBlob};

pub use tokenstore_db::{Location, StorageEngine, MEMORY_MARKER};
