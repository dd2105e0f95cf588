//! Minimal durable key-value backend for the token object store.
//!
//! The store consumes storage only through the [`KvBackend`] and
//! [`StorageEngine`] traits defined here. [`RedbEngine`] is the production
//! implementation: one `redb` file per database directory, strict open with
//! an immediate integrity check, and an explicit out-of-band repair path.
//!
//! With the `memory` feature (on by default) the reserved location
//! [`MEMORY_MARKER`] opens an ephemeral in-memory database instead.

mod backend;
mod connection;
mod engine;
pub mod error;

pub use backend::{KvBackend, Location, OpenOptions, StorageEngine, MEMORY_MARKER};
pub use connection::{database_file, Database, DATABASE_FILENAME};
pub use engine::RedbEngine;
pub use error::{DbError, DbErrorKind, DbResult};
