//! Persistent handle allocation and scalar metadata.
//!
//! Scalar metadata lives beside the blobs under plain keys and is stored as
//! decimal text. Metadata writes are always durable.

use tokenstore_db::KvBackend;

use crate::error::{StoreError, StoreResult};
use crate::types::Handle;

/// Metadata key holding the next handle to hand out.
pub const NEXT_BLOB_ID_KEY: &str = "NextBlobID";

/// Metadata key holding the database format version. Its presence marks an
/// initialized database.
pub const DATABASE_VERSION_KEY: &str = "DBVersion";

/// Format version written to fresh databases.
pub const DATABASE_VERSION: u32 = 1;

/// First handle issued by a fresh database.
pub const FIRST_HANDLE: u32 = 1;

/// Reads an integer metadata value.
pub(crate) fn read_int(backend: &dyn KvBackend, key: &'static str) -> StoreResult<Option<u32>> {
    let Some(raw) = backend.get(key.as_bytes())? else {
        return Ok(None);
    };
    let text = String::from_utf8_lossy(&raw);
    let invalid = || StoreError::InvalidMetadata {
        key,
        value: text.clone().into_owned(),
    };
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    text.parse::<u32>().map(Some).map_err(|_| invalid())
}

/// Durably writes an integer metadata value.
pub(crate) fn write_int(backend: &dyn KvBackend, key: &'static str, value: u32) -> StoreResult<()> {
    backend.put(key.as_bytes(), value.to_string().as_bytes(), true)?;
    Ok(())
}

/// Writes the metadata of a fresh database.
pub(crate) fn initialize(backend: &dyn KvBackend) -> StoreResult<()> {
    write_int(backend, NEXT_BLOB_ID_KEY, FIRST_HANDLE)?;
    write_int(backend, DATABASE_VERSION_KEY, DATABASE_VERSION)
}

/// Returns true once [`initialize`] has completed on `backend`.
pub(crate) fn is_initialized(backend: &dyn KvBackend) -> StoreResult<bool> {
    Ok(backend.get(DATABASE_VERSION_KEY.as_bytes())?.is_some())
}

/// Allocates the next handle.
///
/// The advanced counter is synced before the handle is returned, so a crash
/// can waste a handle but never reissue one. Handles are not reused after
/// delete. Callers serialize allocation.
pub(crate) fn allocate(backend: &dyn KvBackend) -> StoreResult<Handle> {
    let next = read_int(backend, NEXT_BLOB_ID_KEY)?
        .ok_or(StoreError::MissingMetadata(NEXT_BLOB_ID_KEY))?;
    if next == u32::MAX {
        return Err(StoreError::IdSpaceExhausted);
    }
    write_int(backend, NEXT_BLOB_ID_KEY, next + 1)?;
    Ok(Handle::new(next))
}
