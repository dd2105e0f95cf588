//! Error types for the object store.

use thiserror::Error;
use tokenstore_db::DbError;

use crate::codec::BlobCategory;
use crate::types::Handle;

/// Result type for object store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the object store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A private blob was used before the master key was set.
    #[error("the store encryption key has not been initialized")]
    KeyNotInitialized,

    /// A master key of the wrong size was supplied.
    #[error("unexpected key size: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Required key size in bytes.
        expected: usize,
        /// Size of the rejected key.
        actual: usize,
    },

    /// The stored payload is truncated or its MAC does not verify.
    #[error("failed to verify blob integrity: {0}")]
    Integrity(String),

    /// The envelope carries a format version this build does not read.
    #[error("blob found with unsupported version: {0}")]
    UnsupportedVersion(u8),

    /// The cipher rejected an authenticated body.
    #[error("decryption error: {0}")]
    Decryption(String),

    /// The cipher failed to produce a ciphertext.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// The blob's privacy does not match the handle's recorded category.
    #[error("object privacy mismatch for handle {handle}: recorded as {category}")]
    PrivacyMismatch {
        /// Handle the update targeted.
        handle: Handle,
        /// Category recorded for the handle.
        category: BlobCategory,
    },

    /// Every representable handle has been allocated.
    #[error("object id space exhausted")]
    IdSpaceExhausted,

    /// A metadata key holds a value that is not a decimal integer.
    #[error("invalid metadata value under {key}: {value:?}")]
    InvalidMetadata {
        /// Metadata key that was read.
        key: &'static str,
        /// The raw value found.
        value: String,
    },

    /// A metadata key written at initialization is absent.
    #[error("metadata key {0} is missing")]
    MissingMetadata(&'static str),

    /// The key-value backend failed.
    #[error("backend error: {0}")]
    Backend(#[from] DbError),

    /// The requested environment is not compiled into this build.
    #[error("unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    /// Opening, repairing and recreating the database all failed.
    #[error("store initialization failed: {0}")]
    InitializationFailed(String),

    /// A bulk delete removed some entries but not all of them.
    #[error("failed to delete {failed} of {attempted} object blobs")]
    IncompleteDeletion {
        /// Number of deletes that failed.
        failed: usize,
        /// Number of deletes attempted.
        attempted: usize,
    },

    /// The store mutex was poisoned by a panicking thread.
    #[error("store lock error: {0}")]
    Lock(String),
}

impl StoreError {
    /// Returns true for errors that describe a damaged or unreadable blob
    /// rather than a failure of the store itself.
    #[must_use]
    pub const fn is_blob_damage(&self) -> bool {
        matches!(
            self,
            Self::Integrity(_) | Self::UnsupportedVersion(_) | Self::Decryption(_)
        )
    }
}
