//! Core data types shared across the store.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Identifier of a stored object, unique for the lifetime of the database.
///
/// Handles are allocated by the store, start at 1, and are never reused, not
/// even after the object they named has been deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u32);

impl Handle {
    /// Wraps a raw handle value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Handle {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// An opaque object payload together with its visibility.
///
/// The same shape carries plaintext on the caller side and the stored
/// envelope on the backend side. The payload is wiped when dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ObjectBlob {
    /// Whether the object is private (encrypted under the master key).
    #[zeroize(skip)]
    pub is_private: bool,
    /// Object bytes.
    pub payload: Vec<u8>,
}

impl ObjectBlob {
    /// Creates a blob.
    #[must_use]
    pub fn new(is_private: bool, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            is_private,
            payload: payload.into(),
        }
    }

    /// Creates a public blob.
    #[must_use]
    pub fn public(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(false, payload)
    }

    /// Creates a private blob.
    #[must_use]
    pub fn private(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(true, payload)
    }
}

impl fmt::Debug for ObjectBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectBlob")
            .field("is_private", &self.is_private)
            .field("payload", &format_args!("[{} bytes]", self.payload.len()))
            .finish()
    }
}
