//! Master key handling and per-blob key selection.

use secrecy::{ExposeSecret, SecretBox};

use super::error::{StoreError, StoreResult};

/// Size of the master key and the obfuscation key, in bytes.
pub const KEY_SIZE: usize = 32;

/// Fixed key for public objects.
///
/// This is not a secret. It keeps public object bytes from being readable at
/// a glance in the raw database and keeps public and private envelopes under
/// different keys. It provides no confidentiality.
pub const OBFUSCATION_KEY: [u8; KEY_SIZE] = [
    0x6f, 0xaa, 0x0a, 0xb6, 0x10, 0xc0, 0xa6, 0xe4, 0x07, 0x8b, 0x05, 0x1c, 0xd2, 0x8b, 0xac, 0x2d,
    0xba, 0x5e, 0x14, 0x9c, 0xae, 0x57, 0xfb, 0x04, 0x13, 0x92, 0xc0, 0x84, 0x2a, 0xea, 0xf6, 0xfb,
];

/// Master key for private objects (256-bit).
///
/// Supplied already formed by the caller.
///
/// # Security
///
/// - The key lives in a [`SecretBox`] and is zeroized on drop.
/// - The key should never be logged or serialized in plaintext.
pub struct MasterKey(SecretBox<[u8; KEY_SIZE]>);

impl MasterKey {
    /// Creates a master key from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(SecretBox::new(Box::new(bytes)))
    }

    /// Creates a master key from a slice, which must be exactly
    /// [`KEY_SIZE`] bytes long.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKeyLength`] for any other length.
    pub fn from_slice(bytes: &[u8]) -> StoreResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(StoreError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self(SecretBox::init_with_mut(|key: &mut [u8; KEY_SIZE]| {
            key.copy_from_slice(bytes);
        })))
    }

    /// Returns the raw key bytes. Treat this as sensitive material.
    #[must_use]
    pub fn expose(&self) -> &[u8; KEY_SIZE] {
        self.0.expose_secret()
    }
}

impl Clone for MasterKey {
    fn clone(&self) -> Self {
        Self(SecretBox::init_with_mut(|key: &mut [u8; KEY_SIZE]| {
            key.copy_from_slice(self.expose());
        }))
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Selects the key a blob is sealed under: the master key for private
/// blobs, the obfuscation key otherwise.
///
/// # Errors
///
/// Returns [`StoreError::KeyNotInitialized`] for a private blob when no
/// master key is set.
pub fn select_key(is_private: bool, master: Option<&MasterKey>) -> StoreResult<&[u8; KEY_SIZE]> {
    if is_private {
        master
            .map(MasterKey::expose)
            .ok_or(StoreError::KeyNotInitialized)
    } else {
        Ok(&OBFUSCATION_KEY)
    }
}
