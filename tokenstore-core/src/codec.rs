//! Blob key codec.
//!
//! Data blobs share one flat backend namespace with scalar metadata keys
//! (`NextBlobID`, `DBVersion`). A blob key is `<prefix>&<decimal id>` where
//! the prefix names the [`BlobCategory`]. Anything that does not decode is
//! simply "not a blob key", which is how metadata keys coexist with data.

use std::fmt;
use std::str::FromStr;

use strum::{EnumString, IntoStaticStr};

/// Separator between the category prefix and the numeric id.
pub const BLOB_KEY_SEPARATOR: char = '&';

/// Classification of a stored blob.
///
/// The category selects both the key prefix and, for object blobs, the key
/// the payload is encrypted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr)]
pub enum BlobCategory {
    /// Store metadata, stored unencrypted and never returned as an object.
    #[strum(serialize = "InternalBlob")]
    Internal,
    /// Public object, obfuscated under the fixed obfuscation key.
    #[strum(serialize = "PublicBlob")]
    Public,
    /// Private object, encrypted under the master key.
    #[strum(serialize = "PrivateBlob")]
    Private,
}

impl BlobCategory {
    /// Returns the object category for a blob's privacy flag.
    #[must_use]
    pub const fn for_object(is_private: bool) -> Self {
        if is_private {
            Self::Private
        } else {
            Self::Public
        }
    }

    /// Returns the key prefix for this category.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        self.into()
    }

    /// Whether a blob with the given privacy flag may be stored under this
    /// category. Internal blobs never match an object.
    #[must_use]
    pub const fn accepts(self, is_private: bool) -> bool {
        matches!(
            (self, is_private),
            (Self::Public, false) | (Self::Private, true)
        )
    }
}

impl fmt::Display for BlobCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Internal => "internal",
            Self::Public => "public",
            Self::Private => "private",
        };
        f.write_str(name)
    }
}

/// Encodes the backend key for blob `id` in `category`.
#[must_use]
pub fn encode_blob_key(category: BlobCategory, id: u32) -> Vec<u8> {
    format!("{}{BLOB_KEY_SEPARATOR}{id}", category.prefix()).into_bytes()
}

/// Decodes a backend key into its category and id.
///
/// Returns `None` for any key outside the blob scheme: no separator, a
/// suffix that is not a plain decimal `u32`, or an unknown prefix.
#[must_use]
pub fn decode_blob_key(key: &[u8]) -> Option<(BlobCategory, u32)> {
    let key = std::str::from_utf8(key).ok()?;
    let (prefix, suffix) = key.rsplit_once(BLOB_KEY_SEPARATOR)?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let id = suffix.parse::<u32>().ok()?;
    match BlobCategory::from_str(prefix) {
        Ok(category) => Some((category, id)),
        Err(_) => {
            log::debug!("Ignoring key with unknown blob prefix: {key}");
            None
        }
    }
}
