//! Object store facade.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use tokenstore_db::{KvBackend, RedbEngine, StorageEngine};

use crate::allocator::{self, DATABASE_VERSION_KEY};
use crate::codec::{decode_blob_key, encode_blob_key, BlobCategory};
use crate::config::StoreConfig;
use crate::envelope;
use crate::error::{StoreError, StoreResult};
use crate::keys::MasterKey;
use crate::lifecycle::{self, RecoveryOutcome};
use crate::types::{Handle, ObjectBlob};

/// Persistent store for token objects and internal metadata blobs.
///
/// A value of this type only exists once the database is healthy. All state
/// lives behind one mutex, so handle allocation and the category cache are
/// serialized across threads.
pub struct ObjectStore {
    inner: Mutex<ObjectStoreInner>,
    outcome: RecoveryOutcome,
    is_new: bool,
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("outcome", &self.outcome)
            .field("is_new", &self.is_new)
            .finish_non_exhaustive()
    }
}

struct ObjectStoreInner {
    backend: Box<dyn KvBackend>,
    key: Option<MasterKey>,
    /// Category of every handle inserted or loaded in this session.
    blob_types: HashMap<Handle, BlobCategory>,
}

impl ObjectStore {
    /// Opens the store described by `config` with the `redb` engine,
    /// repairing or recreating a damaged database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnsupportedEnvironment`] for `:memory:` in a
    /// build without in-memory support, and
    /// [`StoreError::InitializationFailed`] when no usable database could be
    /// produced.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        Self::open_with_engine(config, &RedbEngine::new())
    }

    /// Opens the store with a caller-provided storage engine.
    ///
    /// # Errors
    ///
    /// See [`ObjectStore::open`].
    pub fn open_with_engine(config: StoreConfig, engine: &dyn StorageEngine) -> StoreResult<Self> {
        let StoreConfig {
            location,
            events,
            encryption_key,
        } = config;
        let healthy = lifecycle::open_healthy(&location, engine, &*events)?;
        Ok(Self {
            inner: Mutex::new(ObjectStoreInner {
                backend: healthy.backend,
                key: encryption_key,
                blob_types: HashMap::new(),
            }),
            outcome: healthy.outcome,
            is_new: healthy.is_new,
        })
    }

    /// Returns how the database was brought up.
    #[must_use]
    pub const fn recovery(&self) -> RecoveryOutcome {
        self.outcome
    }

    /// Returns true if this open initialized an empty database.
    #[must_use]
    pub const fn is_new_database(&self) -> bool {
        self.is_new
    }

    /// Returns the stored database format version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be read or is malformed.
    pub fn database_version(&self) -> StoreResult<u32> {
        let inner = self.lock_inner()?;
        allocator::read_int(&*inner.backend, DATABASE_VERSION_KEY)?
            .ok_or(StoreError::MissingMetadata(DATABASE_VERSION_KEY))
    }

    /// Reads the unencrypted internal blob `id`. A missing blob is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub fn get_internal(&self, id: u32) -> StoreResult<Option<Vec<u8>>> {
        self.lock_inner()?.get_internal(id)
    }

    /// Durably writes the unencrypted internal blob `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub fn set_internal(&self, id: u32, blob: &[u8]) -> StoreResult<()> {
        self.lock_inner()?.set_internal(id, blob)
    }

    /// Sets the master key used for private objects.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKeyLength`] for a key that is not exactly
    /// 32 bytes. The previous key, if any, stays in effect.
    pub fn set_encryption_key(&self, key: &[u8]) -> StoreResult<()> {
        let key = MasterKey::from_slice(key).inspect_err(|e| log::error!("{e}"))?;
        self.lock_inner()?.key = Some(key);
        Ok(())
    }

    /// Returns true once a master key is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the store mutex is poisoned.
    pub fn has_encryption_key(&self) -> StoreResult<bool> {
        Ok(self.lock_inner()?.key.is_some())
    }

    /// Stores a new object and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KeyNotInitialized`] for a private object without
    /// a master key, [`StoreError::IdSpaceExhausted`] when no handle is
    /// left, or the encryption or backend failure. A handle allocated before
    /// a failure is not reissued.
    pub fn insert(&self, blob: &ObjectBlob) -> StoreResult<Handle> {
        self.lock_inner()?.insert(blob)
    }

    /// Replaces the object stored under `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PrivacyMismatch`] if the blob's visibility does
    /// not match the category recorded for `handle` this session, otherwise
    /// the encryption or backend failure.
    pub fn update(&self, handle: Handle, blob: &ObjectBlob) -> StoreResult<()> {
        self.lock_inner()?.update(handle, blob)
    }

    /// Deletes the object stored under `handle`. Deleting a missing object
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend delete fails.
    pub fn delete(&self, handle: Handle) -> StoreResult<()> {
        self.lock_inner()?.delete(handle)
    }

    /// Deletes every public and private object. Internal blobs are kept.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IncompleteDeletion`] if some deletes failed.
    /// Objects already deleted stay deleted.
    pub fn delete_all_objects(&self) -> StoreResult<()> {
        self.lock_inner()?.delete_all_objects()
    }

    /// Loads every public object. Damaged entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend scan fails.
    pub fn load_public(&self) -> StoreResult<BTreeMap<Handle, ObjectBlob>> {
        self.lock_inner()?.load(BlobCategory::Public)
    }

    /// Loads every private object readable under the current master key.
    /// Damaged entries, and entries sealed under another key, are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KeyNotInitialized`] without a master key, or an
    /// error if the backend scan fails.
    pub fn load_private(&self) -> StoreResult<BTreeMap<Handle, ObjectBlob>> {
        let mut inner = self.lock_inner()?;
        if inner.key.is_none() {
            log::error!("The store encryption key has not been initialized");
            return Err(StoreError::KeyNotInitialized);
        }
        inner.load(BlobCategory::Private)
    }

    fn lock_inner(&self) -> StoreResult<MutexGuard<'_, ObjectStoreInner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Lock("store mutex poisoned".to_string()))
    }
}

impl ObjectStoreInner {
    fn category_of(&self, handle: Handle) -> BlobCategory {
        self.blob_types
            .get(&handle)
            .copied()
            .unwrap_or(BlobCategory::Internal)
    }

    fn get_internal(&self, id: u32) -> StoreResult<Option<Vec<u8>>> {
        let key = encode_blob_key(BlobCategory::Internal, id);
        self.backend.get(&key).map_err(|e| {
            log::error!("Failed to read internal blob {id}: {e}");
            e.into()
        })
    }

    fn set_internal(&self, id: u32, blob: &[u8]) -> StoreResult<()> {
        let key = encode_blob_key(BlobCategory::Internal, id);
        self.backend.put(&key, blob, true).map_err(|e| {
            log::error!("Failed to write internal blob {id}: {e}");
            e.into()
        })
    }

    fn insert(&mut self, blob: &ObjectBlob) -> StoreResult<Handle> {
        if blob.is_private && self.key.is_none() {
            log::error!("The store encryption key has not been initialized");
            return Err(StoreError::KeyNotInitialized);
        }
        let handle = allocator::allocate(&*self.backend)
            .inspect_err(|e| log::error!("Failed to generate blob identifier: {e}"))?;
        self.blob_types
            .insert(handle, BlobCategory::for_object(blob.is_private));

        if let Err(e) = self.update(handle, blob) {
            self.blob_types.remove(&handle);
            return Err(e);
        }
        log::debug!("Inserted object {handle}");
        Ok(handle)
    }

    fn update(&self, handle: Handle, blob: &ObjectBlob) -> StoreResult<()> {
        let category = self.category_of(handle);
        if !category.accepts(blob.is_private) {
            log::error!("Object privacy mismatch for handle {handle}");
            return Err(StoreError::PrivacyMismatch { handle, category });
        }
        let sealed = envelope::encrypt(blob, self.key.as_ref())
            .inspect_err(|e| log::error!("Failed to encrypt object blob: {e}"))?;
        let key = encode_blob_key(category, handle.get());
        self.backend.put(&key, &sealed.payload, true).map_err(|e| {
            log::error!("Failed to write object blob {handle}: {e}");
            e.into()
        })
    }

    fn delete(&mut self, handle: Handle) -> StoreResult<()> {
        let key = encode_blob_key(self.category_of(handle), handle.get());
        self.backend.delete(&key, true).map_err(|e| {
            log::error!("Failed to delete blob {handle}: {e}");
            StoreError::from(e)
        })?;
        self.blob_types.remove(&handle);
        Ok(())
    }

    fn delete_all_objects(&mut self) -> StoreResult<()> {
        let mut doomed = Vec::new();
        self.backend.scan(&mut |key, _| {
            if let Some((category, id)) = decode_blob_key(key) {
                if category != BlobCategory::Internal {
                    doomed.push((key.to_vec(), Handle::new(id)));
                }
            }
        })?;

        let attempted = doomed.len();
        let mut failed = 0;
        for (key, handle) in doomed {
            match self.backend.delete(&key, true) {
                Ok(()) => {
                    self.blob_types.remove(&handle);
                }
                Err(e) => {
                    log::error!("Failed to delete blob {handle}: {e}");
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(StoreError::IncompleteDeletion { failed, attempted });
        }
        log::info!("Deleted {attempted} object blobs");
        Ok(())
    }

    fn load(&mut self, category: BlobCategory) -> StoreResult<BTreeMap<Handle, ObjectBlob>> {
        let mut stored = Vec::new();
        self.backend.scan(&mut |key, value| {
            if let Some((found, id)) = decode_blob_key(key) {
                if found == category {
                    stored.push((Handle::new(id), value.to_vec()));
                }
            }
        })?;

        let is_private = category == BlobCategory::Private;
        let mut blobs = BTreeMap::new();
        for (handle, payload) in stored {
            let sealed = ObjectBlob::new(is_private, payload);
            match envelope::decrypt(&sealed, self.key.as_ref()) {
                Ok(blob) => {
                    self.blob_types.insert(handle, category);
                    blobs.insert(handle, blob);
                }
                Err(e) if e.is_blob_damage() => {
                    log::warn!("Failed to decrypt object blob {handle}: {e}");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(blobs)
    }
}
