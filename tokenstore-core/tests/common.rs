//! Common test utilities shared across integration tests.
#![allow(missing_docs)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tokenstore_core::{EventSink, StoreConfig, StoreEvent};
use tokenstore_db::{
    DbError, DbErrorKind, DbResult, KvBackend, Location, OpenOptions, RedbEngine,
    StorageEngine, DATABASE_FILENAME,
};

pub fn temp_root() -> TempDir {
    tempfile::Builder::new()
        .prefix("tokenstore-test-")
        .tempdir()
        .expect("create temp root")
}

/// Config for an on-disk store under `root` that reports into `sink`.
pub fn disk_config(root: &Path, sink: &Arc<RecordingSink>) -> StoreConfig {
    StoreConfig::at_root(root).with_events(sink.clone())
}

/// Replaces the live database file with bytes no engine can read.
#[allow(dead_code, reason = "used in tests")]
pub fn corrupt_database(root: &Path) {
    let dir = root.join("database");
    fs::create_dir_all(&dir).expect("create database dir");
    fs::write(dir.join(DATABASE_FILENAME), vec![0xAB; 8192]).expect("write garbage");
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<StoreEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[allow(dead_code, reason = "used in tests")]
    pub fn events(&self) -> Vec<StoreEvent> {
        self.events.lock().expect("sink mutex").clone()
    }
}

impl EventSink for RecordingSink {
    fn send_event(&self, event: StoreEvent) -> bool {
        self.events.lock().expect("sink mutex").push(event);
        true
    }
}

/// What [`ScriptedEngine::repair`] does.
#[allow(dead_code, reason = "used in tests")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairScript {
    /// Forward to the real engine.
    Delegate,
    /// Report success without touching anything.
    Succeed,
    /// Always fail.
    Fail,
}

/// Engine call as seen by [`ScriptedEngine`].
#[allow(dead_code, reason = "used in tests")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCall {
    Open,
    Repair,
}

/// Wraps [`RedbEngine`] and injects failures.
#[allow(dead_code, reason = "used in tests")]
pub struct ScriptedEngine {
    inner: RedbEngine,
    failing_opens: AtomicUsize,
    repair: RepairScript,
    supports_memory: bool,
    fail_delete_prefix: Option<&'static [u8]>,
    fail_put_prefix: Option<&'static [u8]>,
    calls: Mutex<Vec<EngineCall>>,
}

#[allow(dead_code, reason = "used in tests")]
impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            inner: RedbEngine::new(),
            failing_opens: AtomicUsize::new(0),
            repair: RepairScript::Delegate,
            supports_memory: true,
            fail_delete_prefix: None,
            fail_put_prefix: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fails the next `count` opens with a corruption error.
    pub fn failing_opens(self, count: usize) -> Self {
        self.failing_opens.store(count, Ordering::SeqCst);
        self
    }

    pub fn with_repair(mut self, script: RepairScript) -> Self {
        self.repair = script;
        self
    }

    pub fn without_memory(mut self) -> Self {
        self.supports_memory = false;
        self
    }

    /// Makes every delete of a key starting with `prefix` fail.
    pub fn failing_deletes(mut self, prefix: &'static [u8]) -> Self {
        self.fail_delete_prefix = Some(prefix);
        self
    }

    /// Makes every write of a key starting with `prefix` fail.
    pub fn failing_puts(mut self, prefix: &'static [u8]) -> Self {
        self.fail_put_prefix = Some(prefix);
        self
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().expect("calls mutex").clone()
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().expect("calls mutex").push(call);
    }
}

impl StorageEngine for ScriptedEngine {
    fn open(&self, location: &Location, options: OpenOptions) -> DbResult<Box<dyn KvBackend>> {
        self.record(EngineCall::Open);
        let remaining = self.failing_opens.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_opens.store(remaining - 1, Ordering::SeqCst);
            return Err(DbError::new(DbErrorKind::Corrupted, "scripted open failure"));
        }
        let backend = self.inner.open(location, options)?;
        if self.fail_delete_prefix.is_none() && self.fail_put_prefix.is_none() {
            return Ok(backend);
        }
        Ok(Box::new(FlakyBackend {
            inner: backend,
            delete_prefix: self.fail_delete_prefix,
            put_prefix: self.fail_put_prefix,
        }))
    }

    fn repair(&self, location: &Location) -> DbResult<()> {
        self.record(EngineCall::Repair);
        match self.repair {
            RepairScript::Delegate => self.inner.repair(location),
            RepairScript::Succeed => Ok(()),
            RepairScript::Fail => Err(DbError::new(
                DbErrorKind::Corrupted,
                "scripted repair failure",
            )),
        }
    }

    fn supports_memory(&self) -> bool {
        self.supports_memory && self.inner.supports_memory()
    }
}

/// Backend whose deletes or writes fail for one key prefix each.
#[allow(dead_code, reason = "used in tests")]
struct FlakyBackend {
    inner: Box<dyn KvBackend>,
    delete_prefix: Option<&'static [u8]>,
    put_prefix: Option<&'static [u8]>,
}

#[allow(dead_code, reason = "used in tests")]
fn has_prefix(key: &[u8], prefix: Option<&[u8]>) -> bool {
    prefix.is_some_and(|prefix| key.starts_with(prefix))
}

impl KvBackend for FlakyBackend {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn put(&self, key: &[u8], value: &[u8], durable: bool) -> DbResult<()> {
        if has_prefix(key, self.put_prefix) {
            return Err(DbError::new(DbErrorKind::Io, "scripted write failure"));
        }
        self.inner.put(key, value, durable)
    }

    fn delete(&self, key: &[u8], durable: bool) -> DbResult<()> {
        if has_prefix(key, self.delete_prefix) {
            return Err(DbError::new(DbErrorKind::Io, "scripted delete failure"));
        }
        self.inner.delete(key, durable)
    }

    fn scan(&self, visit: &mut dyn FnMut(&[u8], &[u8])) -> DbResult<()> {
        self.inner.scan(visit)
    }
}
