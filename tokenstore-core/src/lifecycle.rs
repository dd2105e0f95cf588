//! Bringing the database to a healthy state.
//!
//! Recovery is staged: a plain open first, then the engine's repair, and only
//! then a fresh database with the damaged one moved aside for diagnosis.
//! Each escalation is reported to the configured [`EventSink`].

use std::fs;
use std::io;

use tokenstore_db::{KvBackend, Location, OpenOptions, StorageEngine};

use crate::allocator;
use crate::error::{StoreError, StoreResult};
use crate::events::{EventSink, StoreEvent};
use crate::paths::StorePaths;

/// How the database reached a healthy state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// The database opened without intervention.
    Opened,
    /// The database opened after the engine repaired it.
    Repaired,
    /// Repair failed. The damaged database was quarantined and an empty one
    /// created in its place.
    Recreated,
}

impl std::fmt::Display for RecoveryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Opened => "opened",
            Self::Repaired => "repaired",
            Self::Recreated => "recreated",
        };
        f.write_str(name)
    }
}

/// A healthy backend and how it was obtained.
pub(crate) struct HealthyBackend {
    pub(crate) backend: Box<dyn KvBackend>,
    pub(crate) outcome: RecoveryOutcome,
    pub(crate) is_new: bool,
}

/// Opens the database under `location`, repairing or recreating it as
/// needed, and initializes the metadata of a fresh database.
///
/// # Errors
///
/// - [`StoreError::UnsupportedEnvironment`] for an in-memory location when
///   the engine has no in-memory support. No recovery is attempted.
/// - [`StoreError::InitializationFailed`] when even a fresh database cannot
///   be created, or its metadata cannot be written.
pub(crate) fn open_healthy(
    location: &Location,
    engine: &dyn StorageEngine,
    events: &dyn EventSink,
) -> StoreResult<HealthyBackend> {
    if location.is_memory() && !engine.supports_memory() {
        log::error!("Compiled without in-memory database support");
        return Err(StoreError::UnsupportedEnvironment(format!(
            "location {location} requires in-memory database support"
        )));
    }

    let paths = location.path().map(StorePaths::new);
    let db_location = paths
        .as_ref()
        .map_or(Location::Memory, |paths| Location::Path(paths.database_dir()));

    log::info!("Opening database in: {db_location}");
    let (backend, outcome) = open_or_recover(&db_location, paths.as_ref(), engine, events)?;

    let is_new = !allocator::is_initialized(&*backend)
        .map_err(|e| StoreError::InitializationFailed(format!("failed to read metadata: {e}")))?;
    if is_new {
        log::info!("Initializing fresh database");
        allocator::initialize(&*backend).map_err(|e| {
            log::error!("Failed to initialize the blob ID tracker: {e}");
            StoreError::InitializationFailed(format!("failed to write metadata: {e}"))
        })?;
    }

    log::info!("Database {outcome} at {db_location}");
    Ok(HealthyBackend {
        backend,
        outcome,
        is_new,
    })
}

fn open_or_recover(
    db_location: &Location,
    paths: Option<&StorePaths>,
    engine: &dyn StorageEngine,
    events: &dyn EventSink,
) -> StoreResult<(Box<dyn KvBackend>, RecoveryOutcome)> {
    let options = OpenOptions::default();

    let open_err = match engine.open(db_location, options) {
        Ok(backend) => return Ok((backend, RecoveryOutcome::Opened)),
        Err(e) => e,
    };
    log::error!("Failed to open database: {open_err}");
    events.send_event(StoreEvent::DatabaseCorrupted);

    log::warn!("Attempting to repair database");
    let repair_err = match engine
        .repair(db_location)
        .and_then(|()| engine.open(db_location, options))
    {
        Ok(backend) => {
            log::info!("Repaired database");
            return Ok((backend, RecoveryOutcome::Repaired));
        }
        Err(e) => e,
    };
    log::error!("Failed to repair database: {repair_err}");
    events.send_event(StoreEvent::DatabaseRepairFailure);

    log::warn!("Recreating database from scratch");
    if let Some(paths) = paths {
        if let Err(e) = quarantine(paths) {
            log::error!(
                "Failed to move damaged database to {}: {e}",
                paths.quarantine_dir().display()
            );
        }
    }

    match engine.open(db_location, options) {
        Ok(backend) => Ok((backend, RecoveryOutcome::Recreated)),
        Err(e) => {
            log::error!("Failed to create new database: {e}");
            events.send_event(StoreEvent::DatabaseCreateFailure);
            Err(StoreError::InitializationFailed(e.to_string()))
        }
    }
}

/// Moves the live database directory to the quarantine directory, replacing
/// whatever an earlier recovery left there.
fn quarantine(paths: &StorePaths) -> io::Result<()> {
    let quarantine_dir = paths.quarantine_dir();
    match fs::remove_dir_all(&quarantine_dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::rename(paths.database_dir(), &quarantine_dir)?;
    log::warn!("Moved damaged database to {}", quarantine_dir.display());
    Ok(())
}
