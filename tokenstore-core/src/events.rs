//! Observability events emitted while bringing the database up.
//!
//! Delivery is best effort: the store never branches on whether an event was
//! accepted.

/// A named lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreEvent {
    /// The database failed to open and a repair is being attempted.
    DatabaseCorrupted,
    /// Repair failed; the database is being moved aside and recreated.
    DatabaseRepairFailure,
    /// A fresh database could not be created either.
    DatabaseCreateFailure,
}

impl StoreEvent {
    /// Returns the stable event name reported to the sink.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DatabaseCorrupted => "TokenStore.DatabaseCorrupted",
            Self::DatabaseRepairFailure => "TokenStore.DatabaseRepairFailure",
            Self::DatabaseCreateFailure => "TokenStore.DatabaseCreateFailure",
        }
    }
}

impl std::fmt::Display for StoreEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Receiver for [`StoreEvent`]s, e.g. a metrics or telemetry client.
pub trait EventSink: Send + Sync {
    /// Records `event`. Returns whether the event was accepted.
    fn send_event(&self, event: StoreEvent) -> bool;
}

/// Default sink that reports events through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn send_event(&self, event: StoreEvent) -> bool {
        log::info!("Store event: {event}");
        true
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn send_event(&self, _event: StoreEvent) -> bool {
        false
    }
}
