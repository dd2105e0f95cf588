//! Bridge from the `log` facade to a host-provided logger.
//!
//! Token services usually run inside a daemon that already owns a logging
//! pipeline (syslog, a platform logger). The store logs through `log`; hosts
//! that do not install a `log` implementation of their own can hand a
//! [`Logger`] to [`set_logger`] instead.

use std::sync::{Arc, OnceLock};

/// Receiver for log lines emitted by the store.
///
/// # Examples
///
/// ```rust
/// use tokenstore_core::logger::{LogLevel, Logger};
///
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         eprintln!("[{level:?}] {message}");
///     }
/// }
/// ```
pub trait Logger: Sync + Send {
    /// Records `message` at `level`.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Very detailed tracing output.
    Trace,
    /// Debugging information.
    Debug,
    /// Progress of normal operation.
    Info,
    /// Recoverable problems, e.g. a skipped damaged blob.
    Warn,
    /// Failures reported to the caller.
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

const CRATE_PREFIX: &str = "tokenstore";

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

struct HostLogger;

impl log::Log for HostLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if !should_forward(record.level(), record.module_path()) {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), record.args().to_string());
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

/// Debug and trace lines are only forwarded from this workspace's crates;
/// dependencies such as the storage engine are too chatty at those levels.
fn should_forward(level: log::Level, module_path: Option<&str>) -> bool {
    let verbose = matches!(level, log::Level::Debug | log::Level::Trace);
    !verbose || module_path.is_some_and(|path| path.starts_with(CRATE_PREFIX))
}

/// Installs `logger` as the destination for all store log output.
///
/// Only the first call takes effect. Later calls, or a call made after
/// another `log` implementation was installed, print a notice and leave the
/// existing logger in place.
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("Logger already set");
    }

    if let Err(e) = init_logger() {
        eprintln!("Failed to set logger: {e}");
    }
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: HostLogger = HostLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_lines_only_from_workspace_crates() {
        assert!(should_forward(log::Level::Debug, Some("tokenstore_core::store")));
        assert!(should_forward(log::Level::Trace, Some("tokenstore_db::engine")));
        assert!(!should_forward(log::Level::Debug, Some("redb::tree_store")));
        assert!(!should_forward(log::Level::Trace, None));
    }

    #[test]
    fn test_warnings_forwarded_from_anywhere() {
        assert!(should_forward(log::Level::Warn, Some("redb::tree_store")));
        assert!(should_forward(log::Level::Error, None));
        assert!(should_forward(log::Level::Info, Some("tokenstore_core")));
    }

    #[test]
    fn test_level_conversion() {
        assert_eq!(LogLevel::from(log::Level::Error), LogLevel::Error);
        assert_eq!(LogLevel::from(log::Level::Trace), LogLevel::Trace);
        assert!(LogLevel::Warn > LogLevel::Info);
    }
}
