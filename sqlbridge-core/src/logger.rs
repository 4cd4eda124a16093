//! Routes the crate's `log` records to a caller-provided sink.
//!
//! The bridge logs through the `log` facade. An embedding application either
//! installs its own `log` backend or hands a [`Logger`] to [`set_logger`].
//! Debug and trace records from other crates are dropped.

use std::sync::{Arc, OnceLock};

/// A sink for log messages.
///
/// ```rust
/// use sqlbridge_core::logger::{LogLevel, Logger};
///
/// struct Stderr;
///
/// impl Logger for Stderr {
///     fn log(&self, level: LogLevel, message: String) {
///         eprintln!("[{level:?}] {message}");
///     }
/// }
/// ```
pub trait Logger: Sync + Send {
    /// Receives one formatted record.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a forwarded record, mirroring [`log::Level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

struct ForwardingLogger;

/// `true` when a record should reach the sink.
fn accepts(level: log::Level, module_path: Option<&str>) -> bool {
    let from_bridge = module_path.is_some_and(|path| path.starts_with("sqlbridge"));
    let verbose = matches!(level, log::Level::Debug | log::Level::Trace);
    from_bridge || !verbose
}

impl log::Log for ForwardingLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if !accepts(record.level(), record.module_path()) {
            return;
        }
        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(log_level(record.level()), format!("{}", record.args()));
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

const fn log_level(level: log::Level) -> LogLevel {
    match level {
        log::Level::Error => LogLevel::Error,
        log::Level::Warn => LogLevel::Warn,
        log::Level::Info => LogLevel::Info,
        log::Level::Debug => LogLevel::Debug,
        log::Level::Trace => LogLevel::Trace,
    }
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Installs `logger` as the destination for bridge log records.
///
/// Only the first call takes effect; later calls are ignored with a notice
/// on stderr. Fails silently (with a notice) when another `log` backend is
/// already installed.
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("Logger already set");
    }
    if let Err(e) = init_logger() {
        eprintln!("Failed to set logger: {e}");
    }
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: ForwardingLogger = ForwardingLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
