//! Logger trait definition

use std::fmt;
use std::sync::Arc;

/// Severity of a log message, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for diagnostics from repositories, the composite resolver and the client
///
/// Implementations:
/// - `NoOpLogger`: drops everything, the default
/// - `ConsoleLogger`: prefixed lines on stdout/stderr
/// - `TracingLogger`: `tracing` events
///
/// Messages never carry passwords or tokens; URIs are logged after credential
/// stripping.
pub trait Logger: Send + Sync {
    fn log(&self, level: Level, message: &str);

    /// Whether messages at `level` are kept; the `log_*!` macros skip formatting otherwise
    fn enabled(&self, _level: Level) -> bool {
        true
    }

    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
}

pub type SharedLogger = Arc<dyn Logger>;

#[doc(hidden)]
#[macro_export]
macro_rules! __log_at {
    ($level:expr, $logger:expr, $($arg:tt)*) => {{
        let logger = &$logger;
        if logger.enabled($level) {
            logger.log($level, &format!($($arg)*));
        }
    }};
}

/// Format and log at debug level through a [`Logger`]
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $crate::__log_at!($crate::logging::Level::Debug, $logger, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $crate::__log_at!($crate::logging::Level::Info, $logger, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $crate::__log_at!($crate::logging::Level::Warn, $logger, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)*) => {
        $crate::__log_at!($crate::logging::Level::Error, $logger, $($arg)*)
    };
}
