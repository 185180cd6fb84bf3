//! Logger that discards everything

use std::sync::Arc;

use super::traits::{Level, Logger, SharedLogger};

#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn log(&self, _level: Level, _message: &str) {}

    fn enabled(&self, _level: Level) -> bool {
        false
    }
}

/// Shared default for every component that takes an optional logger
pub fn noop_logger() -> SharedLogger {
    Arc::new(NoOpLogger)
}
