//! Logger that forwards to `tracing`

use super::traits::{Level, Logger};

/// Emits every message as a `tracing` event under a fixed component field
#[derive(Debug, Clone)]
pub struct TracingLogger {
    component: &'static str,
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new("cloudconf")
    }
}

impl TracingLogger {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Debug => tracing::debug!(component = self.component, "{}", message),
            Level::Info => tracing::info!(component = self.component, "{}", message),
            Level::Warn => tracing::warn!(component = self.component, "{}", message),
            Level::Error => tracing::error!(component = self.component, "{}", message),
        }
    }

    fn enabled(&self, level: Level) -> bool {
        match level {
            Level::Debug => tracing::enabled!(tracing::Level::DEBUG),
            Level::Info => tracing::enabled!(tracing::Level::INFO),
            Level::Warn => tracing::enabled!(tracing::Level::WARN),
            Level::Error => tracing::enabled!(tracing::Level::ERROR),
        }
    }
}
