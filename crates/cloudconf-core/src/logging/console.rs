//! Console logger

use super::traits::{Level, Logger};

/// Writes `prefix LEVEL: message` lines; info goes to stdout, the rest to stderr
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    prefix: String,
    min_level: Level,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::with_prefix("[cloudconf]")
    }
}

impl ConsoleLogger {
    /// Logger with the default prefix that drops debug messages
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            min_level: Level::Info,
        }
    }

    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    fn line(&self, level: Level, message: &str) -> String {
        format!("{} {}: {}", self.prefix, level, message)
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, level: Level, message: &str) {
        if !self.enabled(level) {
            return;
        }
        match level {
            Level::Info => println!("{}", self.line(level, message)),
            _ => eprintln!("{}", self.line(level, message)),
        }
    }

    fn enabled(&self, level: Level) -> bool {
        level >= self.min_level
    }
}
