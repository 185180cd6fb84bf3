//! Pluggable logging
//!
//! Repositories, the composite resolver and the client take a [`SharedLogger`]
//! so the host decides where diagnostics go. Use the `log_*!` macros to skip
//! message formatting when a level is disabled.

mod console;
mod noop;
mod tracing_logger;
mod traits;

pub use console::ConsoleLogger;
pub use noop::{noop_logger, NoOpLogger};
pub use tracing_logger::TracingLogger;
pub use traits::{Level, Logger, SharedLogger};
