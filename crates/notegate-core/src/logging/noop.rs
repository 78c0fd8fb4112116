//! No-op logger implementation

use std::sync::Arc;

use super::traits::{LogLevel, Logger, SharedLogger};

/// A logger that does nothing
///
/// Default for library callers that do not care about gateway logs, and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl NoOpLogger {
    /// Create a new no-op logger
    pub fn new() -> Self {
        Self
    }

    /// Shared handle, ready to pass to adapters
    pub fn shared() -> SharedLogger {
        Arc::new(Self)
    }
}

impl Logger for NoOpLogger {
    fn log(&self, _level: LogLevel, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_logger() {
        let logger = NoOpLogger::shared();
        logger.debug("debug message");
        logger.error("error message");
    }
}
