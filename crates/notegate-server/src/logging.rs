//! Bridge from the core `Logger` trait into `tracing`

use notegate_core::logging::{LogLevel, Logger};

/// Forwards core log lines to the installed `tracing` subscriber under the
/// `notegate_core` target, so `RUST_LOG=notegate_core=debug` controls them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(target: "notegate_core", "{}", message),
            LogLevel::Info => tracing::info!(target: "notegate_core", "{}", message),
            LogLevel::Warn => tracing::warn!(target: "notegate_core", "{}", message),
            LogLevel::Error => tracing::error!(target: "notegate_core", "{}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_usable_as_shared_logger() {
        let logger: Arc<dyn Logger> = Arc::new(TracingLogger);
        // No subscriber installed: every level is a no-op.
        logger.debug("debug");
        logger.info("info");
        logger.warn("warn");
        logger.error("error");
    }
}
