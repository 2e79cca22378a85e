/// Minimal logging capability the orchestrator reports progress through.
///
/// Callers embedding the library in a host with its own logging can supply
/// an implementation to [`Deployer::with_logger`](crate::Deployer::with_logger).
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to `tracing` events with target `tadata`.
///
/// Nothing is printed unless the host installs a subscriber, e.g.
/// `tracing_subscriber::fmt().init()` to log to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "tadata", "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "tadata", "{message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!(target: "tadata", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "tadata", "{message}");
    }
}
