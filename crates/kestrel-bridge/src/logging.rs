//! Script-side log forwarding.
//!
//! Executor backends emit `(message, severity)` pairs; the bridge forwards
//! them to a sink supplied at construction time. A process-wide default
//! sink exists only as a convenience for embedders that do not care to
//! thread one through — construction never requires it.

use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Destination for script-side log output.
///
/// Calls are fire-and-forget: implementations must not panic back into
/// the bridge.
pub trait LogSink: Send + Sync {
    /// Deliver one log record. `level` is the backend's severity integer.
    fn log(&self, message: &str, level: u32);
}

/// Sink that discards everything.
pub struct NoopLogSink;

impl LogSink for NoopLogSink {
    fn log(&self, _message: &str, _level: u32) {}
}

/// Sink that writes to stderr, for embedders without their own plumbing.
pub struct StderrLogSink;

impl LogSink for StderrLogSink {
    fn log(&self, message: &str, level: u32) {
        eprintln!("[script:{}] {}", level, message);
    }
}

static DEFAULT_SINK: OnceCell<Arc<dyn LogSink>> = OnceCell::new();

/// Install the process-wide default sink. Later calls are ignored; the
/// first installation wins.
pub fn set_default_log_sink(sink: Arc<dyn LogSink>) {
    let _ = DEFAULT_SINK.set(sink);
}

/// The process-wide default sink (a no-op until one is installed).
pub fn default_log_sink() -> Arc<dyn LogSink> {
    DEFAULT_SINK
        .get_or_init(|| Arc::new(NoopLogSink))
        .clone()
}
