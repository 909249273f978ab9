//! Instance lifecycle callbacks.
//!
//! The bridge invokes these around script turns so the embedder can track
//! batch boundaries and outstanding script calls (e.g. to drive a busy
//! indicator or an idle detector).

/// Capability set invoked by the bridge around script execution.
pub trait InstanceCallback: Send + Sync {
    /// A batch of script-to-native calls has been flushed.
    fn on_batch_complete(&self);

    /// One more script call is in flight.
    fn increment_pending_calls(&self);

    /// One in-flight script call has completed.
    fn decrement_pending_calls(&self);
}

/// Callback that ignores every notification.
///
/// Embedders that do not need batch or pending-call accounting construct
/// instances with this and write no boilerplate.
pub struct NoopInstanceCallback;

impl InstanceCallback for NoopInstanceCallback {
    fn on_batch_complete(&self) {}
    fn increment_pending_calls(&self) {}
    fn decrement_pending_calls(&self) {}
}
