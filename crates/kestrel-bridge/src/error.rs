//! Bridge error types.

/// Errors that can occur during bridge construction or script loading.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The executor backend could not be constructed. Fatal: the caller
    /// must abort instance creation.
    #[error("Backend construction failed: {0}")]
    BackendConstructionFailed(String),

    /// Programmer error: an operation was issued against an instance in
    /// the wrong state (e.g. re-initialization).
    #[error("Invalid bridge state: {operation} requires {expected}, instance is {actual}")]
    InvalidState {
        /// The operation that was attempted
        operation: &'static str,
        /// The state the operation requires
        expected: &'static str,
        /// The state the instance was actually in
        actual: &'static str,
    },

    /// Two module specs in one batch share a name.
    #[error("Native module '{0}' is already registered")]
    DuplicateModuleName(String),

    /// A bundle location could not be resolved to script bytes.
    #[error("Script not found: '{location}'")]
    ScriptNotFound {
        /// The location that failed to resolve
        location: String,
    },

    /// The executor reported a failure while loading a bundle.
    #[error("Script execution failed for bundle #{index} ('{location}'): {message}")]
    ScriptExecution {
        /// Position of the failing bundle in the load sequence
        index: usize,
        /// Source location of the failing bundle
        location: String,
        /// Executor-reported failure detail
        message: String,
    },

    /// File I/O error outside the not-found path.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}
