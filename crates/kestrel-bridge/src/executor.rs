//! Script executor abstraction and backend factory.
//!
//! The bridge never talks to a script engine directly. It constructs one
//! [`ScriptExecutor`] through an [`ExecutorFactory`], bound 1:1 to the js
//! message queue, and feeds it bundles. Concrete engine bindings (V8 and
//! friends) live outside this crate; they register with the
//! [`BackendExecutorFactory`] under a tag and are selected by the opaque
//! config blob.

use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::Arc;

use crate::error::BridgeError;
use crate::logging::LogSink;
use crate::queue::MessageQueue;
use crate::source::ScriptBuffer;

/// How a bundle load is scheduled on the js queue.
///
/// Platform bundles load `Blocking` so their globals exist before
/// anything after them runs; the user bundle loads `Scheduled` so the
/// bootstrapping thread is not held for its execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// The caller blocks until the bundle's top-level code has executed.
    Blocking,
    /// The load is enqueued; the caller returns immediately.
    Scheduled,
}

/// The concrete script-engine binding that runs loaded bundles.
pub trait ScriptExecutor: Send {
    /// Execute one bundle.
    ///
    /// `bytecode_hint` names a precompiled-bytecode cache entry; empty
    /// means none. Errors are engine-level messages; the instance
    /// attaches bundle identity before propagating them.
    fn load_script(
        &mut self,
        script: ScriptBuffer,
        version: u32,
        diagnostic_name: &str,
        mode: LoadMode,
        bytecode_hint: &str,
    ) -> Result<(), String>;
}

/// What an executor may call back into while running script code.
pub trait ExecutorDelegate: Send + Sync {
    /// Registry module names, in dispatch order.
    fn module_names(&self) -> Vec<String>;

    /// A batch of script-to-native calls was flushed.
    fn on_batch_complete(&self);

    /// One more script call is in flight.
    fn increment_pending_calls(&self);

    /// One in-flight script call completed.
    fn decrement_pending_calls(&self);
}

/// Logging adapter handed to backend constructors.
///
/// Forwards `(message, severity)` pairs from the engine to the sink the
/// embedder supplied. Installing one is part of the factory contract,
/// not an optional nicety.
#[derive(Clone)]
pub struct ExecutorLogger {
    sink: Arc<dyn LogSink>,
}

impl ExecutorLogger {
    /// Wrap a sink.
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    /// Forward one engine log record.
    pub fn log(&self, message: &str, level: u32) {
        self.sink.log(message, level);
    }
}

/// Constructs the executor for one instance.
///
/// `create` consumes the factory: one factory, one executor, enforced by
/// ownership rather than a runtime flag.
pub trait ExecutorFactory: Send {
    /// Build the executor, bound to `queue`, calling back through
    /// `delegate`.
    fn create(
        self: Box<Self>,
        delegate: Arc<dyn ExecutorDelegate>,
        queue: Arc<dyn MessageQueue>,
    ) -> Result<Box<dyn ScriptExecutor>, BridgeError>;
}

/// Constructor for one backend variant.
pub type BackendConstructor = Box<
    dyn FnOnce(
            &Value,
            ExecutorLogger,
            Arc<dyn ExecutorDelegate>,
            Arc<dyn MessageQueue>,
        ) -> Result<Box<dyn ScriptExecutor>, String>
        + Send,
>;

/// Factory that selects a backend variant from the config blob.
///
/// The blob is opaque to the bridge except for its `"backend"` string
/// tag, which picks one of the registered constructors. The rest of the
/// blob is passed through for the backend to interpret.
pub struct BackendExecutorFactory {
    config: Value,
    log_sink: Arc<dyn LogSink>,
    backends: FxHashMap<String, BackendConstructor>,
}

impl BackendExecutorFactory {
    /// Create a factory over a config blob and a log sink.
    pub fn new(config: Value, log_sink: Arc<dyn LogSink>) -> Self {
        Self {
            config,
            log_sink,
            backends: FxHashMap::default(),
        }
    }

    /// Register a backend constructor under its config tag.
    pub fn with_backend(mut self, tag: impl Into<String>, ctor: BackendConstructor) -> Self {
        self.backends.insert(tag.into(), ctor);
        self
    }
}

impl ExecutorFactory for BackendExecutorFactory {
    fn create(
        self: Box<Self>,
        delegate: Arc<dyn ExecutorDelegate>,
        queue: Arc<dyn MessageQueue>,
    ) -> Result<Box<dyn ScriptExecutor>, BridgeError> {
        let factory = *self;

        let tag = factory
            .config
            .get("backend")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                BridgeError::BackendConstructionFailed(
                    "config blob has no \"backend\" tag".to_string(),
                )
            })?
            .to_string();

        let mut backends = factory.backends;
        let ctor = backends.remove(&tag).ok_or_else(|| {
            BridgeError::BackendConstructionFailed(format!(
                "no backend registered for tag '{tag}'"
            ))
        })?;

        let logger = ExecutorLogger::new(factory.log_sink.clone());
        ctor(&factory.config, logger, delegate, queue)
            .map_err(BridgeError::BackendConstructionFailed)
    }
}
