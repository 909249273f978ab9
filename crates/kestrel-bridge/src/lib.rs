//! Kestrel bridge core.
//!
//! Connects a host application's native capabilities to a sandboxed
//! script runtime: assembles the module registry, constructs a script
//! executor behind a factory, establishes the lifecycle callback
//! contract, and loads serialized bundles in a strict, crash-safe order.
//!
//! The concrete script engine, the asset reader, and the UI layer are
//! collaborators specified only at their trait boundaries here.

pub mod builder;
pub mod bundle;
pub mod error;
pub mod executor;
pub mod instance;
pub mod lifecycle;
pub mod logging;
pub mod module;
pub mod queue;
pub mod source;

pub use builder::InstanceBuilder;
pub use bundle::BundleInfo;
pub use error::BridgeError;
pub use executor::{
    BackendConstructor, BackendExecutorFactory, ExecutorDelegate, ExecutorFactory, ExecutorLogger,
    LoadMode, ScriptExecutor,
};
pub use instance::{BridgeState, ErrorHandler, Instance};
pub use lifecycle::{InstanceCallback, NoopInstanceCallback};
pub use logging::{default_log_sink, set_default_log_sink, LogSink, NoopLogSink, StderrLogSink};
pub use module::{ModuleProvider, ModuleRegistry, ModuleSpec, NativeModule, NativeModuleAdapter};
pub use queue::{InlineQueue, MessageQueue, QueueTask, WorkerQueue};
pub use source::{is_file_path, resolve, AssetError, AssetStore, ScriptBuffer};
