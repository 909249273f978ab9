//! The bridge instance.
//!
//! An [`Instance`] owns the module registry, the script executor, and the
//! lifecycle callback for one script runtime. It is shared via `Arc`
//! because native-module callbacks may outlive the scope that built it;
//! everything it owns is torn down together when the last reference
//! drops.

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

use crate::error::BridgeError;
use crate::executor::{ExecutorDelegate, ExecutorFactory, LoadMode, ScriptExecutor};
use crate::lifecycle::InstanceCallback;
use crate::logging::default_log_sink;
use crate::module::ModuleRegistry;
use crate::queue::MessageQueue;
use crate::source::ScriptBuffer;

/// Bridge lifecycle states.
///
/// `Failed` is terminal and reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Constructed, bridge not yet initialized.
    Uninitialized,
    /// Registry and executor installed, no scripts loaded.
    Initialized,
    /// Platform bundles are loading, in list order.
    PlatformBundlesLoading,
    /// Platform bundles done; the user bundle load is in flight.
    UserBundleLoading,
    /// The full loading sequence completed.
    Ready,
    /// A construction or load step failed; the instance must be
    /// discarded.
    Failed,
}

impl BridgeState {
    fn name(self) -> &'static str {
        match self {
            BridgeState::Uninitialized => "uninitialized",
            BridgeState::Initialized => "initialized",
            BridgeState::PlatformBundlesLoading => "platform-bundles-loading",
            BridgeState::UserBundleLoading => "user-bundle-loading",
            BridgeState::Ready => "ready",
            BridgeState::Failed => "failed",
        }
    }
}

/// Handler invoked when a scheduled load fails after the bootstrap call
/// has already returned.
pub type ErrorHandler = Arc<dyn Fn(&BridgeError) + Send + Sync>;

/// The parts installed by `initialize_bridge`, torn down together.
struct Bridge {
    registry: ModuleRegistry,
    executor: Arc<Mutex<Box<dyn ScriptExecutor>>>,
    queue: Arc<dyn MessageQueue>,
    callback: Arc<dyn InstanceCallback>,
    error_handler: Option<ErrorHandler>,
}

/// Top-level owner connecting native modules to a script runtime.
pub struct Instance {
    state: Mutex<BridgeState>,
    bridge: OnceCell<Bridge>,
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("state", &self.state())
            .field("modules", &self.module_names())
            .finish_non_exhaustive()
    }
}

impl Instance {
    /// Create an uninitialized instance.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(BridgeState::Uninitialized),
            bridge: OnceCell::new(),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BridgeState {
        *self.state.lock()
    }

    /// Install the bridge: registry, executor, callback, js queue.
    ///
    /// Callable exactly once, from the `Uninitialized` state. A second
    /// call fails with `InvalidState` and leaves the first
    /// initialization's registry and executor intact. The factory is
    /// consumed; executor construction failure is fatal and marks the
    /// instance `Failed`.
    pub fn initialize_bridge(
        self: &Arc<Self>,
        callback: Box<dyn InstanceCallback>,
        error_handler: Option<ErrorHandler>,
        executor_factory: Box<dyn ExecutorFactory>,
        js_queue: Arc<dyn MessageQueue>,
        registry: ModuleRegistry,
    ) -> Result<(), BridgeError> {
        let mut state = self.state.lock();
        if *state != BridgeState::Uninitialized {
            return Err(BridgeError::InvalidState {
                operation: "initialize_bridge",
                expected: "uninitialized",
                actual: state.name(),
            });
        }

        let delegate = Arc::new(BridgeDelegate {
            instance: Arc::downgrade(self),
        });
        let executor = match executor_factory.create(delegate, js_queue.clone()) {
            Ok(executor) => executor,
            Err(err) => {
                *state = BridgeState::Failed;
                return Err(err);
            }
        };

        let bridge = Bridge {
            registry,
            executor: Arc::new(Mutex::new(executor)),
            queue: js_queue,
            callback: Arc::from(callback),
            error_handler,
        };
        // The state lock is held and state is Uninitialized, so the cell
        // cannot already be set.
        let _ = self.bridge.set(bridge);
        *state = BridgeState::Initialized;
        Ok(())
    }

    /// Load one bundle into the executor.
    ///
    /// `sequence_index` is the bundle's position in the overall loading
    /// sequence, carried into any failure for diagnostics. `Blocking`
    /// runs the load on the js queue and holds the caller until the
    /// bundle's top-level code has executed; `Scheduled` enqueues the
    /// load and returns, reporting any later failure through the error
    /// handler (or the default log sink) and marking the instance
    /// `Failed`.
    pub fn load_script(
        self: &Arc<Self>,
        script: ScriptBuffer,
        version: u32,
        diagnostic_name: &str,
        mode: LoadMode,
        bytecode_hint: &str,
        sequence_index: usize,
    ) -> Result<(), BridgeError> {
        let bridge = self.bridge.get().ok_or(BridgeError::InvalidState {
            operation: "load_script",
            expected: "initialized",
            actual: "uninitialized",
        })?;

        match mode {
            LoadMode::Blocking => {
                let executor = bridge.executor.clone();
                let name = diagnostic_name.to_string();
                let hint = bytecode_hint.to_string();
                let slot: Arc<Mutex<Option<Result<(), String>>>> = Arc::new(Mutex::new(None));
                let task_slot = slot.clone();

                bridge.queue.run_sync(Box::new(move || {
                    let result =
                        executor
                            .lock()
                            .load_script(script, version, &name, LoadMode::Blocking, &hint);
                    *task_slot.lock() = Some(result);
                }));

                let outcome = slot.lock().take();
                match outcome {
                    Some(Ok(())) => Ok(()),
                    Some(Err(message)) => Err(BridgeError::ScriptExecution {
                        index: sequence_index,
                        location: diagnostic_name.to_string(),
                        message,
                    }),
                    // The queue dropped the task (teardown race); treat
                    // as an execution failure rather than false success.
                    None => Err(BridgeError::ScriptExecution {
                        index: sequence_index,
                        location: diagnostic_name.to_string(),
                        message: "load task was dropped by the queue".to_string(),
                    }),
                }
            }
            LoadMode::Scheduled => {
                let executor = bridge.executor.clone();
                let error_handler = bridge.error_handler.clone();
                let instance = Arc::downgrade(self);
                let name = diagnostic_name.to_string();
                let hint = bytecode_hint.to_string();

                bridge.queue.run(Box::new(move || {
                    let result =
                        executor
                            .lock()
                            .load_script(script, version, &name, LoadMode::Scheduled, &hint);
                    if let Err(message) = result {
                        let err = BridgeError::ScriptExecution {
                            index: sequence_index,
                            location: name.clone(),
                            message,
                        };
                        if let Some(instance) = instance.upgrade() {
                            instance.mark_failed();
                        }
                        match &error_handler {
                            Some(handler) => handler(&err),
                            None => default_log_sink().log(&err.to_string(), 0),
                        }
                    }
                }));
                Ok(())
            }
        }
    }

    /// Module names in dispatch order (empty before initialization).
    pub fn module_names(&self) -> Vec<String> {
        self.bridge
            .get()
            .map(|b| b.registry.names())
            .unwrap_or_default()
    }

    /// The module registry, once the bridge is initialized.
    pub fn registry(&self) -> Option<&ModuleRegistry> {
        self.bridge.get().map(|b| &b.registry)
    }

    /// Drive the state machine one step. The expected-state check keeps
    /// an already-`Failed` instance terminal.
    pub(crate) fn transition(&self, from: &[BridgeState], to: BridgeState) -> bool {
        let mut state = self.state.lock();
        if from.contains(&*state) {
            *state = to;
            true
        } else {
            false
        }
    }

    /// Force the terminal `Failed` state (no-op if already terminal).
    pub(crate) fn mark_failed(&self) {
        let mut state = self.state.lock();
        if *state != BridgeState::Failed {
            *state = BridgeState::Failed;
        }
    }
}

/// Executor-facing view of the instance.
///
/// Holds a `Weak` back-reference: the executor is owned by the instance,
/// so an owning handle here would cycle.
struct BridgeDelegate {
    instance: Weak<Instance>,
}

impl ExecutorDelegate for BridgeDelegate {
    fn module_names(&self) -> Vec<String> {
        self.instance
            .upgrade()
            .map(|i| i.module_names())
            .unwrap_or_default()
    }

    fn on_batch_complete(&self) {
        if let Some(instance) = self.instance.upgrade() {
            if let Some(bridge) = instance.bridge.get() {
                bridge.callback.on_batch_complete();
            }
        }
    }

    fn increment_pending_calls(&self) {
        if let Some(instance) = self.instance.upgrade() {
            if let Some(bridge) = instance.bridge.get() {
                bridge.callback.increment_pending_calls();
            }
        }
    }

    fn decrement_pending_calls(&self) {
        if let Some(instance) = self.instance.upgrade() {
            if let Some(bridge) = instance.bridge.get() {
                bridge.callback.decrement_pending_calls();
            }
        }
    }
}
