//! Native modules, adapters, and the module registry.
//!
//! The embedding application supplies `(name, provider, queue)` triples.
//! Each triple becomes one [`NativeModuleAdapter`]; the adapters live in
//! a [`ModuleRegistry`] whose insertion order is the dispatch identifier
//! exposed to script code. Method dispatch itself happens above this
//! layer — the registry only guarantees stable identity and ordering.

use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::{Arc, Weak};

use crate::error::BridgeError;
use crate::instance::Instance;
use crate::queue::MessageQueue;

/// A host capability callable from script code.
pub trait NativeModule: Send + Sync {
    /// Invoke one method on the capability.
    fn call(&self, method: &str, args: &[Value]) -> Result<Value, String>;
}

/// Factory producing the capability instance for one adapter.
///
/// Invoked at most once, lazily, on first use — constructing a module can
/// be expensive and many modules are never touched by a given session.
pub type ModuleProvider = Box<dyn Fn() -> Box<dyn NativeModule> + Send + Sync>;

/// One `(name, provider, queue)` triple from the embedding application.
pub struct ModuleSpec {
    /// Registry name; must be unique within one batch.
    pub name: String,
    /// Capability factory.
    pub provider: ModuleProvider,
    /// Queue the module's calls are serialized onto. May be shared
    /// across specs.
    pub queue: Arc<dyn MessageQueue>,
}

impl ModuleSpec {
    /// Convenience constructor for a spec triple.
    pub fn new(
        name: impl Into<String>,
        provider: ModuleProvider,
        queue: Arc<dyn MessageQueue>,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            queue,
        }
    }
}

/// Wraps one native capability so the bridge can dispatch to it.
///
/// Holds a non-owning back-reference to the [`Instance`] so the module
/// can enqueue script-side callbacks without creating a reference cycle:
/// the instance owns the registry owns the adapter.
pub struct NativeModuleAdapter {
    name: String,
    provider: ModuleProvider,
    module: OnceCell<Box<dyn NativeModule>>,
    queue: Arc<dyn MessageQueue>,
    instance: Weak<Instance>,
}

impl NativeModuleAdapter {
    fn new(spec: ModuleSpec, instance: Weak<Instance>) -> Self {
        Self {
            name: spec.name,
            provider: spec.provider,
            module: OnceCell::new(),
            queue: spec.queue,
            instance,
        }
    }

    /// Registry name of this module.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The queue this module's calls are serialized onto.
    pub fn queue(&self) -> &Arc<dyn MessageQueue> {
        &self.queue
    }

    /// The owning instance, while it is still alive.
    ///
    /// Returns `None` once the instance has been torn down; in-flight
    /// callbacks observing that must drop their work.
    pub fn instance(&self) -> Option<Arc<Instance>> {
        self.instance.upgrade()
    }

    /// Whether the underlying capability has been constructed yet.
    pub fn is_instantiated(&self) -> bool {
        self.module.get().is_some()
    }

    /// Invoke a method, constructing the capability on first use.
    ///
    /// Callers are responsible for dispatching onto [`Self::queue`];
    /// this adapter does not serialize for them.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value, String> {
        let module = self.module.get_or_init(|| (self.provider)());
        module.call(method, args)
    }
}

/// The full, ordered set of native modules for one instance.
///
/// Set membership is fixed once the registry is handed to
/// `initialize_bridge`; adapters stay internally mutable.
pub struct ModuleRegistry {
    adapters: Vec<NativeModuleAdapter>,
    by_name: FxHashMap<String, usize>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.names())
            .finish()
    }
}

impl ModuleRegistry {
    /// Assemble a registry from spec triples, preserving order.
    ///
    /// A duplicate name rejects the whole batch: accepting either copy
    /// would silently shift dispatch indices for every later module.
    pub fn from_specs(
        specs: Vec<ModuleSpec>,
        instance: Weak<Instance>,
    ) -> Result<Self, BridgeError> {
        let mut adapters = Vec::with_capacity(specs.len());
        let mut by_name = FxHashMap::default();

        for spec in specs {
            if by_name.contains_key(&spec.name) {
                return Err(BridgeError::DuplicateModuleName(spec.name));
            }
            by_name.insert(spec.name.clone(), adapters.len());
            adapters.push(NativeModuleAdapter::new(spec, instance.clone()));
        }

        Ok(Self { adapters, by_name })
    }

    /// Empty registry, for instances that expose no native capabilities.
    pub fn empty() -> Self {
        Self {
            adapters: Vec::new(),
            by_name: FxHashMap::default(),
        }
    }

    /// Number of registered modules.
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// True when no modules are registered.
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Adapter at a dispatch index.
    pub fn get(&self, index: usize) -> Option<&NativeModuleAdapter> {
        self.adapters.get(index)
    }

    /// Dispatch index and adapter for a module name.
    pub fn get_by_name(&self, name: &str) -> Option<(usize, &NativeModuleAdapter)> {
        let index = *self.by_name.get(name)?;
        Some((index, &self.adapters[index]))
    }

    /// Module names in dispatch order.
    pub fn names(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.name().to_string()).collect()
    }
}
