//! Instance bootstrap.
//!
//! [`InstanceBuilder`] assembles one instance end to end: module
//! adapters, registry, bridge initialization, then the bundle loading
//! sequence. The sequence is strict:
//!
//! 1. Platform bundles, in list order, each loaded `Blocking` so its
//!    globals exist before the next bundle runs. An empty location is
//!    the absent-bundle sentinel and is skipped.
//! 2. The user bundle, loaded `Scheduled` with version 0.
//!
//! Any resolution or execution failure aborts the remaining steps,
//! marks the instance `Failed`, and propagates to the caller.

use std::sync::Arc;

use crate::bundle::BundleInfo;
use crate::error::BridgeError;
use crate::executor::{ExecutorFactory, LoadMode};
use crate::instance::{BridgeState, ErrorHandler, Instance};
use crate::lifecycle::{InstanceCallback, NoopInstanceCallback};
use crate::module::{ModuleRegistry, ModuleSpec};
use crate::queue::MessageQueue;
use crate::source::{self, AssetStore};

/// Builds and boots one bridge instance.
pub struct InstanceBuilder {
    assets: Arc<dyn AssetStore>,
    user_bundle: String,
    js_queue: Arc<dyn MessageQueue>,
    factory: Box<dyn ExecutorFactory>,
    platform_bundles: Vec<BundleInfo>,
    modules: Vec<ModuleSpec>,
    callback: Box<dyn InstanceCallback>,
    error_handler: Option<ErrorHandler>,
}

impl InstanceBuilder {
    /// Start a builder from the four required collaborators.
    pub fn new(
        assets: Arc<dyn AssetStore>,
        user_bundle: impl Into<String>,
        js_queue: Arc<dyn MessageQueue>,
        factory: Box<dyn ExecutorFactory>,
    ) -> Self {
        Self {
            assets,
            user_bundle: user_bundle.into(),
            js_queue,
            factory,
            platform_bundles: Vec::new(),
            modules: Vec::new(),
            callback: Box::new(NoopInstanceCallback),
            error_handler: None,
        }
    }

    /// Append one platform bundle. Load order equals call order.
    pub fn platform_bundle(mut self, bundle: BundleInfo) -> Self {
        self.platform_bundles.push(bundle);
        self
    }

    /// Append the whole platform-bundle list.
    pub fn platform_bundles(mut self, bundles: impl IntoIterator<Item = BundleInfo>) -> Self {
        self.platform_bundles.extend(bundles);
        self
    }

    /// Register one native module triple. Registry order equals call
    /// order.
    pub fn native_module(mut self, spec: ModuleSpec) -> Self {
        self.modules.push(spec);
        self
    }

    /// Replace the default no-op lifecycle callback.
    pub fn callback(mut self, callback: Box<dyn InstanceCallback>) -> Self {
        self.callback = callback;
        self
    }

    /// Install a handler for failures of scheduled loads.
    pub fn error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Construct the instance and run the loading sequence.
    ///
    /// On any failure the partially-built instance is dropped, never
    /// returned: the caller gets the error and nothing else.
    pub fn build(self) -> Result<Arc<Instance>, BridgeError> {
        let instance = Instance::new();

        // Adapters hold a non-owning back-reference to the instance.
        let registry = ModuleRegistry::from_specs(self.modules, Arc::downgrade(&instance))?;

        instance.initialize_bridge(
            self.callback,
            self.error_handler,
            self.factory,
            self.js_queue,
            registry,
        )?;

        instance.transition(
            &[BridgeState::Initialized],
            BridgeState::PlatformBundlesLoading,
        );

        for (index, bundle) in self.platform_bundles.iter().enumerate() {
            if bundle.is_absent() {
                continue;
            }
            let script = match source::resolve(&bundle.source_location, self.assets.as_ref()) {
                Ok(script) => script,
                Err(err) => {
                    instance.mark_failed();
                    return Err(err);
                }
            };
            if let Err(err) = instance.load_script(
                script,
                bundle.version,
                &bundle.source_location,
                LoadMode::Blocking,
                "",
                index,
            ) {
                instance.mark_failed();
                return Err(err);
            }
        }

        instance.transition(
            &[BridgeState::PlatformBundlesLoading],
            BridgeState::UserBundleLoading,
        );

        let script = match source::resolve(&self.user_bundle, self.assets.as_ref()) {
            Ok(script) => script,
            Err(err) => {
                instance.mark_failed();
                return Err(err);
            }
        };
        instance.load_script(
            script,
            0,
            &self.user_bundle,
            LoadMode::Scheduled,
            "",
            self.platform_bundles.len(),
        )?;

        // A scheduled load that already failed (inline queues) has moved
        // the state to Failed; the guarded transition leaves it there.
        instance.transition(&[BridgeState::UserBundleLoading], BridgeState::Ready);
        Ok(instance)
    }
}
