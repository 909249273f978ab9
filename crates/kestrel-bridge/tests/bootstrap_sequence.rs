//! Integration tests for the instance bootstrap sequence.
//!
//! Exercises the full path: registry assembly, bridge initialization,
//! and the strict platform-bundles-then-user-bundle loading order, with
//! a recording executor standing in for the script engine.

use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

use kestrel_bridge::{
    AssetError, AssetStore, BackendExecutorFactory, BridgeError, BridgeState, BundleInfo,
    ExecutorFactory, InlineQueue, InstanceBuilder, LoadMode, MessageQueue, ModuleSpec,
    NativeModule, NoopLogSink, ScriptBuffer, ScriptExecutor, WorkerQueue,
};

/// One observed executor load call.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LoadRecord {
    name: String,
    version: u32,
    mode: LoadMode,
    bytes: Vec<u8>,
    hint: String,
}

struct RecordingExecutor {
    records: Arc<Mutex<Vec<LoadRecord>>>,
    fail_on: Option<String>,
}

impl ScriptExecutor for RecordingExecutor {
    fn load_script(
        &mut self,
        script: ScriptBuffer,
        version: u32,
        diagnostic_name: &str,
        mode: LoadMode,
        bytecode_hint: &str,
    ) -> Result<(), String> {
        if self.fail_on.as_deref() == Some(diagnostic_name) {
            return Err(format!("injected failure for {diagnostic_name}"));
        }
        self.records.lock().push(LoadRecord {
            name: diagnostic_name.to_string(),
            version,
            mode,
            bytes: script.bytes().to_vec(),
            hint: bytecode_hint.to_string(),
        });
        Ok(())
    }
}

fn recording_factory(
    records: Arc<Mutex<Vec<LoadRecord>>>,
    fail_on: Option<&str>,
) -> Box<dyn ExecutorFactory> {
    let fail_on = fail_on.map(str::to_string);
    Box::new(
        BackendExecutorFactory::new(json!({"backend": "recording"}), Arc::new(NoopLogSink))
            .with_backend(
                "recording",
                Box::new(move |_, _, _, _| {
                    Ok(Box::new(RecordingExecutor { records, fail_on })
                        as Box<dyn ScriptExecutor>)
                }),
            ),
    )
}

struct MapStore(Vec<(&'static str, Vec<u8>)>);

impl AssetStore for MapStore {
    fn load(&self, location: &str) -> Result<ScriptBuffer, AssetError> {
        self.0
            .iter()
            .find(|(name, _)| *name == location)
            .map(|(name, bytes)| ScriptBuffer::new(bytes.clone(), *name))
            .ok_or_else(|| AssetError::NotFound(location.to_string()))
    }
}

struct EchoModule;

impl NativeModule for EchoModule {
    fn call(&self, method: &str, _args: &[serde_json::Value]) -> Result<serde_json::Value, String> {
        Ok(serde_json::Value::String(method.to_string()))
    }
}

fn module(name: &str) -> ModuleSpec {
    ModuleSpec::new(
        name,
        Box::new(|| Box::new(EchoModule) as Box<dyn NativeModule>),
        Arc::new(InlineQueue),
    )
}

#[test]
fn test_absent_platform_bundle_is_skipped() {
    let records = Arc::new(Mutex::new(Vec::new()));
    let store = Arc::new(MapStore(vec![
        ("assets/a.js", b"platform a".to_vec()),
        ("assets/main.js", b"user".to_vec()),
    ]));

    let instance = InstanceBuilder::new(
        store,
        "assets/main.js",
        Arc::new(InlineQueue),
        recording_factory(records.clone(), None),
    )
    .platform_bundles([BundleInfo::new("", 1), BundleInfo::new("assets/a.js", 2)])
    .build()
    .unwrap();

    assert_eq!(instance.state(), BridgeState::Ready);

    let records = records.lock();
    assert_eq!(records.len(), 2, "B1 must be skipped, not loaded");
    assert_eq!(records[0].name, "assets/a.js");
    assert_eq!(records[0].version, 2);
    assert_eq!(records[0].mode, LoadMode::Blocking);
    assert_eq!(records[0].hint, "");
    assert_eq!(records[1].name, "assets/main.js");
    assert_eq!(records[1].version, 0);
    assert_eq!(records[1].mode, LoadMode::Scheduled);
}

#[test]
fn test_platform_resolution_failure_aborts_user_bundle() {
    let records = Arc::new(Mutex::new(Vec::new()));
    // "assets/a.js" is deliberately missing.
    let store = Arc::new(MapStore(vec![("assets/main.js", b"user".to_vec())]));

    let err = InstanceBuilder::new(
        store,
        "assets/main.js",
        Arc::new(InlineQueue),
        recording_factory(records.clone(), None),
    )
    .platform_bundle(BundleInfo::new("assets/a.js", 2))
    .build()
    .unwrap_err();

    match err {
        BridgeError::ScriptNotFound { location } => assert_eq!(location, "assets/a.js"),
        other => panic!("expected ScriptNotFound, got {other}"),
    }
    assert!(
        records.lock().is_empty(),
        "the user bundle must never load after a platform failure"
    );
}

#[test]
fn test_platform_execution_failure_carries_bundle_identity() {
    let records = Arc::new(Mutex::new(Vec::new()));
    let store = Arc::new(MapStore(vec![
        ("assets/a.js", b"ok".to_vec()),
        ("assets/b.js", b"boom".to_vec()),
        ("assets/main.js", b"user".to_vec()),
    ]));

    let err = InstanceBuilder::new(
        store,
        "assets/main.js",
        Arc::new(InlineQueue),
        recording_factory(records.clone(), Some("assets/b.js")),
    )
    .platform_bundles([
        BundleInfo::new("assets/a.js", 1),
        BundleInfo::new("assets/b.js", 2),
    ])
    .build()
    .unwrap_err();

    match err {
        BridgeError::ScriptExecution {
            index, location, ..
        } => {
            assert_eq!(index, 1);
            assert_eq!(location, "assets/b.js");
        }
        other => panic!("expected ScriptExecution, got {other}"),
    }

    let records = records.lock();
    assert_eq!(records.len(), 1, "only the first platform bundle loaded");
    assert_eq!(records[0].name, "assets/a.js");
}

#[test]
fn test_zero_platform_bundles_loads_exactly_the_user_bundle() {
    let records = Arc::new(Mutex::new(Vec::new()));
    let store = Arc::new(MapStore(vec![("assets/main.js", b"user".to_vec())]));

    let instance = InstanceBuilder::new(
        store,
        "assets/main.js",
        Arc::new(InlineQueue),
        recording_factory(records.clone(), None),
    )
    .build()
    .unwrap();

    assert_eq!(instance.state(), BridgeState::Ready);
    let records = records.lock();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].version, 0);
    assert_eq!(records[0].mode, LoadMode::Scheduled);
    assert_eq!(records[0].bytes, b"user");
}

#[test]
fn test_duplicate_module_names_reject_the_build() {
    let records = Arc::new(Mutex::new(Vec::new()));
    let store = Arc::new(MapStore(vec![("assets/main.js", b"user".to_vec())]));

    let err = InstanceBuilder::new(
        store,
        "assets/main.js",
        Arc::new(InlineQueue),
        recording_factory(records.clone(), None),
    )
    .native_module(module("Net"))
    .native_module(module("Net"))
    .native_module(module("Storage"))
    .build()
    .unwrap_err();

    assert!(matches!(err, BridgeError::DuplicateModuleName(name) if name == "Net"));
    assert!(records.lock().is_empty(), "nothing loads on a rejected batch");
}

#[test]
fn test_registry_is_exposed_in_dispatch_order() {
    let records = Arc::new(Mutex::new(Vec::new()));
    let store = Arc::new(MapStore(vec![("assets/main.js", b"user".to_vec())]));

    let instance = InstanceBuilder::new(
        store,
        "assets/main.js",
        Arc::new(InlineQueue),
        recording_factory(records, None),
    )
    .native_module(module("Net"))
    .native_module(module("Storage"))
    .build()
    .unwrap();

    assert_eq!(instance.module_names(), vec!["Net", "Storage"]);
    let registry = instance.registry().unwrap();
    assert_eq!(registry.get_by_name("Storage").unwrap().0, 1);
    // Adapters can reach back to their (still live) instance.
    assert!(registry.get(0).unwrap().instance().is_some());
}

#[test]
fn test_scheduled_user_bundle_failure_reports_and_fails_instance() {
    let records = Arc::new(Mutex::new(Vec::new()));
    let store = Arc::new(MapStore(vec![("assets/main.js", b"user".to_vec())]));
    let reported: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let handler_reported = reported.clone();

    let instance = InstanceBuilder::new(
        store,
        "assets/main.js",
        Arc::new(InlineQueue),
        recording_factory(records, Some("assets/main.js")),
    )
    .error_handler(Arc::new(move |err| {
        handler_reported.lock().push(err.to_string());
    }))
    .build()
    .unwrap();

    // The scheduled load ran inline and failed: the handler saw it and
    // the instance is terminally failed, but build itself succeeded.
    assert_eq!(instance.state(), BridgeState::Failed);
    let reported = reported.lock();
    assert_eq!(reported.len(), 1);
    assert!(reported[0].contains("assets/main.js"));
}

#[test]
fn test_bootstrap_over_a_worker_queue() {
    let records = Arc::new(Mutex::new(Vec::new()));
    let store = Arc::new(MapStore(vec![
        ("assets/a.js", b"platform".to_vec()),
        ("assets/main.js", b"user".to_vec()),
    ]));
    let queue = Arc::new(WorkerQueue::new("js"));

    let instance = InstanceBuilder::new(
        store,
        "assets/main.js",
        queue.clone(),
        recording_factory(records.clone(), None),
    )
    .platform_bundle(BundleInfo::new("assets/a.js", 7))
    .build()
    .unwrap();

    assert_eq!(instance.state(), BridgeState::Ready);

    // Barrier: the scheduled user load is serialized behind everything
    // already posted to the queue.
    queue.run_sync(Box::new(|| {}));

    let records = records.lock();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "assets/a.js");
    assert_eq!(records[1].name, "assets/main.js");
}
