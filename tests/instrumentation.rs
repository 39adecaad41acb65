//! Registry-driven instrumentation: path resolution, wrapper installation,
//! chain dispatch, and the fail-open setup policy.

use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use faultline::{
    prelude::*,
    registry::{AttachError, InstrumentError, LocateError},
};

#[derive(Default)]
struct Recorder {
    records: Mutex<Vec<ErrorRecord>>,
}

impl Recorder {
    fn records(&self) -> Vec<ErrorRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl Transaction for Recorder {
    fn record_error(&self, record: ErrorRecord) {
        self.records.lock().unwrap().push(record);
    }
}

/// A target that counts invocations and raises the kind passed in its
/// arguments, if any.
struct CountingTarget {
    calls: &'static AtomicUsize,
}

impl TargetCallable for CountingTarget {
    fn invoke(&self, _cx: CallContext<'_>, args: CallArgs) -> Result<CallValue, Fault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let kind: Option<&'static str> = *args.downcast().unwrap();
        match kind {
            None => Ok(Box::new("ok") as CallValue),
            Some(kind) => Err(Fault::new(kind, "boom")),
        }
    }
}

fn counting_registry(calls: &'static AtomicUsize) -> (Registry, TargetPath) {
    let registry = Registry::new();
    registry.register("app.handlers", "process", CountingTarget { calls });
    (registry, TargetPath::function("app.handlers", "process"))
}

fn succeed() -> CallArgs {
    Box::new(None::<&'static str>)
}

fn raise(kind: &'static str) -> CallArgs {
    Box::new(Some(kind))
}

/// A target that always raises a fixed fault.
struct FailingTarget {
    fault: Fault,
}

impl TargetCallable for FailingTarget {
    fn invoke(&self, _cx: CallContext<'_>, _args: CallArgs) -> Result<CallValue, Fault> {
        Err(self.fault.clone())
    }
}

fn double(_cx: CallContext<'_>, args: CallArgs) -> Result<CallValue, Fault> {
    let n: i32 = *args
        .downcast()
        .map_err(|_| Fault::new("TypeError", "expected i32"))?;
    Ok(Box::new(n * 2) as CallValue)
}

#[test]
fn locate_returns_the_original_triple() {
    let registry = Registry::new();
    registry.register("app.math", "double", double);

    let path = TargetPath::function("app.math", "double");
    let located = registry.locate(&path).unwrap();
    assert_eq!(located.container(), "app.math");
    assert_eq!(located.attribute(), "double");

    // The original stays independently invokable.
    let value = located
        .callable()
        .invoke(CallContext::none(), Box::new(4_i32))
        .unwrap();
    assert_eq!(*value.downcast::<i32>().unwrap(), 8);
}

#[test]
fn locate_distinguishes_missing_from_non_callable() {
    let registry = Registry::new();
    registry.register("app.math", "double", double);
    registry.register_value("app.math", "PRECISION", 6_u32);

    let missing_container = TargetPath::function("app.missing", "double");
    assert_eq!(
        registry.locate(&missing_container),
        Err(LocateError::NotFound {
            path: missing_container.clone()
        })
    );

    let missing_attribute = TargetPath::function("app.math", "triple");
    assert_eq!(
        registry.locate(&missing_attribute),
        Err(LocateError::NotFound {
            path: missing_attribute.clone()
        })
    );

    let data = TargetPath::function("app.math", "PRECISION");
    assert_eq!(
        registry.locate(&data),
        Err(LocateError::NotCallable { path: data.clone() })
    );
}

#[test]
fn install_returns_a_handle_to_the_original() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    let (registry, path) = counting_registry(&CALLS);
    let recorder = Recorder::default();
    let cx = CallContext::with_transaction(&recorder);

    let original = registry
        .install(&path, ["KeyError"].into_iter().collect())
        .unwrap();

    // Invoking the handle bypasses the installed stage entirely.
    original.invoke(cx, raise("ValueError")).unwrap_err();
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    assert!(recorder.records().is_empty());
}

#[test]
fn repeated_installation_extends_the_chain() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    let (registry, path) = counting_registry(&CALLS);

    assert_eq!(registry.stage_count(&path), 0);
    registry.instrument(&path, IgnoreList::new()).unwrap();
    registry.instrument(&path, IgnoreList::new()).unwrap();
    assert_eq!(registry.stage_count(&path), 2);

    // The chain stays intact and the original still runs exactly once.
    let value = registry
        .dispatch(&path)
        .unwrap()
        .call(CallContext::none(), succeed())
        .unwrap();
    assert_eq!(*value.downcast::<&'static str>().unwrap(), "ok");
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);

    let located = registry.locate(&path).unwrap();
    located.callable().invoke(CallContext::none(), succeed()).unwrap();
    assert_eq!(CALLS.load(Ordering::SeqCst), 2);
}

#[test]
fn each_stage_reports_once_and_the_original_runs_once() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    let (registry, path) = counting_registry(&CALLS);
    let recorder = Recorder::default();
    let cx = CallContext::with_transaction(&recorder);

    registry.instrument(&path, IgnoreList::new()).unwrap();
    registry.instrument(&path, IgnoreList::new()).unwrap();
    registry.instrument(&path, IgnoreList::new()).unwrap();

    let dispatch = registry.dispatch(&path).unwrap();
    assert_eq!(dispatch.stage_count(), 3);

    let fault = dispatch.call(cx, raise("ValueError")).unwrap_err();
    assert_eq!(fault, Fault::new("ValueError", "boom"));
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.records().len(), 3);
    for record in recorder.records() {
        assert_eq!(record.kind().as_str(), "ValueError");
    }
}

#[test]
fn stage_ignore_lists_are_independent() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    let (registry, path) = counting_registry(&CALLS);
    let recorder = Recorder::default();
    let cx = CallContext::with_transaction(&recorder);

    // Inner stage ignores KeyError; outer stage ignores nothing.
    registry
        .instrument(&path, ["KeyError"].into_iter().collect())
        .unwrap();
    registry.instrument(&path, IgnoreList::new()).unwrap();

    registry
        .dispatch(&path)
        .unwrap()
        .call(cx, raise("KeyError"))
        .unwrap_err();
    assert_eq!(recorder.records().len(), 1);

    registry
        .dispatch(&path)
        .unwrap()
        .call(cx, raise("ValueError"))
        .unwrap_err();
    assert_eq!(recorder.records().len(), 3);
}

#[test]
fn suppressed_kinds_still_propagate_through_the_chain() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    let (registry, path) = counting_registry(&CALLS);
    let recorder = Recorder::default();
    let cx = CallContext::with_transaction(&recorder);

    registry
        .instrument(&path, ["KeyError"].into_iter().collect())
        .unwrap();

    let fault = registry
        .dispatch(&path)
        .unwrap()
        .call(cx, raise("KeyError"))
        .unwrap_err();
    assert_eq!(fault, Fault::new("KeyError", "boom"));
    assert!(recorder.records().is_empty());
}

#[test]
fn dispatch_without_a_transaction_is_transparent() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    let (registry, path) = counting_registry(&CALLS);

    registry.instrument(&path, IgnoreList::new()).unwrap();

    let fault = registry
        .dispatch(&path)
        .unwrap()
        .call(CallContext::none(), raise("ValueError"))
        .unwrap_err();
    assert_eq!(fault, Fault::new("ValueError", "boom"));
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
}

#[test]
fn sealed_containers_reject_installation() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    let (registry, path) = counting_registry(&CALLS);
    registry.seal("app.handlers");

    let error = registry.install(&path, IgnoreList::new()).unwrap_err();
    assert_eq!(
        error,
        AttachError::Sealed {
            container: "app.handlers".into(),
            attribute: "process".into(),
        }
    );
    assert!(matches!(
        registry.instrument(&path, IgnoreList::new()),
        Err(InstrumentError::Attach(AttachError::Sealed { .. }))
    ));

    // Fail open: the target stays reachable and uninstrumented.
    assert!(!registry.instrument_or_skip(&path, IgnoreList::new()));
    assert_eq!(registry.stage_count(&path), 0);
    registry
        .dispatch(&path)
        .unwrap()
        .call(CallContext::none(), succeed())
        .unwrap();
}

#[test]
fn instrumentation_fails_open_on_bad_paths() {
    let registry = Registry::new();
    registry.register("app.math", "double", double);
    registry.register_value("app.math", "PRECISION", 6_u32);

    let missing = TargetPath::function("app.math", "triple");
    assert!(matches!(
        registry.instrument(&missing, IgnoreList::new()),
        Err(InstrumentError::Locate(LocateError::NotFound { .. }))
    ));
    assert!(!registry.instrument_or_skip(&missing, IgnoreList::new()));

    let data = TargetPath::function("app.math", "PRECISION");
    assert!(matches!(
        registry.instrument(&data, IgnoreList::new()),
        Err(InstrumentError::Locate(LocateError::NotCallable { .. }))
    ));
    assert!(!registry.instrument_or_skip(&data, IgnoreList::new()));

    let good = TargetPath::function("app.math", "double");
    assert!(registry.instrument_or_skip(&good, IgnoreList::new()));
    assert_eq!(registry.stage_count(&good), 1);
}

#[test]
fn faults_with_traces_pass_through_unaltered() {
    let registry = Registry::new();
    let trace: FaultTrace = [TraceFrame::with_location("worker", "src/jobs.rs", 33)]
        .into_iter()
        .collect();
    let expected = Fault::new("IoError", "connection reset").with_trace(trace);
    registry.register(
        "app.jobs",
        "run",
        FailingTarget {
            fault: expected.clone(),
        },
    );
    let path = TargetPath::function("app.jobs", "run");
    registry.instrument(&path, IgnoreList::new()).unwrap();

    let recorder = Recorder::default();
    let cx = CallContext::with_transaction(&recorder);
    let fault = registry
        .dispatch(&path)
        .unwrap()
        .call(cx, Box::new(()))
        .unwrap_err();

    assert_eq!(fault, expected);
    let records = recorder.records();
    assert!(records[0].stack_trace().contains("0: worker"));
    assert!(records[0].stack_trace().contains("at src/jobs.rs:33"));
}
