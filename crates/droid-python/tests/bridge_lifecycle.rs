//! Lifecycle tests for the bridge run sequence
//!
//! The interpreter is replaced by a recording double so every branch of a run
//! (success, init failure, import failure, script exit, interpreter error) can
//! be checked for balanced setup and teardown.

use droid_python::session::ProcessClaim;
use droid_python::{
    Bridge, BridgeError, BridgeOptions, Embedding, EntrySpec, HostInvocation, ImportError,
    InterpreterEnvironment, WORKING_DIR_ENTRY,
};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Configure,
    Initialize,
    SetArgv,
    AppendSearchPath,
    PrependSearchPath(String),
    CaptureOutput,
    LoadAndRun(String),
    TakePendingError,
    Finalize,
}

#[derive(Default)]
struct RecordingEmbedding {
    calls: Vec<Call>,
    environment: Option<InterpreterEnvironment>,
    initialized: bool,
    argv: Option<Vec<String>>,
    argv_seen_by_module: Option<Vec<String>>,
    sys_path: Vec<String>,
    /// Modules that exist in the working directory
    cwd_modules: Vec<String>,
    fail_init: bool,
    fail_set_argv: bool,
    /// Status the entry script passes to `sys.exit`
    exit_status: Option<i32>,
    pending_error: Option<String>,
    drained: Vec<String>,
}

impl RecordingEmbedding {
    fn with_cwd_module(module: &str) -> Self {
        Self {
            cwd_modules: vec![module.to_string()],
            ..Default::default()
        }
    }

    fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    fn imported(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::LoadAndRun(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Embedding for RecordingEmbedding {
    fn configure(&mut self, environment: &InterpreterEnvironment) -> Result<(), BridgeError> {
        assert!(!self.initialized, "configured after boot");
        self.calls.push(Call::Configure);
        self.environment = Some(environment.clone());
        Ok(())
    }

    fn initialize(&mut self) -> Result<(), BridgeError> {
        self.calls.push(Call::Initialize);
        if self.fail_init {
            return Err(BridgeError::Initialization("encodings not found".to_string()));
        }
        self.initialized = true;
        self.sys_path = self
            .environment
            .as_ref()
            .map(|env| {
                env.search_path
                    .iter()
                    .map(|p| p.to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default();
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn set_argv(&mut self, argv: &[String]) -> Result<(), BridgeError> {
        self.calls.push(Call::SetArgv);
        if self.fail_set_argv {
            self.pending_error = Some("SystemError: argv rejected".to_string());
            return Err(BridgeError::Python("Failed to set sys.argv".to_string()));
        }
        self.argv = Some(argv.to_vec());
        Ok(())
    }

    fn append_search_path(&mut self, entry: &str) -> Result<(), BridgeError> {
        self.calls.push(Call::AppendSearchPath);
        self.sys_path.push(entry.to_string());
        Ok(())
    }

    fn prepend_search_path(&mut self, entry: &str) -> Result<(), BridgeError> {
        self.calls.push(Call::PrependSearchPath(entry.to_string()));
        self.sys_path.insert(0, entry.to_string());
        Ok(())
    }

    fn capture_output(&mut self) -> Result<(), BridgeError> {
        self.calls.push(Call::CaptureOutput);
        Ok(())
    }

    fn load_and_run(&mut self, module: &str) -> Result<(), BridgeError> {
        self.calls.push(Call::LoadAndRun(module.to_string()));
        // Directories other than the configured path stand in for the cwd or a
        // script directory, where the double's modules live.
        let configured: Vec<String> = self
            .environment
            .as_ref()
            .map(|env| {
                env.search_path
                    .iter()
                    .map(|p| p.to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default();
        let reachable = self
            .sys_path
            .iter()
            .any(|p| p == WORKING_DIR_ENTRY || !configured.contains(p))
            && self.cwd_modules.iter().any(|m| m == module);
        if reachable {
            self.argv_seen_by_module = self.argv.clone();
            match self.exit_status {
                Some(0) | None => Ok(()),
                Some(status) => Err(BridgeError::ScriptExit(status)),
            }
        } else {
            Err(ImportError::new(
                module,
                format!("ModuleNotFoundError: No module named '{}'", module),
            )
            .with_traceback(format!(
                "Traceback (most recent call last):\nModuleNotFoundError: No module named '{}'",
                module
            ))
            .into())
        }
    }

    fn take_pending_error(&mut self) -> Option<String> {
        self.calls.push(Call::TakePendingError);
        let pending = self.pending_error.take();
        if let Some(ref err) = pending {
            self.drained.push(err.clone());
        }
        pending
    }

    fn finalize(&mut self) {
        self.calls.push(Call::Finalize);
        self.initialized = false;
    }
}

fn invocation(entry: EntrySpec) -> HostInvocation {
    HostInvocation::new("/data/python", "/data/python/lib/python3.11", entry).unwrap()
}

#[test]
fn test_successful_run_is_balanced_and_ordered() {
    let _guard = serial();
    let mut bridge = Bridge::new(RecordingEmbedding::with_cwd_module("main"));
    let entry = EntrySpec::argv(["main", "a", "b"]).unwrap();

    bridge.run(invocation(entry)).unwrap();

    let embedding = bridge.into_embedding();
    assert_eq!(
        embedding.calls,
        vec![
            Call::Configure,
            Call::Initialize,
            Call::SetArgv,
            Call::AppendSearchPath,
            Call::LoadAndRun("main".to_string()),
            Call::TakePendingError,
            Call::Finalize,
        ]
    );
    assert!(!embedding.initialized);
    assert!(!ProcessClaim::is_held());
}

#[test]
fn test_argv_is_installed_in_order_before_import() {
    let _guard = serial();
    let mut bridge = Bridge::new(RecordingEmbedding::with_cwd_module("main"));
    bridge
        .run(invocation(EntrySpec::argv(["main", "a", "b"]).unwrap()))
        .unwrap();

    let embedding = bridge.embedding();
    let expected = vec!["main".to_string(), "a".to_string(), "b".to_string()];
    assert_eq!(embedding.argv.as_ref(), Some(&expected));
    assert_eq!(embedding.argv_seen_by_module.as_ref(), Some(&expected));
    assert_eq!(embedding.imported(), vec!["main"]);
}

#[test]
fn test_single_entry_imports_same_module_as_argv() {
    let _guard = serial();
    let mut single = Bridge::new(RecordingEmbedding::with_cwd_module("main"));
    single.run(invocation(EntrySpec::single("main"))).unwrap();

    let mut argv = Bridge::new(RecordingEmbedding::with_cwd_module("main"));
    argv.run(invocation(EntrySpec::argv(["main"]).unwrap()))
        .unwrap();

    assert_eq!(single.embedding().imported(), argv.embedding().imported());
    assert_eq!(single.embedding().count(&Call::SetArgv), 0);
    assert!(single.embedding().argv.is_none());
}

#[test]
fn test_script_file_name_resolves_to_module() {
    let _guard = serial();
    let mut bridge = Bridge::new(RecordingEmbedding::with_cwd_module("main"));
    bridge.run(invocation(EntrySpec::single("main.py"))).unwrap();
    assert_eq!(bridge.embedding().imported(), vec!["main"]);
}

#[test]
fn test_working_dir_is_appended_after_configured_path() {
    let _guard = serial();
    let mut bridge = Bridge::new(RecordingEmbedding::with_cwd_module("main"));
    bridge.run(invocation(EntrySpec::single("main"))).unwrap();

    let embedding = bridge.embedding();
    assert_eq!(
        embedding.sys_path,
        vec!["/data/python/lib/python3.11".to_string(), ".".to_string()]
    );
    assert_eq!(
        embedding.environment.as_ref().map(|e| e.home.clone()),
        Some(PathBuf::from("/data/python"))
    );
}

#[test]
fn test_without_working_dir_cwd_module_is_not_found() {
    let _guard = serial();
    let options = BridgeOptions {
        append_working_dir: false,
        ..Default::default()
    };
    let mut bridge =
        Bridge::with_options(RecordingEmbedding::with_cwd_module("main"), options);
    let err = bridge
        .run(invocation(EntrySpec::single("main")))
        .unwrap_err();

    assert!(matches!(err, BridgeError::Import(_)));
    assert_eq!(bridge.embedding().count(&Call::AppendSearchPath), 0);
    assert_eq!(bridge.embedding().count(&Call::Finalize), 1);
}

#[test]
fn test_init_failure_short_circuits() {
    let _guard = serial();
    let embedding = RecordingEmbedding {
        fail_init: true,
        ..RecordingEmbedding::with_cwd_module("main")
    };
    let mut bridge = Bridge::new(embedding);
    let err = bridge
        .run(invocation(EntrySpec::argv(["main", "x"]).unwrap()))
        .unwrap_err();

    assert!(matches!(err, BridgeError::Initialization(_)));
    assert_eq!(err.status_code(), 2);
    let embedding = bridge.embedding();
    assert_eq!(embedding.calls, vec![Call::Configure, Call::Initialize]);
    assert!(embedding.imported().is_empty());
    assert_eq!(embedding.count(&Call::Finalize), 0);
    assert!(!ProcessClaim::is_held());
}

#[test]
fn test_import_failure_still_finalizes() {
    let _guard = serial();
    let mut bridge = Bridge::new(RecordingEmbedding::default());
    let err = bridge
        .run(invocation(EntrySpec::single("missing")))
        .unwrap_err();

    match err {
        BridgeError::Import(ref import) => {
            assert_eq!(import.module, "missing");
            assert!(import.traceback.is_some());
        }
        ref other => panic!("unexpected error: {other}"),
    }
    let embedding = bridge.embedding();
    assert_eq!(embedding.count(&Call::TakePendingError), 1);
    assert_eq!(embedding.count(&Call::Finalize), 1);
    assert!(embedding.drained.is_empty());
    assert!(!embedding.initialized);
}

#[test]
fn test_interpreter_error_after_boot_is_drained_once_and_finalized() {
    let _guard = serial();
    let embedding = RecordingEmbedding {
        fail_set_argv: true,
        ..RecordingEmbedding::with_cwd_module("main")
    };
    let mut bridge = Bridge::new(embedding);
    let err = bridge
        .run(invocation(EntrySpec::argv(["main"]).unwrap()))
        .unwrap_err();

    assert!(matches!(err, BridgeError::Python(_)));
    let embedding = bridge.embedding();
    assert!(embedding.imported().is_empty());
    assert_eq!(embedding.drained, vec!["SystemError: argv rejected"]);
    assert_eq!(embedding.count(&Call::Finalize), 1);
    assert_eq!(embedding.calls.last(), Some(&Call::Finalize));
}

#[test]
fn test_capture_output_runs_before_import() {
    let _guard = serial();
    let options = BridgeOptions {
        capture_output: true,
        ..Default::default()
    };
    let mut bridge =
        Bridge::with_options(RecordingEmbedding::with_cwd_module("main"), options);
    bridge.run(invocation(EntrySpec::single("main"))).unwrap();

    let calls = &bridge.embedding().calls;
    let capture = calls.iter().position(|c| *c == Call::CaptureOutput);
    let import = calls
        .iter()
        .position(|c| matches!(c, Call::LoadAndRun(_)));
    assert!(capture.is_some());
    assert!(capture < import);
}

#[test]
fn test_concurrent_run_is_rejected_without_touching_interpreter() {
    let _guard = serial();
    let claim = ProcessClaim::acquire().unwrap();
    let mut bridge = Bridge::new(RecordingEmbedding::with_cwd_module("main"));
    let err = bridge
        .run(invocation(EntrySpec::single("main")))
        .unwrap_err();
    drop(claim);

    assert!(matches!(err, BridgeError::AlreadyRunning));
    assert!(bridge.embedding().calls.is_empty());
}

#[test]
fn test_sequential_runs_each_finalize() {
    let _guard = serial();
    let mut bridge = Bridge::new(RecordingEmbedding::with_cwd_module("main"));
    bridge.run(invocation(EntrySpec::single("main"))).unwrap();
    bridge.run(invocation(EntrySpec::single("main"))).unwrap();

    let embedding = bridge.embedding();
    assert_eq!(embedding.count(&Call::Initialize), 2);
    assert_eq!(embedding.count(&Call::Finalize), 2);
}

#[test]
fn test_script_exit_with_status_still_finalizes() {
    let _guard = serial();
    let embedding = RecordingEmbedding {
        exit_status: Some(3),
        ..RecordingEmbedding::with_cwd_module("main")
    };
    let mut bridge = Bridge::new(embedding);
    let err = bridge
        .run(invocation(EntrySpec::argv(["main"]).unwrap()))
        .unwrap_err();

    assert!(matches!(err, BridgeError::ScriptExit(3)));
    assert_eq!(err.status_code(), 6);
    let embedding = bridge.embedding();
    assert_eq!(embedding.count(&Call::Finalize), 1);
    assert_eq!(embedding.calls.last(), Some(&Call::Finalize));
    assert!(!ProcessClaim::is_held());
}

#[test]
fn test_script_exit_with_zero_is_success() {
    let _guard = serial();
    let embedding = RecordingEmbedding {
        exit_status: Some(0),
        ..RecordingEmbedding::with_cwd_module("main")
    };
    let mut bridge = Bridge::new(embedding);
    bridge.run(invocation(EntrySpec::single("main"))).unwrap();
    assert_eq!(bridge.embedding().count(&Call::Finalize), 1);
}

#[test]
fn test_script_directory_goes_first_on_sys_path() {
    let _guard = serial();
    let options = BridgeOptions {
        append_working_dir: false,
        ..Default::default()
    };
    let mut bridge =
        Bridge::with_options(RecordingEmbedding::with_cwd_module("main"), options);
    bridge
        .run(invocation(EntrySpec::argv(["app/main.py", "x"]).unwrap()))
        .unwrap();

    let embedding = bridge.embedding();
    assert_eq!(
        embedding.sys_path,
        vec!["app".to_string(), "/data/python/lib/python3.11".to_string()]
    );
    let prepend = embedding
        .calls
        .iter()
        .position(|c| *c == Call::PrependSearchPath("app".to_string()));
    let import = embedding
        .calls
        .iter()
        .position(|c| *c == Call::LoadAndRun("main".to_string()));
    assert!(prepend.is_some());
    assert!(prepend < import);
}
