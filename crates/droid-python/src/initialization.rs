//! CPython embedding over pyo3
//!
//! Home and search path are handed to CPython through `PYTHONHOME` and
//! `PYTHONPATH`, which it reads once while booting. The host's previous values
//! are put back when the interpreter is finalized. Booting goes through
//! `pyo3::Python::initialize`, which never installs signal handlers, so the
//! host keeps ownership of signal delivery.
//!
//! CPython treats a missing standard library as a fatal error and exits the
//! process, so the home is checked for `encodings` before booting.
//!
//! CPython does not support booting again after `Py_FinalizeEx` once pyo3
//! has attached to it, so a finalized interpreter stays finalized for the
//! rest of the process.

use crate::embedding::Embedding;
use crate::entry::InterpreterEnvironment;
use crate::errors::{BridgeError, ImportError};
use crate::utils::{OUTPUT_SHIM_MODULE, PYTHONHOME_ENV, PYTHONPATH_ENV};
use droid_config::layout;
use droid_logger as logger;
use pyo3::exceptions::PySystemExit;
use pyo3::ffi;
use pyo3::prelude::*;
use pyo3::types::{PyList, PyModule};
use std::env;
use std::ffi::{CString, OsString};
use std::sync::atomic::{AtomicBool, Ordering};

static FINALIZED: AtomicBool = AtomicBool::new(false);

const OUTPUT_SHIM: &str = r#"import sys


class _LogStream:
    def __init__(self, name, emit):
        self._name = name
        self._emit = emit
        self._buffer = ""

    def write(self, text):
        self._buffer += text
        while "\n" in self._buffer:
            line, self._buffer = self._buffer.split("\n", 1)
            self._emit(self._name, line)
        return len(text)

    def flush(self):
        if self._buffer:
            self._emit(self._name, self._buffer)
            self._buffer = ""

    def isatty(self):
        return False


def install(emit):
    sys.stdout = _LogStream("stdout", emit)
    sys.stderr = _LogStream("stderr", emit)
"#;

/// Receives lines written to the interpreter's stdout/stderr
#[pyfunction]
fn emit_line(stream: String, line: String) {
    if stream == "stderr" {
        logger::warn(&line);
    } else {
        logger::info(&line);
    }
}

/// Host values of the variables `configure` overwrites
#[derive(Debug)]
struct SavedEnvironment {
    home: Option<OsString>,
    path: Option<OsString>,
}

impl SavedEnvironment {
    fn capture() -> Self {
        Self {
            home: env::var_os(PYTHONHOME_ENV),
            path: env::var_os(PYTHONPATH_ENV),
        }
    }

    fn restore(self) {
        restore_var(PYTHONHOME_ENV, self.home);
        restore_var(PYTHONPATH_ENV, self.path);
    }
}

fn restore_var(name: &str, value: Option<OsString>) {
    match value {
        Some(value) => env::set_var(name, value),
        None => env::remove_var(name),
    }
}

/// The embedded CPython interpreter
#[derive(Debug, Default)]
pub struct PythonEmbedding {
    booted: bool,
    environment: Option<InterpreterEnvironment>,
    saved: Option<SavedEnvironment>,
}

impl PythonEmbedding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an earlier run already finalized CPython in this process
    pub fn was_finalized() -> bool {
        FINALIZED.load(Ordering::Acquire)
    }

    fn interpreter_running() -> bool {
        // SAFETY: Py_IsInitialized only reads interpreter state and may be
        // called at any time, including before initialization.
        unsafe { ffi::Py_IsInitialized() != 0 }
    }

    fn restore_environment(&mut self) {
        if let Some(saved) = self.saved.take() {
            saved.restore();
        }
    }

    fn boot(&mut self) -> Result<(), BridgeError> {
        if Self::was_finalized() {
            return Err(BridgeError::Initialization(
                "interpreter was finalized earlier in this process and cannot be restarted"
                    .to_string(),
            ));
        }

        if let Some(environment) = &self.environment {
            let stdlib = layout::find_boot_stdlib(&environment.home, &environment.search_path)
                .map_err(|e| BridgeError::Initialization(e.to_string()))?;
            logger::debug(&format!("Boot modules found in {}", stdlib.display()));
        }

        let start = std::time::Instant::now();
        pyo3::Python::initialize();
        logger::debug(&format!(
            "pyo3::Python::initialize took: {:?}",
            start.elapsed()
        ));

        if !Self::interpreter_running() {
            return Err(BridgeError::Initialization(
                "Py_IsInitialized reported false after boot".to_string(),
            ));
        }
        self.booted = true;
        Ok(())
    }
}

/// Process status carried by a `SystemExit`
///
/// Mirrors the interpreter's own rule: `None` is 0, an integer is itself, and
/// any other value is printed and becomes 1.
fn exit_status(py: Python<'_>, err: &PyErr) -> i32 {
    let code = match err.value(py).getattr("code") {
        Ok(code) => code,
        Err(_) => return 1,
    };
    if code.is_none() {
        return 0;
    }
    match code.extract::<i32>() {
        Ok(status) => status,
        Err(_) => {
            logger::error(&code.to_string());
            1
        }
    }
}

fn format_python_error(py: Python<'_>, err: &PyErr) -> String {
    let traceback = err
        .traceback(py)
        .and_then(|tb| tb.format().ok())
        .unwrap_or_default();
    format!("{}{}", traceback, err)
}

impl Embedding for PythonEmbedding {
    fn configure(&mut self, environment: &InterpreterEnvironment) -> Result<(), BridgeError> {
        if Self::interpreter_running() {
            return Err(BridgeError::Initialization(
                "interpreter was already initialized by the host".to_string(),
            ));
        }
        if self.saved.is_none() {
            self.saved = Some(SavedEnvironment::capture());
        }
        env::set_var(PYTHONHOME_ENV, &environment.home);
        // PYTHONPATH entries are placed in front of CPython's own default path
        // (the home's stdlib and lib-dynload); they do not replace it, so the
        // configured search path is a prefix of sys.path, not all of it.
        let joined = environment.joined_search_path();
        if joined.is_empty() {
            env::remove_var(PYTHONPATH_ENV);
        } else {
            env::set_var(PYTHONPATH_ENV, &joined);
        }
        logger::debug(&format!(
            "Exported {}={} {}={}",
            PYTHONHOME_ENV,
            environment.home.display(),
            PYTHONPATH_ENV,
            joined.to_string_lossy()
        ));
        self.environment = Some(environment.clone());
        Ok(())
    }

    fn initialize(&mut self) -> Result<(), BridgeError> {
        let booted = self.boot();
        if booted.is_err() {
            self.restore_environment();
        }
        booted
    }

    fn is_initialized(&self) -> bool {
        self.booted && Self::interpreter_running()
    }

    fn set_argv(&mut self, argv: &[String]) -> Result<(), BridgeError> {
        pyo3::Python::attach(|py| {
            let sys = PyModule::import(py, "sys")
                .map_err(|e| BridgeError::Python(format!("Failed to import sys module: {}", e)))?;
            let list = PyList::new(py, argv)?;
            sys.setattr("argv", list)
                .map_err(|e| BridgeError::Python(format!("Failed to set sys.argv: {}", e)))?;
            Ok::<(), BridgeError>(())
        })
    }

    fn append_search_path(&mut self, entry: &str) -> Result<(), BridgeError> {
        pyo3::Python::attach(|py| {
            let sys = PyModule::import(py, "sys")
                .map_err(|e| BridgeError::Python(format!("Failed to import sys module: {}", e)))?;
            let path = sys.getattr("path")?;
            let path = path
                .cast::<PyList>()
                .map_err(|e| BridgeError::Python(format!("sys.path is not a list: {}", e)))?;
            path.append(entry)?;
            logger::debug(&format!("Appended '{}' to sys.path", entry));
            Ok::<(), BridgeError>(())
        })
    }

    fn prepend_search_path(&mut self, entry: &str) -> Result<(), BridgeError> {
        pyo3::Python::attach(|py| {
            let sys = PyModule::import(py, "sys")
                .map_err(|e| BridgeError::Python(format!("Failed to import sys module: {}", e)))?;
            let path = sys.getattr("path")?;
            let path = path
                .cast::<PyList>()
                .map_err(|e| BridgeError::Python(format!("sys.path is not a list: {}", e)))?;
            path.insert(0, entry)?;
            Ok::<(), BridgeError>(())
        })
    }

    fn capture_output(&mut self) -> Result<(), BridgeError> {
        pyo3::Python::attach(|py| {
            let code = CString::new(OUTPUT_SHIM).map_err(|e| {
                BridgeError::Python(format!("Failed to prepare output shim: {}", e))
            })?;
            let file_name = CString::new(format!("{}.py", OUTPUT_SHIM_MODULE))
                .map_err(|e| BridgeError::Python(format!("Invalid shim file name: {}", e)))?;
            let module_name = CString::new(OUTPUT_SHIM_MODULE)
                .map_err(|e| BridgeError::Python(format!("Invalid shim module name: {}", e)))?;
            let shim = PyModule::from_code(
                py,
                code.as_c_str(),
                file_name.as_c_str(),
                module_name.as_c_str(),
            )
            .map_err(|e| BridgeError::Python(format!("Failed to build output shim: {}", e)))?;

            let emit = wrap_pyfunction!(emit_line, py)?;
            shim.getattr("install")?
                .call1((emit,))
                .map_err(|e| BridgeError::Python(format!("Failed to capture output: {}", e)))?;
            logger::debug("Routed sys.stdout and sys.stderr to the log");
            Ok::<(), BridgeError>(())
        })
    }

    fn load_and_run(&mut self, module: &str) -> Result<(), BridgeError> {
        pyo3::Python::attach(|py| match PyModule::import(py, module) {
            Ok(_) => {
                logger::debug(&format!("Imported module: {}", module));
                Ok(())
            }
            Err(err) if err.is_instance_of::<PySystemExit>(py) => match exit_status(py, &err) {
                0 => {
                    logger::debug(&format!("Module {} exited with status 0", module));
                    Ok(())
                }
                status => Err(BridgeError::ScriptExit(status)),
            },
            Err(err) => Err(ImportError::new(module, err.to_string())
                .with_traceback(format_python_error(py, &err))
                .into()),
        })
    }

    fn take_pending_error(&mut self) -> Option<String> {
        if !self.is_initialized() {
            return None;
        }
        pyo3::Python::attach(|py| PyErr::take(py).map(|err| format_python_error(py, &err)))
    }

    fn finalize(&mut self) {
        if self.booted {
            self.booted = false;
            shutdown();
        }
        self.restore_environment();
    }
}

fn shutdown() {
    if !PythonEmbedding::interpreter_running() {
        logger::warn("Interpreter was already torn down before finalize");
        return;
    }

    // SAFETY: the bridge guarantees no pyo3 handles outlive the session and
    // that this runs on the thread that booted the interpreter. pyo3 released
    // the GIL after booting, so it is reacquired before finalizing.
    let status = unsafe {
        let _gil = ffi::PyGILState_Ensure();
        ffi::Py_FinalizeEx()
    };
    FINALIZED.store(true, Ordering::Release);
    if status != 0 {
        logger::warn("Python reported errors while flushing buffered output at shutdown");
    }
}
