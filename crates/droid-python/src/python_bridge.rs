//! The interpreter bridge
//!
//! A run configures the interpreter, boots it, installs the argument vector,
//! loads the entry module and tears the interpreter down again. Each step is
//! a precondition for the next:
//!
//! 1. claim the process-wide interpreter
//! 2. apply home and search path
//! 3. initialize without signal handlers (early return on failure, no finalize)
//! 4. install `sys.argv` for argument-vector entries
//! 5. append the working directory to `sys.path`, put the directory of a
//!    path-qualified script in front of it, optionally capture output
//! 6. import the entry module; `SystemExit(0)` counts as a normal finish
//! 7. drain pending errors and finalize, on every path past step 3

use crate::embedding::Embedding;
use crate::entry::{EntrySpec, HostInvocation};
use crate::errors::BridgeError;
use crate::initialization::PythonEmbedding;
use crate::session::{InterpreterSession, ProcessClaim};
use crate::utils::WORKING_DIR_ENTRY;
use droid_logger as logger;

/// Knobs a host may turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Append `"."` to the runtime search path after boot
    pub append_working_dir: bool,
    /// Send interpreter stdout/stderr to the log (they go nowhere on Android)
    pub capture_output: bool,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            append_working_dir: true,
            capture_output: false,
        }
    }
}

/// Drives one interpreter run per call to [`Bridge::run`]
pub struct Bridge<E: Embedding> {
    embedding: E,
    options: BridgeOptions,
}

impl<E: Embedding> Bridge<E> {
    pub fn new(embedding: E) -> Self {
        Self::with_options(embedding, BridgeOptions::default())
    }

    pub fn with_options(embedding: E, options: BridgeOptions) -> Self {
        Self { embedding, options }
    }

    pub fn embedding(&self) -> &E {
        &self.embedding
    }

    pub fn into_embedding(self) -> E {
        self.embedding
    }

    /// Run the entry script described by `invocation`
    pub fn run(&mut self, invocation: HostInvocation) -> Result<(), BridgeError> {
        let module = invocation.entry.module_name()?;
        let span = tracing::info_span!("bridge_run", module = %module);
        let _entered = span.enter();

        let _claim = ProcessClaim::acquire().map_err(|e| {
            logger::error("Another Python interpreter is already running.");
            e
        })?;

        let environment = invocation.environment();
        logger::info(&format!("Setting PYTHONHOME: {}", invocation.home));
        logger::info(&format!("Setting PYTHONPATH: {}", invocation.search_path));
        self.embedding.configure(&environment)?;

        logger::info("Initializing Python interpreter...");
        let booted = self
            .embedding
            .initialize()
            .and_then(|()| InterpreterSession::begin(&mut self.embedding));
        let mut session = match booted {
            Ok(session) => session,
            Err(e) => {
                logger::error("Failed to initialize Python interpreter.");
                logger::debug(&format!("Initialization error: {}", e));
                return Err(match e {
                    BridgeError::Initialization(_) => e,
                    other => BridgeError::Initialization(other.to_string()),
                });
            }
        };

        // From here on, dropping `session` finalizes the interpreter.
        Self::execute(&mut session, &invocation.entry, &module, &self.options)?;
        session.finish();
        Ok(())
    }

    fn execute(
        session: &mut InterpreterSession<'_, E>,
        entry: &EntrySpec,
        module: &str,
        options: &BridgeOptions,
    ) -> Result<(), BridgeError> {
        // Script code may read sys.argv while its top level runs during import.
        if let Some(argv) = entry.arguments() {
            logger::debug(&format!("Installing sys.argv: {:?}", argv));
            session.set_argv(argv)?;
        }

        if options.append_working_dir {
            session.append_search_path(WORKING_DIR_ENTRY)?;
        }

        if let Some(dir) = entry.script_dir() {
            logger::debug(&format!("Script directory first on sys.path: {}", dir));
            session.prepend_search_path(dir)?;
        }

        if options.capture_output {
            session.capture_output()?;
        }

        logger::info(&format!("Running Python script: {}", entry.script_name()));
        match session.load_and_run(module) {
            Ok(()) => {}
            Err(BridgeError::Import(e)) => {
                logger::error("Failed to import main module.");
                match e.traceback {
                    Some(ref traceback) => logger::traceback(traceback),
                    None => logger::error(&e.message),
                }
                return Err(e.into());
            }
            Err(BridgeError::ScriptExit(status)) => {
                logger::warn(&format!("Python script exited with status {}.", status));
                return Err(BridgeError::ScriptExit(status));
            }
            Err(other) => return Err(other),
        }

        logger::info("Python script execution finished.");
        Ok(())
    }
}

/// Run `invocation` in the embedded CPython
pub fn run_python(invocation: HostInvocation, options: BridgeOptions) -> Result<(), BridgeError> {
    Bridge::with_options(PythonEmbedding::new(), options).run(invocation)
}
