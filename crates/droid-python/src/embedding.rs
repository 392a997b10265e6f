//! The interpreter embedding API as seen by the bridge

use crate::entry::InterpreterEnvironment;
use crate::errors::BridgeError;

/// Operations the bridge needs from an embedded interpreter
///
/// Calls arrive in a fixed order: `configure`, `initialize`, then (only when
/// initialization succeeded) `set_argv`, `append_search_path`,
/// `prepend_search_path`, `capture_output`, `load_and_run`,
/// `take_pending_error` and finally `finalize`.
pub trait Embedding {
    /// Apply home and search path; must happen before `initialize`
    fn configure(&mut self, environment: &InterpreterEnvironment) -> Result<(), BridgeError>;

    /// Boot the interpreter without installing signal handlers
    fn initialize(&mut self) -> Result<(), BridgeError>;

    fn is_initialized(&self) -> bool;

    /// Replace the interpreter's process argument vector
    fn set_argv(&mut self, argv: &[String]) -> Result<(), BridgeError>;

    /// Append an entry to the runtime module search path
    fn append_search_path(&mut self, entry: &str) -> Result<(), BridgeError>;

    /// Insert an entry in front of the runtime module search path
    fn prepend_search_path(&mut self, entry: &str) -> Result<(), BridgeError>;

    /// Route the interpreter's stdout and stderr into the log
    fn capture_output(&mut self) -> Result<(), BridgeError> {
        Ok(())
    }

    /// Import `module`; its top-level statements run as part of loading
    ///
    /// A failed import is `BridgeError::Import`. A `SystemExit` raised by the
    /// script is a normal return for status 0 (or `None`) and
    /// `BridgeError::ScriptExit` otherwise.
    fn load_and_run(&mut self, module: &str) -> Result<(), BridgeError>;

    /// Take the interpreter's pending error, formatted for the log
    fn take_pending_error(&mut self) -> Option<String>;

    fn finalize(&mut self);
}
