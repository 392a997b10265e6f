//! Embedded Python bridge for droid bootstrap hosts
//!
//! The bridge hands an interpreter home, a module search path and an entry
//! script to an embedded CPython, runs the script by importing it, and tears
//! the interpreter down before returning:
//! 1. Host strings are decoded into a [`HostInvocation`] up front
//! 2. [`Bridge::run`] boots, loads and finalizes through an [`Embedding`]
//!
//! The [`Embedding`] seam keeps the run sequence independent of pyo3, so the
//! lifecycle rules are checked against a recording double in the tests.

pub mod embedding;
pub mod entry;
pub mod errors;
pub mod host;
mod initialization;
mod python_bridge;
pub mod session;
mod utils;

pub use embedding::Embedding;
pub use entry::{EntrySpec, HostInvocation, InterpreterEnvironment};
pub use errors::{BridgeError, ErrorKind, ImportError};
pub use host::{decode_invocation, HostEntry, HostRuntime};
pub use initialization::PythonEmbedding;
pub use python_bridge::{run_python, Bridge, BridgeOptions};
pub use utils::WORKING_DIR_ENTRY;
