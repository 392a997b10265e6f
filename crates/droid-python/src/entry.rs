//! Call-scoped invocation model
//!
//! A [`HostInvocation`] is built from host-owned strings, consumed by exactly
//! one bridge run, and dropped afterwards. Validation happens here so that a
//! malformed request is rejected before any interpreter state changes.

use crate::errors::BridgeError;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

const SCRIPT_EXTENSION: &str = ".py";

/// What the bridge should load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySpec {
    /// A bare script or module name; no argument vector is installed
    Single(String),
    /// Argument vector whose first element is the script name
    Argv(Vec<String>),
}

impl EntrySpec {
    pub fn single(script: impl Into<String>) -> Self {
        EntrySpec::Single(script.into())
    }

    /// Build an argument-vector entry; the vector must not be empty
    pub fn argv<I, S>(args: I) -> Result<Self, BridgeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        if args.is_empty() {
            return Err(BridgeError::ConfigurationDecode(
                "argument vector: it is empty".to_string(),
            ));
        }
        Ok(EntrySpec::Argv(args))
    }

    /// Element 0 of the argument vector, or the single name
    pub fn script_name(&self) -> &str {
        match self {
            EntrySpec::Single(name) => name,
            EntrySpec::Argv(args) => args.first().map(String::as_str).unwrap_or_default(),
        }
    }

    /// Arguments to install as `sys.argv`; `None` for a bare name
    pub fn arguments(&self) -> Option<&[String]> {
        match self {
            EntrySpec::Single(_) => None,
            EntrySpec::Argv(args) => Some(args),
        }
    }

    /// Importable module name for the script
    ///
    /// `"main"`, `"main.py"` and `"app/main.py"` all resolve to `"main"`.
    pub fn module_name(&self) -> Result<String, BridgeError> {
        module_name_for(self.script_name())
    }

    /// Directory part of a path-qualified script, which must be importable
    ///
    /// `"app/main.py"` yields `"app"`; bare names yield `None`.
    pub fn script_dir(&self) -> Option<&str> {
        Path::new(self.script_name())
            .parent()
            .and_then(Path::to_str)
            .filter(|dir| !dir.is_empty())
    }
}

fn module_name_for(script: &str) -> Result<String, BridgeError> {
    let file_name = Path::new(script)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let module = file_name
        .strip_suffix(SCRIPT_EXTENSION)
        .unwrap_or(&file_name)
        .trim();
    if module.is_empty() {
        return Err(BridgeError::ConfigurationDecode(format!(
            "script name: '{}' does not name a module",
            script
        )));
    }
    Ok(module.to_string())
}

/// Inbound request from the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInvocation {
    pub home: String,
    /// Serialized search path, separated with the platform convention
    pub search_path: String,
    pub entry: EntrySpec,
}

impl HostInvocation {
    pub fn new(
        home: impl Into<String>,
        search_path: impl Into<String>,
        entry: EntrySpec,
    ) -> Result<Self, BridgeError> {
        let invocation = Self {
            home: home.into(),
            search_path: search_path.into(),
            entry,
        };
        invocation.validate()?;
        Ok(invocation)
    }

    fn validate(&self) -> Result<(), BridgeError> {
        check_text("interpreter home", &self.home)?;
        if self.home.trim().is_empty() {
            return Err(BridgeError::ConfigurationDecode(
                "interpreter home: it is empty".to_string(),
            ));
        }
        check_text("module search path", &self.search_path)?;
        match &self.entry {
            EntrySpec::Single(name) => check_text("script name", name)?,
            EntrySpec::Argv(args) => {
                if args.is_empty() {
                    return Err(BridgeError::ConfigurationDecode(
                        "argument vector: it is empty".to_string(),
                    ));
                }
                for (index, arg) in args.iter().enumerate() {
                    check_text(&format!("argument {}", index), arg)?;
                }
            }
        }
        self.entry.module_name().map(|_| ())
    }

    pub fn environment(&self) -> InterpreterEnvironment {
        InterpreterEnvironment::new(&self.home, &self.search_path)
    }
}

// The interpreter takes C strings, so an interior NUL can never reach it.
fn check_text(label: &str, text: &str) -> Result<(), BridgeError> {
    if text.contains('\0') {
        return Err(BridgeError::ConfigurationDecode(format!(
            "{}: contains a NUL character",
            label
        )));
    }
    Ok(())
}

/// Process-wide configuration applied before the interpreter boots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterEnvironment {
    pub home: PathBuf,
    pub search_path: Vec<PathBuf>,
}

impl InterpreterEnvironment {
    pub fn new(home: &str, search_path: &str) -> Self {
        Self {
            home: PathBuf::from(home),
            search_path: env::split_paths(search_path)
                .filter(|p| !p.as_os_str().is_empty())
                .collect(),
        }
    }

    /// The search path serialized with the platform separator
    pub fn joined_search_path(&self) -> OsString {
        env::join_paths(&self.search_path).unwrap_or_default()
    }
}
