//! Shared setup for tests that boot the real interpreter
//!
//! CPython can only be booted and finalized once per process, so every test
//! binary using this module performs exactly one run.

#![allow(dead_code)]

use droid_python::{EntrySpec, HostInvocation};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Interpreter the crate was linked against, as seen from the command line
pub struct HostPython {
    pub home: String,
    pub search_path: String,
}

/// Ask the build interpreter for its home and module search path
///
/// Returns `None` when no interpreter can be started, in which case the
/// calling test returns early.
pub fn host_python() -> Option<HostPython> {
    let program = env::var("PYO3_PYTHON").unwrap_or_else(|_| "python3".to_string());
    let output = Command::new(&program)
        .args([
            "-c",
            "import sys\nprint(sys.base_prefix)\nfor p in sys.path[1:]:\n    print(p)",
        ])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8(output.stdout).ok()?;
    let mut lines = stdout.lines();
    let home = lines.next()?.to_string();
    let entries: Vec<PathBuf> = lines
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect();
    let search_path = env::join_paths(entries).ok()?.to_string_lossy().to_string();
    Some(HostPython { home, search_path })
}

/// Clear interpreter variables inherited from the test runner
pub fn clear_python_env() {
    env::remove_var("PYTHONHOME");
    env::remove_var("PYTHONPATH");
}

pub fn invocation(python: &HostPython, entry: EntrySpec) -> HostInvocation {
    HostInvocation::new(&python.home, &python.search_path, entry).unwrap()
}

/// Write `source` to `dir/name`, creating parent directories
pub fn write_script(dir: &Path, name: &str, source: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, source).unwrap();
    path
}

/// Entries the configured search path contributes, in order
pub fn configured_entries(python: &HostPython) -> Vec<String> {
    env::split_paths(&python.search_path)
        .map(|p| p.to_string_lossy().to_string())
        .collect()
}
