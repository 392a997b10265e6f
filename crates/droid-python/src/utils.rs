//! Names shared by the bridge and the CPython backend

/// Runtime search path entry for the process working directory
pub const WORKING_DIR_ENTRY: &str = ".";

/// Environment variable CPython reads its home from at boot
pub const PYTHONHOME_ENV: &str = "PYTHONHOME";

/// Environment variable CPython prepends to its module search path at boot
pub const PYTHONPATH_ENV: &str = "PYTHONPATH";

/// Module name of the stdout/stderr capture shim
pub const OUTPUT_SHIM_MODULE: &str = "_droid_output";
