//! Path resolution inside an interpreter home
//!
//! An interpreter home is the directory handed to the bridge as
//! `PYTHONHOME`. These helpers locate its standard library and derive the
//! search path a host can pass when it has no explicit one.

use std::fs;
use std::path::{Path, PathBuf};

/// The name of the library directory in an interpreter home
/// "Lib" on Windows, "lib" on Unix
#[cfg(windows)]
pub const PYTHON_LIB_DIR: &str = "Lib";
#[cfg(not(windows))]
pub const PYTHON_LIB_DIR: &str = "lib";

/// Module whose presence marks a directory as the standard library
pub const STDLIB_MARKER: &str = "os.py";

/// Extension modules directory inside the standard library (Unix only)
pub const LIB_DYNLOAD: &str = "lib-dynload";

/// The subdirectory name for site-packages within the standard library
pub const SITE_PACKAGES: &str = "site-packages";

/// Package the interpreter imports while booting, before any host code runs
pub const ENCODINGS_PACKAGE: &str = "encodings";

/// Error type for home layout resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// The home path does not exist or is not a directory
    HomeNotFound(PathBuf),
    /// Failed to find a required directory or file
    PathResolution(String),
}

impl std::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutError::HomeNotFound(path) => {
                write!(f, "Interpreter home not found: {}", path.display())
            }
            LayoutError::PathResolution(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for LayoutError {}

/// Resolve the standard library directory of an interpreter home
///
/// # Platform differences
///
/// - **Unix/Android**: `<home>/lib/python3.X`
/// - **Windows**: `<home>/Lib`
pub fn resolve_stdlib_dir(home: &Path) -> Result<PathBuf, LayoutError> {
    if !home.is_dir() {
        return Err(LayoutError::HomeNotFound(home.to_path_buf()));
    }

    let lib_dir = home.join(PYTHON_LIB_DIR);
    if !lib_dir.is_dir() {
        return Err(LayoutError::PathResolution(format!(
            "lib directory not found: {}",
            lib_dir.display()
        )));
    }

    if lib_dir.join(STDLIB_MARKER).is_file() {
        return Ok(lib_dir);
    }

    // Several versioned directories may coexist; prefer the newest.
    let mut candidates: Vec<PathBuf> = fs::read_dir(&lib_dir)
        .map_err(|e| LayoutError::PathResolution(format!("Failed to read lib dir: {}", e)))?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("python"))
        .map(|e| e.path())
        .filter(|p| p.join(STDLIB_MARKER).is_file())
        .collect();
    candidates.sort_by_key(|p| version_key(p));

    candidates.pop().ok_or_else(|| {
        LayoutError::PathResolution(format!(
            "No python3.X standard library found in {}",
            lib_dir.display()
        ))
    })
}

fn version_key(path: &Path) -> (u32, u32) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut parts = name.trim_start_matches("python").split('.');
    let major = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    (major, minor)
}

/// Derive the module search path for an interpreter home
///
/// Returns the standard library followed by `lib-dynload` and
/// `site-packages`, keeping only entries that exist on disk.
pub fn default_search_path(home: &Path) -> Result<Vec<PathBuf>, LayoutError> {
    let stdlib = resolve_stdlib_dir(home)?;
    let mut entries = vec![stdlib.clone()];
    for extra in [LIB_DYNLOAD, SITE_PACKAGES] {
        let candidate = stdlib.join(extra);
        if candidate.is_dir() {
            entries.push(candidate);
        }
    }
    Ok(entries)
}

/// Locate the directory that lets the interpreter boot
///
/// CPython aborts the whole process when it cannot import `encodings` during
/// initialization, so hosts look for it first. The home's standard library is
/// tried before the search path entries; a zip archive on the search path is
/// accepted without looking inside.
pub fn find_boot_stdlib(home: &Path, search_path: &[PathBuf]) -> Result<PathBuf, LayoutError> {
    let stdlib = resolve_stdlib_dir(home).ok();
    stdlib
        .iter()
        .chain(search_path.iter())
        .find(|entry| entry.join(ENCODINGS_PACKAGE).is_dir() || is_zip_archive(entry))
        .cloned()
        .ok_or_else(|| {
            LayoutError::PathResolution(format!(
                "No '{}' package under {} or on the search path",
                ENCODINGS_PACKAGE,
                home.display()
            ))
        })
}

fn is_zip_archive(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// Return the search path entries that do not exist on disk
pub fn missing_entries(entries: &[PathBuf]) -> Vec<PathBuf> {
    entries.iter().filter(|p| !p.exists()).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(not(windows))]
    fn create_mock_home(versions: &[&str]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for version in versions {
            let stdlib = temp_dir.path().join("lib").join(version);
            fs::create_dir_all(stdlib.join(SITE_PACKAGES)).unwrap();
            fs::write(stdlib.join(STDLIB_MARKER), "").unwrap();
        }
        temp_dir
    }

    #[test]
    #[cfg(not(windows))]
    fn test_resolve_stdlib_dir_unix() {
        let home = create_mock_home(&["python3.11"]);
        let stdlib = resolve_stdlib_dir(home.path()).unwrap();
        assert!(stdlib.ends_with("lib/python3.11"));
    }

    #[test]
    #[cfg(not(windows))]
    fn test_resolve_stdlib_prefers_newest_version() {
        let home = create_mock_home(&["python3.9", "python3.12", "python3.10"]);
        let stdlib = resolve_stdlib_dir(home.path()).unwrap();
        assert!(stdlib.ends_with("lib/python3.12"));
    }

    #[test]
    #[cfg(not(windows))]
    fn test_default_search_path_skips_missing_entries() {
        let home = create_mock_home(&["python3.11"]);
        let entries = default_search_path(home.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].ends_with("lib/python3.11"));
        assert!(entries[1].ends_with("lib/python3.11/site-packages"));
    }

    #[test]
    fn test_home_not_found() {
        let missing = PathBuf::from("/tmp/non_existent_python_home_12345");
        let result = resolve_stdlib_dir(&missing);
        assert!(matches!(result, Err(LayoutError::HomeNotFound(_))));
    }

    #[test]
    fn test_lib_dir_without_stdlib() {
        let home = TempDir::new().unwrap();
        fs::create_dir_all(home.path().join(PYTHON_LIB_DIR).join("python3.11")).unwrap();
        let result = resolve_stdlib_dir(home.path());
        assert!(matches!(result, Err(LayoutError::PathResolution(_))));
    }

    #[test]
    #[cfg(not(windows))]
    fn test_boot_stdlib_found_under_home() {
        let home = create_mock_home(&["python3.11"]);
        let stdlib = home.path().join("lib").join("python3.11");
        fs::create_dir_all(stdlib.join(ENCODINGS_PACKAGE)).unwrap();
        assert_eq!(find_boot_stdlib(home.path(), &[]).unwrap(), stdlib);
    }

    #[test]
    fn test_boot_stdlib_found_on_search_path() {
        let home = TempDir::new().unwrap();
        let lib = home.path().join("pylib");
        fs::create_dir_all(lib.join(ENCODINGS_PACKAGE)).unwrap();
        let missing_home = home.path().join("no-home");
        assert_eq!(
            find_boot_stdlib(&missing_home, &[home.path().join("nope"), lib.clone()]).unwrap(),
            lib
        );
    }

    #[test]
    fn test_boot_stdlib_accepts_zip_archive() {
        let home = TempDir::new().unwrap();
        let archive = home.path().join("python311.zip");
        fs::write(&archive, "").unwrap();
        assert_eq!(
            find_boot_stdlib(home.path(), &[archive.clone()]).unwrap(),
            archive
        );
    }

    #[test]
    #[cfg(not(windows))]
    fn test_boot_stdlib_missing_encodings() {
        let home = create_mock_home(&["python3.11"]);
        let result = find_boot_stdlib(home.path(), &[home.path().to_path_buf()]);
        assert!(matches!(result, Err(LayoutError::PathResolution(_))));
        let result = find_boot_stdlib(Path::new("/nonexistent/python_home"), &[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_entries() {
        let home = TempDir::new().unwrap();
        let present = home.path().to_path_buf();
        let absent = home.path().join("nope");
        assert_eq!(missing_entries(&[present, absent.clone()]), vec![absent]);
    }
}
