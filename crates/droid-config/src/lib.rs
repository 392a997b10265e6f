//! Bootstrap configuration for the droid bridge
//!
//! The configuration supplies defaults for the interpreter home, the module
//! search path, and the entry script when a host does not pass them
//! explicitly. It is stored as TOML and can be relocated with the
//! `DROID_BOOTSTRAP_CONFIG` environment variable.

pub mod layout;

use serde::{Deserialize, Serialize};
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the config file location
pub const CONFIG_ENV: &str = "DROID_BOOTSTRAP_CONFIG";

/// Keys accepted by [`BootstrapConfig::get`] and [`BootstrapConfig::set`]
pub const KEYS: &[&str] = &[
    "python-home",
    "python-path",
    "main-file",
    "append-working-dir",
    "log-tag",
    "log-file",
];

/// Errors raised while reading, writing, or editing the configuration
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
    UnknownKey(String),
    InvalidValue { key: String, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
            ConfigError::Serialize(e) => write!(f, "Failed to serialize config: {}", e),
            ConfigError::UnknownKey(key) => write!(
                f,
                "Unknown config key: {}. Supported keys: {}",
                key,
                KEYS.join(", ")
            ),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "Invalid value for {}: {}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct BootstrapConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python_home: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub python_path: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub append_working_dir: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

impl BootstrapConfig {
    /// Resolve the config file location
    ///
    /// `DROID_BOOTSTRAP_CONFIG` wins when set and non-empty.
    pub fn path() -> PathBuf {
        if let Ok(env_path) = env::var(CONFIG_ENV) {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }

        #[cfg(not(target_os = "windows"))]
        let base = dirs::home_dir().map(|home| home.join(".config"));

        #[cfg(target_os = "windows")]
        let base = dirs::config_dir();

        base.unwrap_or_else(|| PathBuf::from("."))
            .join("droid-bootstrap")
            .join("bootstrap.toml")
    }

    /// Load from the default location; a missing file yields the defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(ConfigError::Parse)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let value = match key {
            "python-home" => self.python_home.clone(),
            "python-path" => self.joined_python_path(),
            "main-file" => self.main_file.clone(),
            "append-working-dir" => self.append_working_dir.map(|v| v.to_string()),
            "log-tag" => self.log_tag.clone(),
            "log-file" => self.log_file.clone(),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        Ok(value)
    }

    /// Set a key from its textual form
    ///
    /// `python-path` takes a platform-separated list (`:` on Unix).
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "python-home" => self.python_home = Some(value.to_string()),
            "python-path" => {
                self.python_path = env::split_paths(value)
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(|p| p.to_string_lossy().to_string())
                    .collect();
            }
            "main-file" => self.main_file = Some(value.to_string()),
            "append-working-dir" => {
                let parsed = value.parse::<bool>().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                })?;
                self.append_working_dir = Some(parsed);
            }
            "log-tag" => self.log_tag = Some(value.to_string()),
            "log-file" => self.log_file = Some(value.to_string()),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn unset(&mut self, key: &str) -> Result<(), ConfigError> {
        match key {
            "python-home" => self.python_home = None,
            "python-path" => self.python_path.clear(),
            "main-file" => self.main_file = None,
            "append-working-dir" => self.append_working_dir = None,
            "log-tag" => self.log_tag = None,
            "log-file" => self.log_file = None,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn values_iter(&self) -> Vec<(&'static str, String)> {
        KEYS.iter()
            .filter_map(|key| match self.get(key) {
                Ok(Some(value)) => Some((*key, value)),
                _ => None,
            })
            .collect()
    }

    /// Whether the bridge should append the working directory to `sys.path`
    pub fn append_working_dir(&self) -> bool {
        self.append_working_dir.unwrap_or(true)
    }

    /// The configured search path serialized with the platform separator
    pub fn joined_python_path(&self) -> Option<String> {
        if self.python_path.is_empty() {
            return None;
        }
        env::join_paths(self.python_path.iter())
            .ok()
            .map(|joined: OsString| joined.to_string_lossy().to_string())
    }
}
