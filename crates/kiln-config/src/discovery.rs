//! File-based config discovery for CLI use.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::KilnConfig;
use crate::error::{ConfigError, Result};

pub const CONFIG_FILE: &str = "kiln.toml";

/// Finds and loads kiln configuration in a project directory.
///
/// ```no_run
/// use kiln_config::ConfigDiscovery;
///
/// let config = ConfigDiscovery::new(".").load().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigDiscovery {
    root: PathBuf,
}

impl ConfigDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Searches, in order: `kiln.toml`, then a non-null `kiln` field in
    /// `package.json`.
    pub fn find(&self) -> Option<PathBuf> {
        let toml_path = self.root.join(CONFIG_FILE);
        if toml_path.is_file() {
            return Some(toml_path);
        }

        let pkg_path = self.root.join("package.json");
        let has_field = fs::read_to_string(&pkg_path)
            .ok()
            .and_then(|content| serde_json::from_str::<Value>(&content).ok())
            .is_some_and(|parsed| parsed.get("kiln").is_some_and(|v| !v.is_null()));
        has_field.then_some(pkg_path)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if no config file is found.
    pub fn load(&self) -> Result<KilnConfig> {
        let path = self.find().ok_or(ConfigError::NotFound)?;
        load_file(&path)
    }

    pub fn load_with_profile(&self, profile: &str) -> Result<KilnConfig> {
        self.load()?.materialize_profile(Some(profile))
    }
}

/// Load a specific config file: `package.json` reads its `kiln` field,
/// anything else is parsed as TOML.
pub fn load_file(path: &Path) -> Result<KilnConfig> {
    let content = fs::read_to_string(path)?;
    tracing::debug!(path = %path.display(), "loading config");

    if path.file_name() == Some(std::ffi::OsStr::new("package.json")) {
        return from_package_json(&content);
    }

    let toml_val: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::InvalidValue {
        field: path.display().to_string(),
        hint: Some(format!("invalid TOML: {}", e)),
    })?;
    let value = serde_json::to_value(toml_val).map_err(|e| ConfigError::InvalidValue {
        field: path.display().to_string(),
        hint: Some(e.to_string()),
    })?;
    KilnConfig::from_value(value)
}

fn from_package_json(content: &str) -> Result<KilnConfig> {
    let parsed: Value = serde_json::from_str(content).map_err(|e| ConfigError::InvalidValue {
        field: "package.json".to_string(),
        hint: Some(format!("invalid JSON: {}", e)),
    })?;

    match parsed.get("kiln") {
        Some(value) if !value.is_null() => KilnConfig::from_value(value.clone()),
        _ => Err(ConfigError::InvalidValue {
            field: "kiln".to_string(),
            hint: Some("add a 'kiln' field to your package.json".to_string()),
        }),
    }
}

/// Discover and load config from the current directory.
pub fn discover() -> Result<KilnConfig> {
    ConfigDiscovery::new(std::env::current_dir()?).load()
}
