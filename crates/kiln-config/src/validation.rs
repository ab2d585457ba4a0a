//! Pluggable config validation.
//!
//! [`SchemaValidator`] checks the settings alone; [`FsValidator`] also checks
//! that the files they name exist.

use std::path::{Path, PathBuf};

use crate::bundle::BundleOptions;
use crate::error::{ConfigError, Result};

pub trait ConfigValidator {
    fn validate(&self, config: &BundleOptions) -> Result<()>;
}

/// Schema-only validation (no filesystem checks).
///
/// ```
/// use kiln_config::{BundleOptions, ConfigValidator, SchemaValidator};
///
/// let mut config = BundleOptions::default();
/// config.entries.insert("index".into(), "index.html".into());
///
/// SchemaValidator.validate(&config).unwrap();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl ConfigValidator for SchemaValidator {
    fn validate(&self, config: &BundleOptions) -> Result<()> {
        if config.entries.is_empty() {
            return Err(ConfigError::NoEntries);
        }

        for (name, path) in &config.entries {
            if name.trim().is_empty() {
                return Err(ConfigError::schema(
                    "entry names cannot be empty",
                    "give every entry a name, e.g. index = \"index.html\"",
                ));
            }
            if name.contains(['/', '\\']) {
                return Err(ConfigError::schema(
                    format!("entry name '{}' contains a path separator", name),
                    "entry names become output file names; use a plain name",
                ));
            }
            if path.as_os_str().is_empty() {
                return Err(ConfigError::schema(
                    format!("entry '{}' has an empty path", name),
                    "point the entry at an HTML page or script",
                ));
            }
        }

        for (field, pattern) in [
            ("entry_file_names", &config.entry_file_names),
            ("chunk_file_names", &config.chunk_file_names),
            ("asset_file_names", &config.asset_file_names),
        ] {
            let Some(pattern) = pattern else {
                continue;
            };
            if !pattern.contains("[name]") {
                return Err(ConfigError::schema(
                    format!("{} '{}' must contain [name]", field, pattern),
                    "add [name] so each output keeps a distinct, readable name",
                ));
            }
            if pattern.split('/').any(|part| part == "..") {
                return Err(ConfigError::schema(
                    format!("{} '{}' must not contain '..'", field, pattern),
                    "file name patterns are relative to the output directory",
                ));
            }
        }

        if config.external.iter().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::schema(
                "external package names cannot be empty",
                "remove empty strings from the 'external' array",
            ));
        }

        if config.copy.iter().any(|item| item.from.as_os_str().is_empty()) {
            return Err(ConfigError::schema(
                "copy sources cannot be empty",
                "set 'from' to a file relative to the project root",
            ));
        }

        Ok(())
    }
}

/// Filesystem validator (for CLI use).
///
/// Runs [`SchemaValidator`] first, then checks that entries and copy
/// sources exist under `root`.
#[derive(Debug, Clone)]
pub struct FsValidator {
    root: PathBuf,
}

impl FsValidator {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl ConfigValidator for FsValidator {
    fn validate(&self, config: &BundleOptions) -> Result<()> {
        SchemaValidator.validate(config)?;

        for (name, entry) in &config.entries {
            let path = self.root.join(entry);
            if !path.exists() {
                return Err(ConfigError::EntryNotFound {
                    name: name.clone(),
                    path,
                });
            }
        }

        for item in &config.copy {
            let path = self.root.join(&item.from);
            if !path.is_file() {
                return Err(ConfigError::CopySourceNotFound { path });
            }
        }

        Ok(())
    }
}

pub fn validate_schema(config: &BundleOptions) -> Result<()> {
    SchemaValidator.validate(config)
}

pub fn validate_fs(config: &BundleOptions, root: impl AsRef<Path>) -> Result<()> {
    FsValidator::new(root).validate(config)
}
