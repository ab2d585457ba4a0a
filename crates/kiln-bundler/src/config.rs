//! Build configuration.
//!
//! [`BuildConfig`] carries everything the pipeline needs for one build. The
//! defaults follow the usual hashed, split layout served from `/`;
//! [`BuildConfig::relocatable`] selects the flat, unsplit layout addressed
//! relative to the output directory, so the bundle can be opened from any
//! base path including a plain `file://` location.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use path_clean::PathClean;

use crate::{Error, Result};

/// Configuration for a single build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Project root. Entries, `/`-prefixed imports and `out_dir` resolve against it.
    pub root: PathBuf,
    /// Logical entry name -> source location, in declaration order.
    pub entries: IndexMap<String, PathBuf>,
    /// Output directory.
    pub out_dir: PathBuf,
    /// Prefix for emitted references. `./` (or empty) selects relative addressing.
    pub base: String,
    /// Delete everything under `out_dir` before writing.
    pub empty_out_dir: bool,
    /// Factor modules shared between entries into separate chunks.
    pub split_chunks: bool,
    /// Subdirectory for chunks, stylesheets and assets. Empty keeps the output flat.
    pub assets_dir: String,
    /// Emit `.map` files next to chunks.
    pub source_maps: bool,
    /// Combine every stylesheet of the build into a single `style` asset.
    pub css_combined: bool,
    /// Pattern for entry chunks.
    pub entry_file_names: String,
    /// Pattern for shared chunks.
    pub chunk_file_names: String,
    /// Pattern for assets and stylesheets.
    pub asset_file_names: String,
    /// Bare specifiers left untouched in the output.
    pub external: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            entries: IndexMap::new(),
            out_dir: PathBuf::from("dist"),
            base: "/".to_string(),
            empty_out_dir: true,
            split_chunks: true,
            assets_dir: "assets".to_string(),
            source_maps: false,
            css_combined: false,
            entry_file_names: "[name]-[hash].js".to_string(),
            chunk_file_names: "[name]-[hash].js".to_string(),
            asset_file_names: "[name]-[hash].[ext]".to_string(),
            external: Vec::new(),
        }
    }
}

impl BuildConfig {
    /// Create a config with default settings rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Flat, unsplit, relocatable layout.
    ///
    /// Output names are `[name].js` / `[name].[ext]` directly under `out_dir`,
    /// all styles land in one `style.css`, and every emitted reference is
    /// relative.
    pub fn relocatable(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            base: "./".to_string(),
            split_chunks: false,
            assets_dir: String::new(),
            css_combined: true,
            entry_file_names: "[name].js".to_string(),
            chunk_file_names: "[name].js".to_string(),
            asset_file_names: "[name].[ext]".to_string(),
            ..Self::default()
        }
    }

    pub fn entry(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.entries.insert(name.into(), path.into());
        self
    }

    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = dir.into();
        self
    }

    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    pub fn empty_out_dir(mut self, enabled: bool) -> Self {
        self.empty_out_dir = enabled;
        self
    }

    pub fn split_chunks(mut self, enabled: bool) -> Self {
        self.split_chunks = enabled;
        self
    }

    pub fn assets_dir(mut self, dir: impl Into<String>) -> Self {
        self.assets_dir = dir.into();
        self
    }

    pub fn source_maps(mut self, enabled: bool) -> Self {
        self.source_maps = enabled;
        self
    }

    pub fn css_combined(mut self, enabled: bool) -> Self {
        self.css_combined = enabled;
        self
    }

    pub fn entry_file_names(mut self, pattern: impl Into<String>) -> Self {
        self.entry_file_names = pattern.into();
        self
    }

    pub fn chunk_file_names(mut self, pattern: impl Into<String>) -> Self {
        self.chunk_file_names = pattern.into();
        self
    }

    pub fn asset_file_names(mut self, pattern: impl Into<String>) -> Self {
        self.asset_file_names = pattern.into();
        self
    }

    pub fn external<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.external.extend(names.into_iter().map(Into::into));
        self
    }

    /// Absolute, cleaned project root.
    pub fn root_dir(&self) -> Result<PathBuf> {
        absolutize(&self.root)
    }

    /// Absolute, cleaned output directory.
    pub fn output_dir(&self) -> Result<PathBuf> {
        if self.out_dir.is_absolute() {
            Ok(self.out_dir.clean())
        } else {
            Ok(self.root_dir()?.join(&self.out_dir).clean())
        }
    }

    /// Whether emitted references are relative to the referencing file.
    pub fn is_relative_base(&self) -> bool {
        self.base.is_empty() || self.base.starts_with("./") || self.base == "."
    }

    /// Check the configuration before any stage runs.
    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one entry is required".to_string(),
            ));
        }

        for name in self.entries.keys() {
            if name.trim().is_empty() {
                return Err(Error::InvalidConfig(
                    "entry names cannot be empty".to_string(),
                ));
            }
            if name.contains(['/', '\\']) || name.contains("..") {
                return Err(Error::InvalidConfig(format!(
                    "entry name '{}' must not contain path separators",
                    name
                )));
            }
        }

        for (field, pattern) in [
            ("entry_file_names", &self.entry_file_names),
            ("chunk_file_names", &self.chunk_file_names),
            ("asset_file_names", &self.asset_file_names),
        ] {
            if !pattern.contains("[name]") && !pattern.contains("[hash]") {
                return Err(Error::InvalidConfig(format!(
                    "{} pattern '{}' must contain [name] or [hash]",
                    field, pattern
                )));
            }
            if pattern.split('/').any(|part| part == "..") || pattern.starts_with('/') {
                return Err(Error::InvalidConfig(format!(
                    "{} pattern '{}' must stay inside the output directory",
                    field, pattern
                )));
            }
        }

        if self.assets_dir.split('/').any(|part| part == "..") || self.assets_dir.starts_with('/') {
            return Err(Error::InvalidConfig(format!(
                "assets_dir '{}' must stay inside the output directory",
                self.assets_dir
            )));
        }

        let root = self.root_dir()?;
        let out = self.output_dir()?;
        if root.starts_with(&out) {
            return Err(Error::InvalidConfig(format!(
                "output directory '{}' must not contain the project root '{}'",
                out.display(),
                root.display()
            )));
        }

        Ok(())
    }
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.clean());
    }
    let cwd = std::env::current_dir().map_err(|e| {
        Error::InvalidConfig(format!("Failed to get current directory: {}", e))
    })?;
    Ok(cwd.join(path).clean())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relocatable_preset_is_flat_and_relative() {
        let config = BuildConfig::relocatable("/project");
        assert!(config.is_relative_base());
        assert!(!config.split_chunks);
        assert!(config.css_combined);
        assert_eq!(config.assets_dir, "");
        assert_eq!(config.entry_file_names, "[name].js");
        assert_eq!(config.asset_file_names, "[name].[ext]");
        assert!(!config.source_maps);
    }

    #[test]
    fn default_uses_absolute_base() {
        let config = BuildConfig::default();
        assert!(!config.is_relative_base());
        assert!(config.empty_out_dir);
        assert!(config.split_chunks);
        assert_eq!(config.out_dir, PathBuf::from("dist"));
    }

    #[test]
    fn validate_requires_an_entry() {
        let err = BuildConfig::new("/project").validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn validate_rejects_out_dir_containing_root() {
        let config = BuildConfig::new("/project/app")
            .entry("index", "index.html")
            .out_dir("/project");
        assert!(config.validate().is_err());

        let config = BuildConfig::new("/project").entry("index", "index.html");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_escaping_patterns() {
        let config = BuildConfig::new("/project")
            .entry("index", "index.html")
            .entry_file_names("../[name].js");
        assert!(config.validate().is_err());

        let config = BuildConfig::new("/project")
            .entry("index", "index.html")
            .asset_file_names("static.bin");
        assert!(config.validate().is_err());
    }

    #[test]
    fn output_dir_resolves_against_root() {
        let config = BuildConfig::new("/project").out_dir("build/../dist");
        assert_eq!(config.output_dir().unwrap(), PathBuf::from("/project/dist"));
    }

    #[test]
    fn entries_keep_declaration_order() {
        let config = BuildConfig::new("/p")
            .entry("b", "b.html")
            .entry("a", "a.html");
        let names: Vec<_> = config.entries.keys().cloned().collect();
        assert_eq!(names, ["b", "a"]);
    }
}
