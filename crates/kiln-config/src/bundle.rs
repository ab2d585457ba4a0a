//! The `[build]` table.
//!
//! Every layout setting is optional: unset fields fall back to the selected
//! [`Preset`], so a file only states what differs from it.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use kiln_bundler::BuildConfig;
use kiln_bundler::plugins::CopyFilePlugin;
use serde::{Deserialize, Serialize};

/// Named starting point for the layout settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Hashed names under `assets/`, shared chunks split out, served from `/`.
    #[default]
    Default,
    /// Flat `[name].js` / `[name].[ext]` output addressed relative to the
    /// output directory, one chunk per entry, one combined stylesheet.
    Relocatable,
}

impl Preset {
    pub fn build_config(self, root: impl Into<PathBuf>) -> BuildConfig {
        match self {
            Preset::Default => BuildConfig::new(root),
            Preset::Relocatable => BuildConfig::relocatable(root),
        }
    }
}

/// A file copied into the output directory after the bundle is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyOptions {
    /// Source, relative to the project root.
    pub from: PathBuf,
    /// Destination relative to the output directory. Defaults to `from`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<PathBuf>,
}

impl CopyOptions {
    pub fn new(from: impl Into<PathBuf>) -> Self {
        Self {
            from: from.into(),
            to: None,
        }
    }

    pub fn plugin(&self) -> CopyFilePlugin {
        let plugin = CopyFilePlugin::new(&self.from);
        match &self.to {
            Some(to) => plugin.to(to),
            None => plugin,
        }
    }
}

/// Build settings as written in configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleOptions {
    #[serde(default)]
    pub preset: Preset,

    /// Project root, relative to the directory holding the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Entry name -> source path, in declaration order.
    #[serde(default)]
    pub entries: IndexMap<String, PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_out_dir: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_chunks: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets_dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_maps: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css_combined: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_file_names: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_file_names: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_file_names: Option<String>,

    /// Bare specifiers left untouched in the output.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external: Vec<String>,

    /// Files copied verbatim after the bundle is written, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub copy: Vec<CopyOptions>,
}

impl BundleOptions {
    /// Project root for a config that lives in `config_dir`.
    pub fn root_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => config_dir.join(root),
            None => config_dir.to_path_buf(),
        }
    }

    /// The core build settings: the preset, then every field set here.
    pub fn to_build_config(&self, config_dir: &Path) -> BuildConfig {
        let mut config = self.preset.build_config(self.root_dir(config_dir));
        config.entries = self.entries.clone();

        if let Some(out_dir) = &self.out_dir {
            config.out_dir = out_dir.clone();
        }
        if let Some(base) = &self.base {
            config.base = base.clone();
        }
        if let Some(empty) = self.empty_out_dir {
            config.empty_out_dir = empty;
        }
        if let Some(split) = self.split_chunks {
            config.split_chunks = split;
        }
        if let Some(dir) = &self.assets_dir {
            config.assets_dir = dir.clone();
        }
        if let Some(maps) = self.source_maps {
            config.source_maps = maps;
        }
        if let Some(combined) = self.css_combined {
            config.css_combined = combined;
        }
        if let Some(pattern) = &self.entry_file_names {
            config.entry_file_names = pattern.clone();
        }
        if let Some(pattern) = &self.chunk_file_names {
            config.chunk_file_names = pattern.clone();
        }
        if let Some(pattern) = &self.asset_file_names {
            config.asset_file_names = pattern.clone();
        }
        config.external = self.external.clone();
        config
    }

    /// One [`CopyFilePlugin`] per `copy` item, in order.
    pub fn copy_plugins(&self) -> Vec<CopyFilePlugin> {
        self.copy.iter().map(CopyOptions::plugin).collect()
    }
}
