//! Settings for one CLI build.
//!
//! Sources are layered with figment, lowest priority first:
//!
//! 1. [`BundleOptions`] defaults
//! 2. the config file (`--config`, else discovered in the project directory),
//!    with `--profile` applied
//! 3. `KILN_*` environment variables (`KILN_OUT_DIR`, `KILN_BASE`, ...)
//! 4. command-line flags
//!
//! `--entry` replaces the configured entries; `--copy` and `--external` add
//! to the configured lists.

mod loading;

use std::path::{Path, PathBuf};

use kiln_bundler::BuildConfig;
use kiln_config::BundleOptions;

pub use loading::load;

/// Resolved settings plus where they came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub options: BundleOptions,
    /// Directory relative paths in `options` are resolved against.
    pub base_dir: PathBuf,
    pub config_file: Option<PathBuf>,
}

impl LoadedConfig {
    pub fn root(&self) -> PathBuf {
        self.options.root_dir(&self.base_dir)
    }

    pub fn build_config(&self) -> BuildConfig {
        self.options.to_build_config(&self.base_dir)
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }
}
