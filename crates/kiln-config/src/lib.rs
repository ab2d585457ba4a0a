//! Configuration for kiln builds.
//!
//! A project is configured by a `kiln.toml` (or a `kiln` field in
//! `package.json`):
//!
//! ```toml
//! [build]
//! preset = "relocatable"
//! entries = { index = "index.html" }
//! copy = [{ from = "manifest.json" }]
//!
//! [profiles.debug.build]
//! source_maps = true
//! ```
//!
//! [`BundleOptions::to_build_config`] turns the `[build]` table into the
//! bundler's [`kiln_bundler::BuildConfig`].

pub mod bundle;
pub mod config;
pub mod discovery;
pub mod error;
pub mod validation;

pub use bundle::{BundleOptions, CopyOptions, Preset};
pub use config::{KilnConfig, ProfileConfig, merge_values};
pub use discovery::{CONFIG_FILE, ConfigDiscovery, discover, load_file};
pub use error::{ConfigError, Result};
pub use validation::{ConfigValidator, FsValidator, SchemaValidator, validate_fs, validate_schema};
