#![cfg_attr(docsrs, feature(doc_cfg))]

//! # kiln-bundler
//!
//! Build-pipeline orchestrator that turns a graph of source modules and one or
//! more entry points (typically an HTML page) into a self-contained, relocatable
//! static bundle.
//!
//! The pipeline runs through a fixed set of stages (see [`lifecycle`]):
//! entries are resolved, the module graph is walked and transformed by the
//! registered plugins, chunks and assets are named and their references
//! rewritten, the bundle is written, and finally post-write hooks observe the
//! completed output directory.
//!
//! ## Quick Start
//!
//! ```no_run
//! use kiln_bundler::{BuildConfig, Bundler, plugins::CopyFilePlugin};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BuildConfig::relocatable(".")
//!     .entry("index", "index.html")
//!     .out_dir("dist");
//!
//! let result = Bundler::new(config)
//!     .plugin(CopyFilePlugin::new("manifest.json"))
//!     .build()
//!     .await?;
//!
//! for file in result.output.iter() {
//!     println!("{}", file.filename);
//! }
//! # Ok(()) }
//! ```

pub mod build;
pub mod config;
pub mod emit;
pub mod graph;
pub mod lifecycle;
pub mod output;
pub mod plugins;
pub mod resolver;
pub mod runtime;

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub use logging::{LogLevel, init_logging, init_logging_from_env};

pub use build::{BuildResult, Bundler};
pub use config::BuildConfig;
pub use graph::{ImportKind, ImportRecord, Module, ModuleGraph, ModuleId, ModuleKind};
pub use lifecycle::{BuildStage, Lifecycle};
pub use output::{BundleOutput, OutputFile, OutputKind};
pub use plugins::{
    CloseContext, EmittedAsset, HookUsage, LoadOutput, Plugin, PluginContext, PluginRegistry,
    ResolveIdOutput, TransformOutput,
};
pub use resolver::{PathResolver, Resolution, relative_url};
pub use runtime::{NativeRuntime, Runtime, RuntimeError};

use std::path::PathBuf;

/// Error types for kiln-bundler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A specifier could not be mapped to a module.
    #[error("Failed to resolve '{specifier}' imported from {importer}")]
    Resolution { specifier: String, importer: String },

    /// A resolved module could not be read.
    #[error("Failed to load {id}: {message}")]
    Load { id: String, message: String },

    /// A script module is not valid JavaScript after its transforms ran.
    #[error("Failed to parse {id}: {message}")]
    Parse { id: String, message: String },

    /// A plugin's transform hook rejected a module.
    #[error("Plugin '{plugin}' failed to transform {id}: {message}")]
    Transform {
        id: String,
        plugin: String,
        message: String,
    },

    /// A plugin hook outside the per-module pipeline failed.
    #[error("Plugin '{plugin}' failed in {hook}: {message}")]
    Plugin {
        plugin: String,
        hook: &'static str,
        message: String,
    },

    /// Two outputs computed the same filename.
    #[error("Output filename '{filename}' is produced by both {first} and {second}")]
    NamingCollision {
        filename: String,
        first: String,
        second: String,
    },

    /// Filesystem failure while flushing the bundle.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A post-write hook failed after the bundle was written.
    #[error("Post-write hook of plugin '{plugin}' failed: {message}")]
    PostWriteHook { plugin: String, message: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid output path (e.g., directory traversal attempt).
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    /// A stage transition that does not move strictly forward.
    #[error("Invalid lifecycle transition from {from} to {to}")]
    Lifecycle { from: BuildStage, to: BuildStage },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for kiln-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the error was raised before the writing stage began.
    ///
    /// Such failures never touch the output directory.
    pub fn is_pre_write(&self) -> bool {
        matches!(
            self,
            Error::Resolution { .. }
                | Error::Load { .. }
                | Error::Parse { .. }
                | Error::Transform { .. }
                | Error::Plugin { .. }
                | Error::NamingCollision { .. }
                | Error::InvalidConfig(_)
        )
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Resolution { .. } => "kiln::resolution",
            Error::Load { .. } => "kiln::load",
            Error::Parse { .. } => "kiln::parse",
            Error::Transform { .. } => "kiln::transform",
            Error::Plugin { .. } => "kiln::plugin",
            Error::NamingCollision { .. } => "kiln::naming_collision",
            Error::Write { .. } => "kiln::write",
            Error::PostWriteHook { .. } => "kiln::post_write_hook",
            Error::InvalidConfig(_) => "kiln::invalid_config",
            Error::InvalidOutputPath(_) => "kiln::invalid_output_path",
            Error::Lifecycle { .. } => "kiln::lifecycle",
            Error::Io(_) => "kiln::io",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        match self {
            Error::PostWriteHook { .. } => Some(miette::Severity::Warning),
            _ => Some(miette::Severity::Error),
        }
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::Resolution { specifier, .. } if !specifier.starts_with('.') && !specifier.starts_with('/') => {
                Some(Box::new(format!(
                    "'{}' is a bare specifier. Package resolution is not supported; add it to `external` or use a relative path.",
                    specifier
                )))
            }
            Error::Resolution { .. } => Some(Box::new(
                "Check that the file exists and the path is correct.",
            )),
            Error::Parse { .. } => Some(Box::new(
                "Scripts must be plain JavaScript once transforms have run; add a plugin for other syntaxes.",
            )),
            Error::NamingCollision { .. } => Some(Box::new(
                "Rename one of the sources, or add [hash] to the file name patterns.",
            )),
            Error::Write { .. } => Some(Box::new(
                "Check disk space and permissions. The output directory may be partially written.",
            )),
            Error::PostWriteHook { .. } => Some(Box::new(
                "The bundle was written successfully; only the post-write action failed.",
            )),
            Error::InvalidOutputPath(path) => Some(Box::new(format!(
                "The output path '{}' is invalid. Ensure it stays within the output directory and doesn't contain '..' components.",
                path
            ))),
            Error::InvalidConfig(msg) => Some(Box::new(format!(
                "Check your configuration file for mistakes.\nError: {}",
                msg
            ))),
            _ => None,
        }
    }
}
