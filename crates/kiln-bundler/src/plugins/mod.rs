//! Plugin contract and built-in plugins.
//!
//! A [`Plugin`] implements any subset of the lifecycle hooks. Every hook has a
//! no-op default, and [`Plugin::hook_usage`] tells the driver which hooks are
//! worth calling. Plugins run in registration order (see [`PluginRegistry`]).
//!
//! | hook | stage | composition |
//! |---|---|---|
//! | `resolve_id` | resolving / transforming | first `Some` wins |
//! | `load` | transforming | first `Some` wins |
//! | `transform` | transforming | each sees the previous output |
//! | `generate_bundle` | emitting | all run; may emit assets |
//! | `close_bundle` | closed | all run after the bundle is written |

mod copy_file;
mod driver;
mod registry;
mod virtual_module;

pub use copy_file::CopyFilePlugin;
pub use driver::{PluginDriver, TransformedModule};
pub use registry::PluginRegistry;
pub use virtual_module::VirtualModulePlugin;

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::graph::{ModuleId, ModuleKind};
use crate::output::BundleOutput;
use crate::{Error, Result};

/// Result type returned by hooks. Errors are converted to [`Error`] by the driver.
pub type HookResult<T> = anyhow::Result<T>;

bitflags::bitflags! {
    /// Hooks a plugin implements.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HookUsage: u8 {
        const RESOLVE_ID = 1 << 0;
        const LOAD = 1 << 1;
        const TRANSFORM = 1 << 2;
        const GENERATE_BUNDLE = 1 << 3;
        const CLOSE_BUNDLE = 1 << 4;
    }
}

/// A build plugin.
#[async_trait]
pub trait Plugin: Send + Sync + fmt::Debug {
    fn name(&self) -> Cow<'static, str>;

    /// Hooks the driver should call. Defaults to all of them.
    fn hook_usage(&self) -> HookUsage {
        HookUsage::all()
    }

    /// Claim a specifier. Returning `Some` stops resolution for it.
    async fn resolve_id(
        &self,
        _ctx: &PluginContext,
        _specifier: &str,
        _importer: Option<&ModuleId>,
    ) -> HookResult<Option<ResolveIdOutput>> {
        Ok(None)
    }

    /// Provide a module's content. `None` defers to later plugins and the filesystem.
    async fn load(&self, _ctx: &PluginContext, _id: &ModuleId) -> HookResult<Option<LoadOutput>> {
        Ok(None)
    }

    /// Rewrite a module's code. `None` leaves it unchanged.
    async fn transform(
        &self,
        _ctx: &PluginContext,
        _code: &str,
        _id: &ModuleId,
    ) -> HookResult<Option<TransformOutput>> {
        Ok(None)
    }

    /// Observe the generated bundle before it is written.
    async fn generate_bundle(&self, _ctx: &PluginContext, _bundle: &BundleOutput) -> HookResult<()> {
        Ok(())
    }

    /// Runs once the output directory holds the complete bundle.
    async fn close_bundle(&self, _ctx: &CloseContext) -> HookResult<()> {
        Ok(())
    }
}

/// Result of a `resolve_id` hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveIdOutput {
    pub id: String,
    pub external: bool,
}

impl ResolveIdOutput {
    pub fn module(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            external: false,
        }
    }

    pub fn external(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            external: true,
        }
    }
}

/// Result of a `load` hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutput {
    pub code: String,
    pub kind: Option<ModuleKind>,
}

impl LoadOutput {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: ModuleKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Result of a `transform` hook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOutput {
    pub code: String,
    /// Overrides the kind derived from the module's extension.
    pub kind: Option<ModuleKind>,
    /// Specifiers discovered by the plugin that the scanner cannot see.
    pub imports: Vec<String>,
}

impl TransformOutput {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: ModuleKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_import(mut self, specifier: impl Into<String>) -> Self {
        self.imports.push(specifier.into());
        self
    }
}

/// An asset added by a plugin rather than discovered in the module graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedAsset {
    /// Logical name; `[name]` and `[ext]` are derived from it.
    pub name: String,
    /// Exact output filename, bypassing the asset pattern.
    pub file_name: Option<String>,
    pub source: Vec<u8>,
}

/// Assets emitted so far, with the name of the emitting plugin.
pub(crate) type EmittedAssets = Arc<Mutex<Vec<(String, EmittedAsset)>>>;

/// Handle given to every pre-write hook.
#[derive(Debug, Clone)]
pub struct PluginContext {
    plugin: Arc<str>,
    root: Arc<Path>,
    emitted: EmittedAssets,
    sealed: Arc<AtomicBool>,
}

impl PluginContext {
    pub(crate) fn new(
        plugin: &str,
        root: &Path,
        emitted: EmittedAssets,
        sealed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            plugin: Arc::from(plugin),
            root: Arc::from(root),
            emitted,
            sealed,
        }
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Emit an asset named through the asset file-name pattern.
    pub fn emit_asset(&self, name: impl Into<String>, source: impl Into<Vec<u8>>) -> Result<()> {
        self.emit_file(EmittedAsset {
            name: name.into(),
            file_name: None,
            source: source.into(),
        })
    }

    /// Emit an asset. Fails once the bundle has started writing.
    pub fn emit_file(&self, asset: EmittedAsset) -> Result<()> {
        if self.sealed.load(Ordering::Acquire) {
            return Err(Error::Plugin {
                plugin: self.plugin.to_string(),
                hook: "emit_file",
                message: format!(
                    "cannot emit '{}' after the bundle has started writing",
                    asset.name
                ),
            });
        }
        tracing::debug!(plugin = %self.plugin, name = %asset.name, "asset emitted");
        self.emitted.lock().push((self.plugin.to_string(), asset));
        Ok(())
    }
}

/// Handle given to `close_bundle` hooks. Cannot emit.
#[derive(Debug, Clone)]
pub struct CloseContext {
    root: PathBuf,
    output_root: PathBuf,
    files: Vec<String>,
}

impl CloseContext {
    pub fn new(root: PathBuf, output_root: PathBuf, files: Vec<String>) -> Self {
        Self {
            root,
            output_root,
            files,
        }
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The fully written output directory.
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Filenames written, relative to the output root.
    pub fn files(&self) -> &[String] {
        &self.files
    }
}
