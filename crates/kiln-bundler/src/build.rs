//! Build orchestration.
//!
//! [`Bundler`] drives one build through every [`BuildStage`]:
//!
//! 1. **Resolving**: entry specifiers become module ids.
//! 2. **Transforming**: the module graph is loaded, transformed and scanned.
//! 3. **Emitting**: outputs are named and rendered, `generate_bundle` hooks
//!    run, and assets emitted by plugins join the bundle.
//! 4. **Writing**: the output directory is (optionally) emptied and filled.
//! 5. **Closed**: `close_bundle` hooks observe the finished directory.
//!
//! Any failure before Writing leaves the output directory exactly as it was.
//! A failing post-write hook does not fail the build; it is reported in
//! [`BuildResult::post_write_errors`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::BuildConfig;
use crate::emit::Emitter;
use crate::graph::GraphBuilder;
use crate::lifecycle::{BuildStage, Lifecycle};
use crate::output::{BundleOutput, OutputFile, OutputKind, write_bundle};
use crate::plugins::{CloseContext, Plugin, PluginDriver, PluginRegistry};
use crate::resolver::PathResolver;
use crate::runtime::{NativeRuntime, Runtime};
use crate::{Error, Result};

/// Outcome of a build that reached the output directory.
#[derive(Debug)]
pub struct BuildResult {
    /// Everything that was written.
    pub output: BundleOutput,
    /// Absolute output directory.
    pub out_dir: PathBuf,
    /// Absolute paths of the written files, in output order.
    pub written: Vec<PathBuf>,
    /// Failures of `close_bundle` hooks. The bundle itself is complete.
    pub post_write_errors: Vec<Error>,
    pub module_count: usize,
    pub duration: Duration,
}

impl BuildResult {
    /// No post-write hook failed.
    pub fn is_clean(&self) -> bool {
        self.post_write_errors.is_empty()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &OutputFile> {
        self.output.of_kind(OutputKind::Chunk)
    }

    pub fn assets(&self) -> impl Iterator<Item = &OutputFile> {
        self.output.of_kind(OutputKind::Asset)
    }

    pub fn total_size(&self) -> u64 {
        self.output.total_size()
    }
}

/// One configured build: settings, plugins and the filesystem to read from.
#[derive(Debug, Clone)]
pub struct Bundler {
    config: BuildConfig,
    plugins: PluginRegistry,
    runtime: Arc<dyn Runtime>,
}

impl Bundler {
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            plugins: PluginRegistry::new(),
            runtime: Arc::new(NativeRuntime),
        }
    }

    /// Register a plugin. Plugins run in registration order.
    pub fn plugin<P: Plugin + 'static>(mut self, plugin: P) -> Self {
        self.plugins.add(plugin);
        self
    }

    /// Register every plugin of `registry` after the ones already present.
    pub fn plugins(mut self, registry: PluginRegistry) -> Self {
        for plugin in registry.iter() {
            self.plugins.add_shared(plugin.clone());
        }
        self
    }

    /// Read sources through `runtime` instead of the local filesystem.
    pub fn with_runtime(mut self, runtime: Arc<dyn Runtime>) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Run every stage up to and including Emitting, without touching disk.
    pub async fn generate(&self) -> Result<BundleOutput> {
        self.config.validate()?;
        let root = self.config.root_dir()?;
        let out_dir = self.config.output_dir()?;
        let driver = Arc::new(PluginDriver::new(&self.plugins, &root));
        let mut lifecycle = Lifecycle::new();

        let (output, _) = self.generate_with(&mut lifecycle, &root, &out_dir, &driver).await?;
        Ok(output)
    }

    /// Run the full build and write the bundle.
    pub async fn build(&self) -> Result<BuildResult> {
        let started = Instant::now();
        self.config.validate()?;
        let root = self.config.root_dir()?;
        let out_dir = self.config.output_dir()?;
        let driver = Arc::new(PluginDriver::new(&self.plugins, &root));
        let mut lifecycle = Lifecycle::new();

        let (output, module_count) = self
            .generate_with(&mut lifecycle, &root, &out_dir, &driver)
            .await?;

        lifecycle.advance(BuildStage::Writing)?;
        tracing::info!(
            out_dir = %out_dir.display(),
            files = output.len(),
            bytes = output.total_size(),
            "writing bundle"
        );
        let written = write_bundle(&output, &out_dir, self.config.empty_out_dir)?;

        lifecycle.advance(BuildStage::Closed)?;
        let ctx = CloseContext::new(root, out_dir.clone(), output.filenames());
        let post_write_errors = driver.close_bundle(&ctx).await;

        let duration = started.elapsed();
        tracing::info!(
            modules = module_count,
            files = written.len(),
            post_write_errors = post_write_errors.len(),
            duration_ms = duration.as_millis() as u64,
            "build complete"
        );

        Ok(BuildResult {
            output,
            out_dir,
            written,
            post_write_errors,
            module_count,
            duration,
        })
    }

    async fn generate_with(
        &self,
        lifecycle: &mut Lifecycle,
        root: &Path,
        out_dir: &Path,
        driver: &Arc<PluginDriver>,
    ) -> Result<(BundleOutput, usize)> {
        lifecycle.advance(BuildStage::Resolving)?;
        tracing::info!(
            root = %root.display(),
            entries = self.config.entries.len(),
            plugins = self.plugins.len(),
            "resolving entries"
        );
        let resolver = PathResolver::new(root, self.config.external.clone(), self.runtime.clone());
        let builder = GraphBuilder::new(resolver, driver.clone(), self.runtime.clone());
        let entries = builder.resolve_entries(&self.config.entries).await?;

        lifecycle.advance(BuildStage::Transforming)?;
        let graph = builder.build(entries).await?;

        lifecycle.advance(BuildStage::Emitting)?;
        let mut emitter = Emitter::new(&self.config, &graph, root.to_path_buf(), out_dir.to_path_buf());
        let mut output = emitter.emit()?;
        driver.generate_bundle(&output).await?;
        emitter.add_plugin_assets(&mut output, driver.seal())?;

        Ok((output, graph.len()))
    }
}

impl BuildConfig {
    /// Build with no plugins.
    pub async fn build(self) -> Result<BuildResult> {
        Bundler::new(self).build().await
    }
}
