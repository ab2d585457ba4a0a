//! Runs plugin hooks in registration order and converts hook failures into
//! build errors.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::{
    CloseContext, EmittedAsset, EmittedAssets, HookUsage, LoadOutput, Plugin, PluginContext,
    PluginRegistry,
};
use crate::graph::{ModuleId, ModuleKind};
use crate::output::BundleOutput;
use crate::resolver::Resolution;
use crate::{Error, Result};

/// Output of the transform pipeline for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedModule {
    pub code: String,
    pub kind: Option<ModuleKind>,
    pub imports: Vec<String>,
}

/// Per-build hook runner.
#[derive(Debug)]
pub struct PluginDriver {
    plugins: Vec<(Arc<dyn Plugin>, HookUsage, PluginContext)>,
    emitted: EmittedAssets,
    sealed: Arc<AtomicBool>,
}

impl PluginDriver {
    pub fn new(registry: &PluginRegistry, root: &Path) -> Self {
        let emitted: EmittedAssets = Arc::new(Mutex::new(Vec::new()));
        let sealed = Arc::new(AtomicBool::new(false));
        let plugins = registry
            .iter()
            .map(|plugin| {
                let ctx = PluginContext::new(&plugin.name(), root, emitted.clone(), sealed.clone());
                (plugin.clone(), plugin.hook_usage(), ctx)
            })
            .collect();
        Self {
            plugins,
            emitted,
            sealed,
        }
    }

    fn using(
        &self,
        hook: HookUsage,
    ) -> impl Iterator<Item = &(Arc<dyn Plugin>, HookUsage, PluginContext)> {
        self.plugins
            .iter()
            .filter(move |(_, usage, _)| usage.contains(hook))
    }

    /// First plugin to claim the specifier wins.
    pub async fn resolve_id(
        &self,
        specifier: &str,
        importer: Option<&ModuleId>,
    ) -> Result<Option<Resolution>> {
        for (plugin, _, ctx) in self.using(HookUsage::RESOLVE_ID) {
            let claimed = plugin
                .resolve_id(ctx, specifier, importer)
                .await
                .map_err(|e| Error::Plugin {
                    plugin: plugin.name().into_owned(),
                    hook: "resolve_id",
                    message: format!("{specifier}: {e:#}"),
                })?;
            if let Some(output) = claimed {
                tracing::debug!(plugin = %plugin.name(), specifier, id = %output.id, "resolved by plugin");
                return Ok(Some(if output.external {
                    Resolution::External
                } else {
                    Resolution::Module(ModuleId::new(output.id))
                }));
            }
        }
        Ok(None)
    }

    /// First plugin to provide content wins.
    pub async fn load(&self, id: &ModuleId) -> Result<Option<LoadOutput>> {
        for (plugin, _, ctx) in self.using(HookUsage::LOAD) {
            let loaded = plugin.load(ctx, id).await.map_err(|e| Error::Load {
                id: id.to_string(),
                message: format!("plugin '{}' failed: {e:#}", plugin.name()),
            })?;
            if let Some(output) = loaded {
                tracing::debug!(plugin = %plugin.name(), %id, "loaded by plugin");
                return Ok(Some(output));
            }
        }
        Ok(None)
    }

    /// Every transform hook in order, each receiving the previous output.
    pub async fn transform(&self, code: String, id: &ModuleId) -> Result<TransformedModule> {
        let mut current = TransformedModule {
            code,
            kind: None,
            imports: Vec::new(),
        };
        for (plugin, _, ctx) in self.using(HookUsage::TRANSFORM) {
            let output = plugin
                .transform(ctx, &current.code, id)
                .await
                .map_err(|e| Error::Transform {
                    id: id.to_string(),
                    plugin: plugin.name().into_owned(),
                    message: format!("{e:#}"),
                })?;
            if let Some(output) = output {
                tracing::debug!(plugin = %plugin.name(), %id, "transformed");
                current.code = output.code;
                if output.kind.is_some() {
                    current.kind = output.kind;
                }
                current.imports.extend(output.imports);
            }
        }
        Ok(current)
    }

    pub async fn generate_bundle(&self, bundle: &BundleOutput) -> Result<()> {
        for (plugin, _, ctx) in self.using(HookUsage::GENERATE_BUNDLE) {
            plugin
                .generate_bundle(ctx, bundle)
                .await
                .map_err(|e| Error::Plugin {
                    plugin: plugin.name().into_owned(),
                    hook: "generate_bundle",
                    message: format!("{e:#}"),
                })?;
        }
        Ok(())
    }

    /// Stop accepting emitted assets and hand over everything emitted so far.
    pub fn seal(&self) -> Vec<(String, EmittedAsset)> {
        self.sealed.store(true, Ordering::Release);
        std::mem::take(&mut *self.emitted.lock())
    }

    /// Run every post-write hook; failures are collected, not short-circuited.
    pub async fn close_bundle(&self, ctx: &CloseContext) -> Vec<Error> {
        let mut errors = Vec::new();
        for (plugin, _, _) in self.using(HookUsage::CLOSE_BUNDLE) {
            if let Err(e) = plugin.close_bundle(ctx).await {
                let error = Error::PostWriteHook {
                    plugin: plugin.name().into_owned(),
                    message: format!("{e:#}"),
                };
                tracing::warn!("{}", error);
                errors.push(error);
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::{ResolveIdOutput, TransformOutput};
    use async_trait::async_trait;
    use std::borrow::Cow;

    #[derive(Debug)]
    struct Claim {
        name: &'static str,
        prefix: &'static str,
    }

    #[async_trait]
    impl Plugin for Claim {
        fn name(&self) -> Cow<'static, str> {
            Cow::Borrowed(self.name)
        }

        fn hook_usage(&self) -> HookUsage {
            HookUsage::RESOLVE_ID
        }

        async fn resolve_id(
            &self,
            _ctx: &PluginContext,
            specifier: &str,
            _importer: Option<&ModuleId>,
        ) -> anyhow::Result<Option<ResolveIdOutput>> {
            Ok(specifier
                .starts_with(self.prefix)
                .then(|| ResolveIdOutput::module(format!("\0{}:{}", self.name, specifier))))
        }
    }

    #[derive(Debug)]
    struct Append(&'static str);

    #[async_trait]
    impl Plugin for Append {
        fn name(&self) -> Cow<'static, str> {
            Cow::Borrowed(self.0)
        }

        async fn transform(
            &self,
            _ctx: &PluginContext,
            code: &str,
            _id: &ModuleId,
        ) -> anyhow::Result<Option<TransformOutput>> {
            Ok(Some(
                TransformOutput::new(format!("{code}+{}", self.0)).with_import(self.0),
            ))
        }
    }

    #[derive(Debug)]
    struct Reject;

    #[async_trait]
    impl Plugin for Reject {
        fn name(&self) -> Cow<'static, str> {
            Cow::Borrowed("reject")
        }

        async fn transform(
            &self,
            _ctx: &PluginContext,
            _code: &str,
            _id: &ModuleId,
        ) -> anyhow::Result<Option<TransformOutput>> {
            anyhow::bail!("unexpected token")
        }
    }

    fn driver(plugins: Vec<Arc<dyn Plugin>>) -> PluginDriver {
        let mut registry = PluginRegistry::new();
        for plugin in plugins {
            registry.add_shared(plugin);
        }
        PluginDriver::new(&registry, Path::new("/project"))
    }

    #[tokio::test]
    async fn first_resolve_claim_wins() {
        let driver = driver(vec![
            Arc::new(Claim { name: "first", prefix: "virtual:" }),
            Arc::new(Claim { name: "second", prefix: "virtual:" }),
        ]);
        let resolved = driver.resolve_id("virtual:a", None).await.unwrap();
        assert_eq!(
            resolved,
            Some(Resolution::Module(ModuleId::new("\0first:virtual:a")))
        );
        assert_eq!(driver.resolve_id("./x.js", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn transforms_compose_in_registration_order() {
        let driver = driver(vec![Arc::new(Append("a")), Arc::new(Append("b"))]);
        let out = driver
            .transform("src".to_string(), &ModuleId::new("/p/x.js"))
            .await
            .unwrap();
        assert_eq!(out.code, "src+a+b");
        assert_eq!(out.imports, ["a", "b"]);
    }

    #[tokio::test]
    async fn transform_error_names_module_and_plugin() {
        let driver = driver(vec![Arc::new(Append("a")), Arc::new(Reject)]);
        let err = driver
            .transform("src".to_string(), &ModuleId::new("/p/x.js"))
            .await
            .unwrap_err();
        match err {
            Error::Transform { id, plugin, message } => {
                assert_eq!(id, "/p/x.js");
                assert_eq!(plugin, "reject");
                assert!(message.contains("unexpected token"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn hook_usage_filters_calls() {
        // Claim only declares RESOLVE_ID, so its default transform is never reached.
        let driver = driver(vec![Arc::new(Claim { name: "c", prefix: "x" })]);
        assert_eq!(driver.using(HookUsage::TRANSFORM).count(), 0);
        assert_eq!(driver.using(HookUsage::RESOLVE_ID).count(), 1);
    }

    #[tokio::test]
    async fn sealing_rejects_late_emits() {
        let driver = driver(vec![Arc::new(Append("a"))]);
        let ctx = driver.plugins[0].2.clone();
        ctx.emit_asset("early.txt", "1").unwrap();
        let emitted = driver.seal();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].0, "a");
        assert!(ctx.emit_asset("late.txt", "2").is_err());
    }
}
