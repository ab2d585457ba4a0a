//! Plugin serving in-memory modules.
//!
//! Ids are resolved to themselves behind a `\0` marker so they can never be
//! confused with files on disk. Useful for generated entry code, injected
//! configuration, and tests that should not touch the filesystem.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;

use super::{HookUsage, LoadOutput, Plugin, PluginContext, ResolveIdOutput};
use crate::graph::{ModuleId, ModuleKind};

#[derive(Debug, Clone, Default)]
pub struct VirtualModulePlugin {
    modules: Arc<FxHashMap<String, String>>,
}

impl VirtualModulePlugin {
    pub fn new<I, K, V>(modules: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            modules: Arc::new(
                modules
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    fn key<'a>(id: &'a ModuleId) -> Option<&'a str> {
        id.as_str().strip_prefix('\0')
    }
}

#[async_trait]
impl Plugin for VirtualModulePlugin {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("virtual-modules")
    }

    fn hook_usage(&self) -> HookUsage {
        HookUsage::RESOLVE_ID | HookUsage::LOAD
    }

    async fn resolve_id(
        &self,
        _ctx: &PluginContext,
        specifier: &str,
        _importer: Option<&ModuleId>,
    ) -> anyhow::Result<Option<ResolveIdOutput>> {
        Ok(self
            .modules
            .contains_key(specifier)
            .then(|| ResolveIdOutput::module(format!("\0{}", specifier))))
    }

    async fn load(&self, _ctx: &PluginContext, id: &ModuleId) -> anyhow::Result<Option<LoadOutput>> {
        let Some(code) = Self::key(id).and_then(|key| self.modules.get(key)) else {
            return Ok(None);
        };
        let kind = match ModuleKind::of(id) {
            // Extensionless virtual ids are code, not assets.
            ModuleKind::Asset if id.extension().is_none() => ModuleKind::Script,
            kind => kind,
        };
        Ok(Some(LoadOutput::new(code.clone()).with_kind(kind)))
    }
}
