//! Breadth-first graph construction.
//!
//! Each wave of newly discovered modules is loaded, transformed and scanned
//! concurrently; results are merged in wave order so the graph is identical
//! from run to run. A module id enters the queue at most once, which both
//! deduplicates shared imports and terminates cycles. Inline module scripts
//! found in HTML pages join the next wave with their source attached.

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::task::JoinSet;

use super::module::{ImportKind, ImportRecord, Module, ModuleId, ModuleKind, ScriptFacts};
use super::{ModuleGraph, scanner};
use crate::plugins::PluginDriver;
use crate::resolver::{PathResolver, Resolution};
use crate::runtime::Runtime;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct GraphBuilder {
    ctx: Arc<LoadContext>,
}

/// A processed module and the inline scripts it declared.
type Processed = (Module, Vec<(ModuleId, String)>);

#[derive(Debug)]
struct LoadContext {
    resolver: PathResolver,
    driver: Arc<PluginDriver>,
    runtime: Arc<dyn Runtime>,
}

impl GraphBuilder {
    pub fn new(resolver: PathResolver, driver: Arc<PluginDriver>, runtime: Arc<dyn Runtime>) -> Self {
        Self {
            ctx: Arc::new(LoadContext {
                resolver,
                driver,
                runtime,
            }),
        }
    }

    /// Resolve every configured entry to a module id.
    pub async fn resolve_entries(
        &self,
        entries: &IndexMap<String, PathBuf>,
    ) -> Result<IndexMap<String, ModuleId>> {
        let mut resolved = IndexMap::with_capacity(entries.len());
        for (name, path) in entries {
            let specifier = path.to_string_lossy();
            match self.ctx.resolve(&specifier, None).await {
                Ok(Resolution::Module(id)) => {
                    tracing::debug!(entry = %name, %id, "entry resolved");
                    resolved.insert(name.clone(), id);
                }
                Ok(Resolution::External) => {
                    return Err(Error::InvalidConfig(format!(
                        "entry '{}' resolves to an external URL ({})",
                        name, specifier
                    )));
                }
                Err(Error::Resolution { specifier, .. }) => {
                    return Err(Error::Resolution {
                        specifier,
                        importer: format!("entry '{}'", name),
                    });
                }
                Err(other) => return Err(other),
            }
        }
        Ok(resolved)
    }

    /// Walk the graph from the resolved entries.
    pub async fn build(&self, entries: IndexMap<String, ModuleId>) -> Result<ModuleGraph> {
        let entry_ids: FxHashSet<ModuleId> = entries.values().cloned().collect();
        let mut seen = entry_ids.clone();
        let mut wave: Vec<(ModuleId, Option<String>)> = Vec::new();
        for id in entries.values() {
            if !wave.iter().any(|(queued, _)| queued == id) {
                wave.push((id.clone(), None));
            }
        }

        let mut graph = ModuleGraph::new(entries);
        let mut depth = 0usize;

        while !wave.is_empty() {
            tracing::debug!(depth, modules = wave.len(), "processing wave");
            let mut tasks = JoinSet::new();
            let count = wave.len();
            for (index, (id, inline)) in wave.into_iter().enumerate() {
                let ctx = self.ctx.clone();
                let is_entry = entry_ids.contains(&id);
                tasks.spawn(async move { (index, ctx.process(id, is_entry, inline).await) });
            }

            let mut results: Vec<Option<Result<Processed>>> = (0..count).map(|_| None).collect();
            while let Some(joined) = tasks.join_next().await {
                let (index, result) = joined.map_err(|e| Error::Load {
                    id: "module worker".to_string(),
                    message: e.to_string(),
                })?;
                results[index] = Some(result);
            }

            let mut next = Vec::new();
            for result in results.into_iter().flatten() {
                let (module, inline) = result?;
                let mut inline: FxHashMap<ModuleId, String> = inline.into_iter().collect();
                for dep in module.dependencies() {
                    if seen.insert(dep.clone()) {
                        next.push((dep.clone(), inline.remove(dep)));
                    }
                }
                graph.insert(module);
            }
            wave = next;
            depth += 1;
        }

        tracing::info!(modules = graph.len(), "module graph built");
        Ok(graph)
    }
}

impl LoadContext {
    /// Plugins first, then the filesystem resolver. URLs no plugin claims
    /// stay external.
    async fn resolve(&self, specifier: &str, importer: Option<&ModuleId>) -> Result<Resolution> {
        if let Some(resolution) = self.driver.resolve_id(specifier, importer).await? {
            return Ok(resolution);
        }
        self.resolver.resolve(specifier, importer)
    }

    /// Module bytes from the load hooks, else from the runtime.
    async fn load(&self, id: &ModuleId) -> Result<(Vec<u8>, Option<ModuleKind>)> {
        if let Some(output) = self.driver.load(id).await? {
            return Ok((output.code.into_bytes(), output.kind));
        }
        let path = id.as_path().ok_or_else(|| Error::Load {
            id: id.to_string(),
            message: "no plugin provided content for this virtual module".to_string(),
        })?;
        let bytes = self.runtime.read_file(path).await.map_err(|e| Error::Load {
            id: id.to_string(),
            message: e.to_string(),
        })?;
        Ok((bytes, None))
    }

    /// Load, transform, scan and resolve one module. `inline` carries the
    /// source of an inline script, which has nothing to load.
    async fn process(
        &self,
        id: ModuleId,
        is_entry: bool,
        inline: Option<String>,
    ) -> Result<Processed> {
        let (raw, loaded_kind) = match inline {
            Some(source) => (source.into_bytes(), Some(ModuleKind::Script)),
            None => self.load(&id).await?,
        };
        let mut kind = loaded_kind.unwrap_or_else(|| ModuleKind::of(&id));

        let Ok(text) = std::str::from_utf8(&raw).map(str::to_owned) else {
            tracing::debug!(%id, bytes = raw.len(), "binary module");
            let module = Module {
                id,
                kind: ModuleKind::Asset,
                raw,
                code: None,
                imports: Vec::new(),
                script: ScriptFacts::default(),
                is_entry,
            };
            return Ok((module, Vec::new()));
        };

        let transformed = self.driver.transform(text, &id).await?;
        if let Some(overridden) = transformed.kind {
            kind = overridden;
        }

        let scan = scanner::scan(&id, kind, &transformed.code)?;
        let mut imports = Vec::with_capacity(scan.imports.len() + transformed.imports.len());
        let mut inline_scripts = Vec::new();
        for found in scan.imports {
            let resolved = if found.kind == ImportKind::HtmlInlineScript {
                let script_id = ModuleId::new(format!("{}{}", id.as_str(), found.specifier));
                let body = transformed.code[found.span.clone()].to_string();
                inline_scripts.push((script_id.clone(), body));
                Resolution::Module(script_id)
            } else {
                self.resolve(&found.specifier, Some(&id)).await?
            };
            imports.push(ImportRecord {
                specifier: found.specifier,
                kind: found.kind,
                span: Some(found.span),
                statement: Some(found.statement),
                clause: found.clause,
                resolved,
            });
        }
        for specifier in transformed.imports {
            let resolved = self.resolve(&specifier, Some(&id)).await?;
            imports.push(ImportRecord {
                specifier,
                kind: ImportKind::Plugin,
                span: None,
                statement: None,
                clause: None,
                resolved,
            });
        }

        tracing::debug!(%id, ?kind, imports = imports.len(), "module processed");
        let module = Module {
            id,
            kind,
            raw,
            code: Some(transformed.code),
            imports,
            script: scan.script,
            is_entry,
        };
        Ok((module, inline_scripts))
    }
}
