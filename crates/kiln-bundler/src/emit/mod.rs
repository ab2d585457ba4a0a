//! Bundle emission.
//!
//! [`Emitter`] plans the outputs for a finished [`ModuleGraph`], names every
//! output file, and renders each one with its references rewritten to the
//! final names. Naming runs to completion before any content is rendered:
//! assets first, then stylesheets, shared chunks and entry chunks (each may
//! embed the names of the previous groups in its hash), then HTML pages.
//! Every name goes through a [`NameRegistry`], so two outputs can never
//! silently claim the same file.

mod chunk;
mod html;
mod naming;
mod rewrite;
mod sourcemap;

pub use chunk::{BundlePlan, ChunkKind, ChunkPlan, EntryPlan, StylesheetPlan, plan};
pub use naming::{NameRegistry, content_hash, render_file_name, split_name};
pub use rewrite::{Edit, apply_edits};
pub use sourcemap::ChunkMap;

use std::path::PathBuf;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;

use self::rewrite::{
    CHUNK_RUNTIME, ChunkScope, RenderContext, init_binding, is_identifier, js_string, member,
    namespace_binding,
};
use crate::config::BuildConfig;
use crate::graph::{Module, ModuleGraph, ModuleId, ModuleKind};
use crate::output::{BundleOutput, OutputFile, OutputKind};
use crate::plugins::EmittedAsset;
use crate::resolver::{display_path, relative_path};
use crate::Result;

/// Names and renders the outputs of one build.
#[derive(Debug)]
pub struct Emitter<'a> {
    config: &'a BuildConfig,
    graph: &'a ModuleGraph,
    root: PathBuf,
    out_dir: PathBuf,
    names: NameRegistry,
}

impl<'a> Emitter<'a> {
    pub fn new(config: &'a BuildConfig, graph: &'a ModuleGraph, root: PathBuf, out_dir: PathBuf) -> Self {
        Self {
            config,
            graph,
            root,
            out_dir,
            names: NameRegistry::new(),
        }
    }

    /// Produce every output derived from the module graph.
    pub fn emit(&mut self) -> Result<BundleOutput> {
        let plan = chunk::plan(self.graph, self.config.split_chunks, self.config.css_combined);

        let asset_files = self.name_assets(&plan)?;
        let style_files = self.name_stylesheets(&plan, &asset_files)?;
        let chunk_files = self.name_chunks(&plan, &asset_files)?;
        let html_files = self.name_html(&plan)?;

        let ctx = RenderContext {
            graph: self.graph,
            plan: &plan,
            base: &self.config.base,
            chunk_files: &chunk_files,
            style_files: &style_files,
            asset_files: &asset_files,
        };

        let mut output = BundleOutput::default();
        for index in 0..plan.chunks.len() {
            self.render_chunk(&ctx, index, &mut output);
        }

        for (sheet, file) in plan.stylesheets.iter().zip(&style_files) {
            let css = sheet
                .modules
                .iter()
                .filter_map(|id| self.graph.get(id))
                .map(|module| rewrite::render_style(&ctx, file, module))
                .collect::<Vec<_>>()
                .join("\n");
            output.push(OutputFile::new(file.clone(), css, OutputKind::Asset));
        }

        for id in &plan.assets {
            if let (Some(module), Some(file)) = (self.graph.get(id), asset_files.get(id)) {
                output.push(OutputFile::new(file.clone(), module.bytes(), OutputKind::Asset));
            }
        }

        for (entry, file) in plan.entries.iter().zip(&html_files) {
            let (Some(file), Some(module)) = (file, self.graph.get(&entry.module)) else {
                continue;
            };
            let html = html::render_html(&ctx, file, module, entry);
            output.push(OutputFile::new(file.clone(), html, OutputKind::Html));
        }

        tracing::info!(
            files = output.len(),
            chunks = plan.chunks.len(),
            assets = plan.assets.len(),
            "bundle emitted"
        );
        Ok(output)
    }

    /// Add assets emitted by plugins, named through the same registry.
    pub fn add_plugin_assets(
        &mut self,
        output: &mut BundleOutput,
        assets: Vec<(String, EmittedAsset)>,
    ) -> Result<()> {
        for (plugin, asset) in assets {
            let filename = match &asset.file_name {
                Some(file_name) => file_name.clone(),
                None => {
                    let (name, ext) = split_name(&asset.name);
                    render_file_name(
                        &self.config.asset_file_names,
                        &self.config.assets_dir,
                        name,
                        ext,
                        || content_hash(&[asset.source.as_slice()]),
                    )
                }
            };
            self.names.claim(
                &filename,
                format!("asset '{}' emitted by plugin '{}'", asset.name, plugin),
            )?;
            tracing::debug!(%plugin, %filename, "plugin asset added");
            output.push(OutputFile::new(filename, asset.source, OutputKind::Asset));
        }
        Ok(())
    }

    fn describe(&self, id: &ModuleId) -> String {
        display_path(&self.root, id)
    }

    fn name_assets(&mut self, plan: &BundlePlan) -> Result<FxHashMap<ModuleId, String>> {
        let config = self.config;
        let mut files = FxHashMap::default();
        for id in &plan.assets {
            let Some(module) = self.graph.get(id) else {
                continue;
            };
            let ext = id.extension().unwrap_or_default();
            let file = render_file_name(
                &config.asset_file_names,
                &config.assets_dir,
                &id.stem(),
                &ext,
                || content_hash(&[module.bytes()]),
            );
            let source = self.describe(id);
            self.names.claim(&file, source)?;
            files.insert(id.clone(), file);
        }
        Ok(files)
    }

    fn name_stylesheets(
        &mut self,
        plan: &BundlePlan,
        asset_files: &FxHashMap<ModuleId, String>,
    ) -> Result<Vec<String>> {
        let config = self.config;
        let mut files = Vec::with_capacity(plan.stylesheets.len());
        for sheet in &plan.stylesheets {
            let hash = content_hash(&self.hash_parts(&sheet.modules, asset_files, &[]));
            let file = render_file_name(
                &config.asset_file_names,
                &config.assets_dir,
                &sheet.name,
                "css",
                || hash,
            );
            self.names.claim(&file, format!("stylesheet '{}'", sheet.name))?;
            files.push(file);
        }
        Ok(files)
    }

    fn name_chunks(
        &mut self,
        plan: &BundlePlan,
        asset_files: &FxHashMap<ModuleId, String>,
    ) -> Result<Vec<String>> {
        let config = self.config;
        let mut files = vec![String::new(); plan.chunks.len()];

        // Shared chunks are imported by entry chunks, so they are named first.
        let order = plan
            .chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == ChunkKind::Shared)
            .chain(
                plan.chunks
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.kind == ChunkKind::Entry),
            );

        for (index, chunk) in order {
            let imported: Vec<&str> = chunk.imports.iter().map(|&i| files[i].as_str()).collect();
            let hash = content_hash(&self.hash_parts(&chunk.modules, asset_files, &imported));

            let file = match chunk.kind {
                ChunkKind::Entry => {
                    let file = render_file_name(
                        &config.entry_file_names,
                        &config.assets_dir,
                        &chunk.name,
                        "js",
                        || hash.clone(),
                    );
                    self.names.claim(&file, format!("entry chunk '{}'", chunk.name))?;
                    file
                }
                ChunkKind::Shared => {
                    // Shared names are derived, so clashes get a numeric suffix.
                    let mut suffix = 1;
                    let file = loop {
                        let name = if suffix == 1 {
                            chunk.name.clone()
                        } else {
                            format!("{}{}", chunk.name, suffix)
                        };
                        let candidate = render_file_name(
                            &config.chunk_file_names,
                            &config.assets_dir,
                            &name,
                            "js",
                            || hash.clone(),
                        );
                        if !self.names.is_claimed(&candidate) {
                            break candidate;
                        }
                        suffix += 1;
                    };
                    let first = chunk
                        .modules
                        .first()
                        .map(|id| self.describe(id))
                        .unwrap_or_default();
                    self.names
                        .claim(&file, format!("shared chunk '{}' ({})", chunk.name, first))?;
                    file
                }
            };

            if config.source_maps {
                self.names
                    .claim(&format!("{}.map", file), format!("source map of '{}'", file))?;
            }
            files[index] = file;
        }
        Ok(files)
    }

    fn name_html(&mut self, plan: &BundlePlan) -> Result<Vec<Option<String>>> {
        let mut files = Vec::with_capacity(plan.entries.len());
        for entry in &plan.entries {
            if entry.kind != ModuleKind::Html {
                files.push(None);
                continue;
            }
            let file = format!("{}.html", entry.name);
            let source = self.describe(&entry.module);
            self.names.claim(&file, source)?;
            files.push(Some(file));
        }
        Ok(files)
    }

    /// Module contents plus the names of every file they reference.
    fn hash_parts<'g>(
        &'g self,
        modules: &[ModuleId],
        asset_files: &'g FxHashMap<ModuleId, String>,
        imported: &[&'g str],
    ) -> Vec<&'g [u8]> {
        let mut parts = Vec::new();
        for id in modules {
            let Some(module) = self.graph.get(id) else {
                continue;
            };
            parts.push(module.bytes());
            parts.extend(
                module
                    .dependencies()
                    .filter_map(|dep| asset_files.get(dep))
                    .map(|file| file.as_bytes()),
            );
        }
        parts.extend(imported.iter().map(|file| file.as_bytes()));
        parts
    }

    fn render_chunk(&self, ctx: &RenderContext<'_>, index: usize, output: &mut BundleOutput) {
        let chunk = &ctx.plan.chunks[index];
        let file = &ctx.chunk_files[index];
        let modules: Vec<&Module> = chunk
            .modules
            .iter()
            .filter_map(|id| self.graph.get(id))
            .collect();
        let scope = ChunkScope::collect(modules.iter().copied());

        let mut out = ChunkWriter {
            code: String::new(),
            map: self.config.source_maps.then(ChunkMap::new),
        };

        for line in scope.header() {
            out.unmapped(&line);
        }
        for line in self.cross_chunk_imports(ctx, index, file, &modules) {
            out.unmapped(&line);
        }
        if !modules.is_empty() {
            out.unmapped(CHUNK_RUNTIME.trim_end());
        }

        for module in &modules {
            let wrapped = rewrite::render_script(ctx, &scope, file, module);
            out.unmapped(wrapped.head.trim_end());
            let source = out
                .map
                .as_mut()
                .map(|map| map.add_source(&self.map_source(file, &module.id), module.code()));
            out.mapped(&wrapped.body, source, sourcemap::line_count(module.code()));
            out.unmapped(wrapped.tail.trim_end());
        }

        for root in &chunk.roots {
            out.unmapped(&format!("{}();", init_binding(self.graph, root)));
        }
        for line in self.chunk_exports(ctx, index) {
            out.unmapped(&line);
        }

        match out.map {
            Some(map) => {
                let mut code = out.code;
                let map_file = format!("{}.map", file);
                code.push_str(&format!("//# sourceMappingURL={}\n", base_name(&map_file)));
                let json = map.into_json(base_name(file));
                output.push(OutputFile::new(file.clone(), code, OutputKind::Chunk));
                output.push(OutputFile::new(map_file, json, OutputKind::SourceMap));
            }
            None => output.push(OutputFile::new(file.clone(), out.code, OutputKind::Chunk)),
        }
    }

    /// Imports of the namespaces and initializers chunk `index` uses from
    /// shared chunks.
    fn cross_chunk_imports(
        &self,
        ctx: &RenderContext<'_>,
        index: usize,
        file: &str,
        modules: &[&Module],
    ) -> Vec<String> {
        let chunk = &ctx.plan.chunks[index];
        let mut used: IndexMap<usize, IndexSet<&ModuleId>> = chunk
            .imports
            .iter()
            .map(|&shared| (shared, IndexSet::new()))
            .collect();

        let referenced = modules
            .iter()
            .flat_map(|module| module.imports.iter())
            .filter_map(|import| import.module())
            .filter(|dep| self.graph.get(dep).is_some_and(|m| m.kind == ModuleKind::Script))
            .chain(&chunk.roots)
            .chain(&chunk.entry_module);
        for id in referenced {
            if chunk.modules.contains(id) {
                continue;
            }
            if let Some(&shared) = ctx.plan.shared_of.get(id) {
                used.entry(shared).or_default().insert(id);
            }
        }

        used.into_iter()
            .map(|(shared, ids)| {
                let url = js_string(&ctx.url(file, &ctx.chunk_files[shared]));
                if ids.is_empty() {
                    return format!("import {};", url);
                }
                let bindings: Vec<String> = ids
                    .into_iter()
                    .flat_map(|id| [namespace_binding(self.graph, id), init_binding(self.graph, id)])
                    .collect();
                format!("import {{ {} }} from {};", bindings.join(", "), url)
            })
            .collect()
    }

    /// Export statements closing chunk `index`.
    fn chunk_exports(&self, ctx: &RenderContext<'_>, index: usize) -> Vec<String> {
        let chunk = &ctx.plan.chunks[index];
        match chunk.kind {
            ChunkKind::Shared => {
                let bindings: Vec<String> = chunk
                    .modules
                    .iter()
                    .flat_map(|id| [namespace_binding(self.graph, id), init_binding(self.graph, id)])
                    .collect();
                if bindings.is_empty() {
                    Vec::new()
                } else {
                    vec![format!("export {{ {} }};", bindings.join(", "))]
                }
            }
            ChunkKind::Entry => {
                let Some(entry) = &chunk.entry_module else {
                    return Vec::new();
                };
                let ns = namespace_binding(self.graph, entry);
                let (names, external) = rewrite::exported_names(self.graph, entry);
                let mut lines: Vec<String> = external
                    .iter()
                    .map(|specifier| format!("export * from {};", js_string(specifier)))
                    .collect();
                if !names.is_empty() {
                    let consts: Vec<String> = names
                        .iter()
                        .enumerate()
                        .map(|(i, name)| format!("__kiln_export_{} = {}", i, member(&ns, name)))
                        .collect();
                    let specifiers: Vec<String> = names
                        .iter()
                        .enumerate()
                        .map(|(i, name)| {
                            let exported = if is_identifier(name) {
                                name.clone()
                            } else {
                                js_string(name)
                            };
                            format!("__kiln_export_{} as {}", i, exported)
                        })
                        .collect();
                    lines.push(format!("const {};", consts.join(", ")));
                    lines.push(format!("export {{ {} }};", specifiers.join(", ")));
                }
                lines
            }
        }
    }

    /// Path of a module as listed in the `sources` of `chunk_file`'s map.
    fn map_source(&self, chunk_file: &str, id: &ModuleId) -> String {
        let map_path = self.out_dir.join(chunk_file);
        let map_dir = map_path.parent().unwrap_or(&self.out_dir);
        match id.as_path() {
            Some(path) => relative_path(map_dir, path),
            None => id.to_string(),
        }
    }
}

fn base_name(file: &str) -> &str {
    file.rsplit('/').next().unwrap_or(file)
}

/// Chunk text and its source map, built line by line.
struct ChunkWriter {
    code: String,
    map: Option<ChunkMap>,
}

impl ChunkWriter {
    /// Lines the bundler adds itself.
    fn unmapped(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.code.push_str(text);
        self.code.push('\n');
        if let Some(map) = &mut self.map {
            map.add_unmapped(sourcemap::line_count(text));
        }
    }

    /// A module body whose first `original_lines` lines match its source.
    fn mapped(&mut self, body: &str, source: Option<u32>, original_lines: usize) {
        self.code.push_str(body);
        if let (Some(map), Some(source)) = (&mut self.map, source) {
            let lines = sourcemap::line_count(body);
            let original = original_lines.min(lines);
            map.add_mapped(source, original);
            map.add_unmapped(lines - original);
        }
    }
}
