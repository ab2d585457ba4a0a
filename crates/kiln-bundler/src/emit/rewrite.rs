//! Reference rewriting for script and style modules.
//!
//! Every rewrite is a byte-range edit against the transformed code. Edits
//! never change how many lines a module spans: a replacement shorter than the
//! statement it replaces is padded with the newlines it removed, which keeps
//! source maps line-accurate.
//!
//! Script modules are wrapped, each in its own function scope, and run once
//! on first use. A module's exports live on a namespace object of getters
//! (`__kiln_ns_<n>`, where `n` is the module's position in the graph) and its
//! body runs through `__kiln_init_<n>`. Imports of other modules become reads
//! from their namespace, so top-level names never meet across modules.

use std::ops::Range;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxHashMap, FxHashSet};

use super::chunk::BundlePlan;
use crate::graph::{
    DEFAULT_EXPORT_BINDING, ExportLocal, ImportKind, ImportRecord, ImportedName, Module,
    ModuleGraph, ModuleId, ModuleKind, RewriteKind,
};
use crate::resolver::{Resolution, relative_url};

/// Helpers every chunk with script modules starts with.
pub const CHUNK_RUNTIME: &str = r#"const __kiln_lazy = (init) => {
  let done = false;
  return () => {
    if (!done) {
      done = true;
      init();
    }
  };
};
const __kiln_export = (ns, getters) => {
  for (const name of Object.keys(getters)) {
    Object.defineProperty(ns, name, { enumerable: true, get: getters[name] });
  }
};
const __kiln_export_star = (ns, from) => {
  for (const name of Object.keys(from)) {
    if (name !== "default" && !Object.prototype.hasOwnProperty.call(ns, name)) {
      Object.defineProperty(ns, name, { enumerable: true, get: () => from[name] });
    }
  }
};
"#;

/// Replace `range` of the original text with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: Range<usize>,
    pub text: String,
}

impl Edit {
    pub fn new(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::new(at..at, text)
    }
}

/// Apply non-overlapping edits. Overlapping edits after the first are dropped.
pub fn apply_edits(code: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|edit| (edit.range.start, edit.range.end));
    let mut out = String::with_capacity(code.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor || edit.range.end > code.len() {
            tracing::trace!(?edit.range, "skipping overlapping edit");
            continue;
        }
        out.push_str(&code[cursor..edit.range.start]);
        out.push_str(&edit.text);
        let removed = code[edit.range.clone()].matches('\n').count();
        let added = edit.text.matches('\n').count();
        for _ in added..removed {
            out.push('\n');
        }
        cursor = edit.range.end;
    }
    out.push_str(&code[cursor..]);
    out
}

/// Namespace object holding the exports of module `id`.
pub fn namespace_binding(graph: &ModuleGraph, id: &ModuleId) -> String {
    format!("__kiln_ns_{}", graph.index_of(id).unwrap_or_default())
}

/// Function that runs module `id` the first time it is called.
pub fn init_binding(graph: &ModuleGraph, id: &ModuleId) -> String {
    format!("__kiln_init_{}", graph.index_of(id).unwrap_or_default())
}

/// Everything a rewrite needs to know about where outputs ended up.
#[derive(Debug)]
pub struct RenderContext<'a> {
    pub graph: &'a ModuleGraph,
    pub plan: &'a BundlePlan,
    pub base: &'a str,
    pub chunk_files: &'a [String],
    pub style_files: &'a [String],
    pub asset_files: &'a FxHashMap<ModuleId, String>,
}

impl RenderContext<'_> {
    /// URL of module `id`'s emitted asset as seen from `from_file`.
    pub fn asset_url(&self, from_file: &str, id: &ModuleId) -> Option<String> {
        self.asset_files
            .get(id)
            .map(|file| relative_url(from_file, file, self.base))
    }

    pub fn url(&self, from_file: &str, to_file: &str) -> String {
        relative_url(from_file, to_file, self.base)
    }

    /// The graph's script module behind `import`, if it has one.
    fn script_target(&self, import: &ImportRecord) -> Option<&Module> {
        self.graph
            .get(import.module()?)
            .filter(|target| target.kind == ModuleKind::Script)
    }
}

/// Chunk-level bindings shared by the module bodies of one chunk: external
/// modules are imported once, at the top, as namespaces.
#[derive(Debug, Default)]
pub struct ChunkScope {
    /// Specifier -> namespace binding, in first-use order.
    externals: IndexMap<String, String>,
    side_effects: IndexSet<String>,
}

impl ChunkScope {
    pub fn collect<'m>(modules: impl IntoIterator<Item = &'m Module>) -> Self {
        let mut scope = Self::default();
        for module in modules {
            for import in &module.imports {
                if import.resolved != Resolution::External {
                    continue;
                }
                match import.kind {
                    ImportKind::Static | ImportKind::ReExport => {
                        let next = scope.externals.len();
                        scope
                            .externals
                            .entry(import.specifier.clone())
                            .or_insert_with(|| format!("__kiln_ext_{}", next));
                    }
                    ImportKind::SideEffect => {
                        scope.side_effects.insert(import.specifier.clone());
                    }
                    _ => {}
                }
            }
        }
        scope
    }

    pub fn external(&self, specifier: &str) -> Option<&str> {
        self.externals.get(specifier).map(String::as_str)
    }

    /// Import statements that open the chunk, one per line.
    pub fn header(&self) -> Vec<String> {
        let side_effects = self
            .side_effects
            .iter()
            .filter(|specifier| !self.externals.contains_key(*specifier))
            .map(|specifier| format!("import {};", js_string(specifier)));
        let namespaces = self
            .externals
            .iter()
            .map(|(specifier, binding)| format!("import * as {} from {};", binding, js_string(specifier)));
        side_effects.chain(namespaces).collect()
    }
}

/// A script module rendered for its chunk. Only `body` corresponds line by
/// line to the module's code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedModule {
    pub head: String,
    pub body: String,
    pub tail: String,
}

/// Render script `module` for the chunk emitted as `this_file`.
pub fn render_script(
    ctx: &RenderContext<'_>,
    scope: &ChunkScope,
    this_file: &str,
    module: &Module,
) -> WrappedModule {
    let ns = namespace_binding(ctx.graph, &module.id);
    let init = init_binding(ctx.graph, &module.id);
    let mut head = vec![
        format!("const {} = Object.create(null);", ns),
        format!("const {} = __kiln_lazy(() => {{", init),
    ];

    let getters: Vec<String> = module
        .script
        .exports
        .iter()
        .filter_map(|export| {
            let value = match &export.local {
                ExportLocal::Binding(local) => local.clone(),
                ExportLocal::Import { record, name } => {
                    import_value(ctx, scope, this_file, module.imports.get(*record)?, name)?
                }
            };
            Some(format!("{}: () => {}", js_string(&export.exported), value))
        })
        .collect();
    if !getters.is_empty() {
        head.push(format!("__kiln_export({}, {{ {} }});", ns, getters.join(", ")));
    }

    let mut initialized = FxHashSet::default();
    for import in module.imports.iter().filter(|import| import.kind.is_eager()) {
        if let Some(target) = ctx.script_target(import) {
            if initialized.insert(&target.id) {
                head.push(format!("{}();", init_binding(ctx.graph, &target.id)));
            }
        }
    }
    for &record in &module.script.star_exports {
        let Some(import) = module.imports.get(record) else {
            continue;
        };
        let from = match &import.resolved {
            Resolution::External => scope.external(&import.specifier).map(str::to_string),
            Resolution::Module(_) => ctx
                .script_target(import)
                .map(|target| namespace_binding(ctx.graph, &target.id)),
        };
        if let Some(from) = from {
            head.push(format!("__kiln_export_star({}, {});", ns, from));
        }
    }

    let mut body = apply_edits(module.code(), body_edits(ctx, scope, this_file, module));
    if !body.is_empty() && !body.ends_with('\n') {
        body.push('\n');
    }

    let mut head = head.join("\n");
    head.push('\n');
    WrappedModule {
        head,
        body,
        tail: "});\n".to_string(),
    }
}

fn body_edits(
    ctx: &RenderContext<'_>,
    scope: &ChunkScope,
    this_file: &str,
    module: &Module,
) -> Vec<Edit> {
    let code = module.code();
    let mut edits = Vec::new();

    for import in &module.imports {
        let (Some(span), Some(statement)) = (&import.span, &import.statement) else {
            continue;
        };
        let target = import.module().and_then(|dep| ctx.graph.get(dep));
        match import.kind {
            ImportKind::AssetUrl => {
                if let Some(url) = import.module().and_then(|dep| ctx.asset_url(this_file, dep)) {
                    edits.push(Edit::new(span.clone(), url));
                }
            }
            ImportKind::Dynamic => {
                if let Some(target) = target {
                    edits.push(Edit::new(
                        statement.clone(),
                        dynamic_import(ctx, this_file, target),
                    ));
                }
            }
            ImportKind::Static | ImportKind::SideEffect | ImportKind::ReExport => {
                let text = match target {
                    Some(target) if matches!(target.kind, ModuleKind::Asset | ModuleKind::Html) => {
                        let default = import.clause.as_ref().and_then(|c| c.default.as_deref());
                        match (default, ctx.asset_url(this_file, &target.id)) {
                            (Some(local), Some(url)) => {
                                format!("const {} = {};", local, js_string(&url))
                            }
                            _ => String::new(),
                        }
                    }
                    // Provided by the chunk.
                    _ => String::new(),
                };
                edits.push(Edit::new(statement.clone(), text));
            }
            _ => {}
        }
    }

    for rewrite in &module.script.rewrites {
        let text = match &rewrite.kind {
            RewriteKind::Remove => String::new(),
            RewriteKind::DefaultExpression => format!("const {} = ", DEFAULT_EXPORT_BINDING),
            RewriteKind::Semicolon => ";".to_string(),
            RewriteKind::Reference {
                record,
                name,
                shorthand,
            } => {
                let Some(import) = module.imports.get(*record) else {
                    continue;
                };
                // Asset imports keep their local `const`.
                let is_binding = import.resolved == Resolution::External
                    || ctx.script_target(import).is_some();
                let value = is_binding
                    .then(|| import_value(ctx, scope, this_file, import, name))
                    .flatten();
                let Some(value) = value else {
                    continue;
                };
                if *shorthand {
                    format!("{}: {}", &code[rewrite.span.clone()], value)
                } else {
                    value
                }
            }
        };
        edits.push(Edit::new(rewrite.span.clone(), text));
    }

    edits
}

/// Expression reading `name` from the module behind `import`.
fn import_value(
    ctx: &RenderContext<'_>,
    scope: &ChunkScope,
    this_file: &str,
    import: &ImportRecord,
    name: &ImportedName,
) -> Option<String> {
    let object = match &import.resolved {
        Resolution::External => scope.external(&import.specifier)?.to_string(),
        Resolution::Module(id) => {
            let target = ctx.graph.get(id)?;
            match target.kind {
                ModuleKind::Script => namespace_binding(ctx.graph, id),
                ModuleKind::Asset | ModuleKind::Html => {
                    let is_default = matches!(name, ImportedName::Named(n) if n == "default");
                    return is_default
                        .then(|| ctx.asset_url(this_file, id).map(|url| js_string(&url)))
                        .flatten();
                }
                ModuleKind::Style => return None,
            }
        }
    };
    Some(match name {
        ImportedName::Namespace => object,
        ImportedName::Named(name) => member(&object, name),
    })
}

/// `import('<target>')` resolved against the bundle.
fn dynamic_import(ctx: &RenderContext<'_>, this_file: &str, target: &Module) -> String {
    match target.kind {
        ModuleKind::Script => format!(
            "Promise.resolve().then(() => ({}(), {}))",
            init_binding(ctx.graph, &target.id),
            namespace_binding(ctx.graph, &target.id)
        ),
        ModuleKind::Style => "Promise.resolve({})".to_string(),
        ModuleKind::Asset | ModuleKind::Html => match ctx.asset_url(this_file, &target.id) {
            Some(url) => format!("Promise.resolve({{ default: {} }})", js_string(&url)),
            None => "Promise.resolve({})".to_string(),
        },
    }
}

/// Property access that works for any export name.
pub fn member(object: &str, name: &str) -> String {
    if is_identifier(name) {
        format!("{}.{}", object, name)
    } else {
        format!("{}[{}]", object, js_string(name))
    }
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Names module `id` exports, following `export *` through the graph, and
/// the external specifiers it re-exports wholesale.
pub fn exported_names(graph: &ModuleGraph, id: &ModuleId) -> (IndexSet<String>, IndexSet<String>) {
    let mut names = IndexSet::new();
    let mut external = IndexSet::new();
    let mut seen = FxHashSet::default();
    collect_exported_names(graph, id, true, &mut seen, &mut names, &mut external);
    (names, external)
}

fn collect_exported_names<'g>(
    graph: &'g ModuleGraph,
    id: &'g ModuleId,
    with_default: bool,
    seen: &mut FxHashSet<&'g ModuleId>,
    names: &mut IndexSet<String>,
    external: &mut IndexSet<String>,
) {
    if !seen.insert(id) {
        return;
    }
    let Some(module) = graph.get(id) else {
        return;
    };
    for export in &module.script.exports {
        if with_default || export.exported != "default" {
            names.insert(export.exported.clone());
        }
    }
    for &record in &module.script.star_exports {
        let Some(import) = module.imports.get(record) else {
            continue;
        };
        match &import.resolved {
            Resolution::External => {
                external.insert(import.specifier.clone());
            }
            Resolution::Module(dep) => {
                collect_exported_names(graph, dep, false, seen, names, external);
            }
        }
    }
}

/// Rewritten code of a style module emitted as part of `this_file`.
pub fn render_style(ctx: &RenderContext<'_>, this_file: &str, module: &Module) -> String {
    let mut edits = Vec::new();
    for import in &module.imports {
        let Some(dep) = import.module() else {
            continue;
        };
        match import.kind {
            // Imported sheets are concatenated ahead of this one.
            ImportKind::CssImport => {
                if let Some(statement) = &import.statement {
                    edits.push(Edit::new(statement.clone(), ""));
                }
            }
            ImportKind::CssUrl => {
                if let (Some(span), Some(url)) = (&import.span, ctx.asset_url(this_file, dep)) {
                    edits.push(Edit::new(span.clone(), url));
                }
            }
            _ => {}
        }
    }
    apply_edits(module.code(), edits)
}

/// Double-quoted JS string literal.
pub fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}
