//! Chunk planning.
//!
//! Each entry is walked depth-first and its reachable modules are sorted into
//! scripts (post-order, so dependencies precede dependents), stylesheets and
//! URL-referenced assets. Dynamically imported scripts belong to the walk of
//! the entry that imports them. With splitting enabled, script modules reached
//! from more than one entry move into shared chunks keyed by the exact set of
//! entries that reach them; otherwise every entry chunk carries its own copy.
//! Every entry gets exactly one entry chunk, empty when it has no scripts.

use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::graph::{ModuleGraph, ModuleId, ModuleKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Entry,
    Shared,
}

/// A script output file and the modules concatenated into it.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    /// Value of `[name]`.
    pub name: String,
    pub kind: ChunkKind,
    /// In evaluation order.
    pub modules: Vec<ModuleId>,
    /// Shared chunks this chunk must import, as indexes into [`BundlePlan::chunks`].
    pub imports: Vec<usize>,
    /// Modules the chunk runs when loaded: the script entry itself, or the
    /// module scripts of an HTML entry in document order.
    pub roots: Vec<ModuleId>,
    /// Script entry whose exports the chunk re-exports.
    pub entry_module: Option<ModuleId>,
}

/// A stylesheet output and the style modules concatenated into it.
#[derive(Debug, Clone)]
pub struct StylesheetPlan {
    pub name: String,
    pub modules: Vec<ModuleId>,
}

#[derive(Debug, Clone)]
pub struct EntryPlan {
    pub name: String,
    pub module: ModuleId,
    pub kind: ModuleKind,
    pub chunk: usize,
    pub stylesheet: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct BundlePlan {
    pub entries: Vec<EntryPlan>,
    /// Entry chunks in entry order, then shared chunks by descending reach.
    pub chunks: Vec<ChunkPlan>,
    pub stylesheets: Vec<StylesheetPlan>,
    /// Modules emitted verbatim, in first-reached order.
    pub assets: Vec<ModuleId>,
    /// Script module -> shared chunk holding it.
    pub shared_of: FxHashMap<ModuleId, usize>,
}

impl BundlePlan {
    /// Whether chunk `chunk` contains `module`.
    pub fn chunk_contains(&self, chunk: usize, module: &ModuleId) -> bool {
        match self.chunks[chunk].kind {
            ChunkKind::Shared => self.shared_of.get(module) == Some(&chunk),
            ChunkKind::Entry => {
                self.chunks[chunk].modules.contains(module) && !self.shared_of.contains_key(module)
            }
        }
    }
}

/// Modules reachable from one entry.
#[derive(Debug, Default)]
struct EntryWalk {
    scripts: Vec<ModuleId>,
    styles: Vec<ModuleId>,
    assets: Vec<ModuleId>,
    visited: FxHashSet<ModuleId>,
}

impl EntryWalk {
    fn visit(&mut self, graph: &ModuleGraph, id: &ModuleId) {
        if !self.visited.insert(id.clone()) {
            return;
        }
        let Some(module) = graph.get(id) else {
            return;
        };

        match module.kind {
            ModuleKind::Asset => {
                self.assets.push(id.clone());
                return;
            }
            ModuleKind::Html if !module.is_entry => {
                self.assets.push(id.clone());
                return;
            }
            _ => {}
        }

        for import in &module.imports {
            let Some(dep) = import.module() else {
                continue;
            };
            let Some(target) = graph.get(dep) else {
                continue;
            };
            if import.kind.is_url_reference() {
                self.add_asset(dep);
                continue;
            }
            match target.kind {
                ModuleKind::Script | ModuleKind::Style => self.visit(graph, dep),
                ModuleKind::Asset | ModuleKind::Html => self.add_asset(dep),
            }
        }

        match module.kind {
            ModuleKind::Script => self.scripts.push(id.clone()),
            ModuleKind::Style => self.styles.push(id.clone()),
            _ => {}
        }
    }

    fn add_asset(&mut self, id: &ModuleId) {
        if !self.assets.contains(id) {
            self.assets.push(id.clone());
        }
    }
}

/// Decide which modules go into which output.
pub fn plan(graph: &ModuleGraph, split_chunks: bool, css_combined: bool) -> BundlePlan {
    let walks: Vec<(String, ModuleId, EntryWalk)> = graph
        .entries()
        .iter()
        .map(|(name, id)| {
            let mut walk = EntryWalk::default();
            walk.visit(graph, id);
            (name.clone(), id.clone(), walk)
        })
        .collect();

    let mut plan = BundlePlan::default();

    let mut assets = IndexSet::new();
    for (_, _, walk) in &walks {
        assets.extend(walk.assets.iter().cloned());
    }
    plan.assets = assets.into_iter().collect();

    if split_chunks {
        plan.shared_of = shared_groups(&walks, &mut plan.chunks);
    }
    let shared_count = plan.chunks.len();

    let mut combined_styles: IndexSet<ModuleId> = IndexSet::new();
    let mut entries = Vec::with_capacity(walks.len());
    let mut entry_chunks = Vec::new();

    for (name, id, walk) in &walks {
        let kind = graph.get(id).map(|m| m.kind).unwrap_or(ModuleKind::Asset);

        let modules: Vec<ModuleId> = walk
            .scripts
            .iter()
            .filter(|m| !plan.shared_of.contains_key(*m))
            .cloned()
            .collect();
        let imports: IndexSet<usize> = walk
            .scripts
            .iter()
            .filter_map(|m| plan.shared_of.get(m).copied())
            .collect();
        let mut imports: Vec<usize> = imports.into_iter().collect();
        imports.sort_unstable();

        entry_chunks.push(ChunkPlan {
            name: name.clone(),
            kind: ChunkKind::Entry,
            modules,
            imports,
            roots: entry_roots(graph, id, kind),
            entry_module: (kind == ModuleKind::Script).then(|| id.clone()),
        });
        let chunk = entry_chunks.len() - 1;

        let stylesheet = if walk.styles.is_empty() {
            None
        } else if css_combined {
            combined_styles.extend(walk.styles.iter().cloned());
            Some(0)
        } else {
            plan.stylesheets.push(StylesheetPlan {
                name: name.clone(),
                modules: walk.styles.clone(),
            });
            Some(plan.stylesheets.len() - 1)
        };

        entries.push(EntryPlan {
            name: name.clone(),
            module: id.clone(),
            kind,
            chunk,
            stylesheet,
        });
    }

    if !combined_styles.is_empty() {
        plan.stylesheets.push(StylesheetPlan {
            name: "style".to_string(),
            modules: combined_styles.into_iter().collect(),
        });
    }

    // Entry chunks go first so entry plans index them directly.
    let entry_count = entry_chunks.len();
    let shared = std::mem::replace(&mut plan.chunks, entry_chunks);
    for chunk in &mut plan.chunks {
        for import in &mut chunk.imports {
            *import += entry_count;
        }
    }
    plan.chunks.extend(shared);
    for index in plan.shared_of.values_mut() {
        *index += entry_count;
    }
    plan.entries = entries;
    link_shared_chunks(graph, &mut plan);

    tracing::debug!(
        entry_chunks = entry_count,
        shared_chunks = shared_count,
        stylesheets = plan.stylesheets.len(),
        assets = plan.assets.len(),
        "bundle planned"
    );
    plan
}

/// Scripts an entry chunk runs on load.
fn entry_roots(graph: &ModuleGraph, id: &ModuleId, kind: ModuleKind) -> Vec<ModuleId> {
    match kind {
        ModuleKind::Script => vec![id.clone()],
        ModuleKind::Html => {
            let Some(page) = graph.get(id) else {
                return Vec::new();
            };
            let mut roots: IndexSet<ModuleId> = IndexSet::new();
            for import in &page.imports {
                if !import.kind.is_html_script() {
                    continue;
                }
                let Some(script) = import.module() else {
                    continue;
                };
                if graph.get(script).is_some_and(|m| m.kind == ModuleKind::Script) {
                    roots.insert(script.clone());
                }
            }
            roots.into_iter().collect()
        }
        ModuleKind::Style | ModuleKind::Asset => Vec::new(),
    }
}

/// Group script modules reached by two or more entries into shared chunks.
///
/// Pushes the chunks onto `chunks` (largest reach first) and returns the
/// module -> chunk index map, counted from the first shared chunk.
fn shared_groups(
    walks: &[(String, ModuleId, EntryWalk)],
    chunks: &mut Vec<ChunkPlan>,
) -> FxHashMap<ModuleId, usize> {
    let mut reach: IndexMap<&ModuleId, Vec<usize>> = IndexMap::new();
    for (index, (_, _, walk)) in walks.iter().enumerate() {
        for module in &walk.scripts {
            reach.entry(module).or_default().push(index);
        }
    }

    let mut groups: IndexMap<Vec<usize>, Vec<ModuleId>> = IndexMap::new();
    for (module, entries) in reach {
        if entries.len() > 1 {
            groups.entry(entries).or_default().push(module.clone());
        }
    }
    // Stable: groups with equal reach keep first-seen order.
    groups.sort_by(|a, _, b, _| b.len().cmp(&a.len()));

    let mut shared_of = FxHashMap::default();
    for (index, modules) in groups.values().enumerate() {
        for module in modules {
            shared_of.insert(module.clone(), index);
        }
    }

    for modules in groups.into_values() {
        let name = modules
            .first()
            .map(ModuleId::stem)
            .unwrap_or_else(|| "shared".to_string());
        chunks.push(ChunkPlan {
            name,
            kind: ChunkKind::Shared,
            modules,
            imports: Vec::new(),
            roots: Vec::new(),
            entry_module: None,
        });
    }
    shared_of
}

/// Fill in which shared chunks each shared chunk imports.
fn link_shared_chunks(graph: &ModuleGraph, plan: &mut BundlePlan) {
    for index in 0..plan.chunks.len() {
        if plan.chunks[index].kind != ChunkKind::Shared {
            continue;
        }
        let mut imports = IndexSet::new();
        for module in &plan.chunks[index].modules {
            let Some(module) = graph.get(module) else {
                continue;
            };
            for import in &module.imports {
                if import.kind.is_url_reference() {
                    continue;
                }
                match import.module().and_then(|dep| plan.shared_of.get(dep)) {
                    Some(&target) if target != index => {
                        imports.insert(target);
                    }
                    _ => {}
                }
            }
        }
        let mut imports: Vec<usize> = imports.into_iter().collect();
        imports.sort_unstable();
        plan.chunks[index].imports = imports;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ImportKind, ImportRecord, Module, ScriptFacts};
    use crate::resolver::Resolution;
    use indexmap::IndexMap;

    fn id(name: &str) -> ModuleId {
        ModuleId::new(format!("/p/{}", name))
    }

    fn module(name: &str, deps: &[(&str, ImportKind)], is_entry: bool) -> Module {
        let id = id(name);
        Module {
            kind: ModuleKind::of(&id),
            id,
            raw: Vec::new(),
            code: Some(String::new()),
            imports: deps
                .iter()
                .map(|(dep, kind)| ImportRecord {
                    specifier: format!("./{}", dep),
                    kind: *kind,
                    span: None,
                    statement: None,
                    clause: None,
                    resolved: Resolution::Module(self::id(dep)),
                })
                .collect(),
            script: ScriptFacts::default(),
            is_entry,
        }
    }

    fn graph(entries: &[(&str, &str)], modules: Vec<Module>) -> ModuleGraph {
        let entries: IndexMap<String, ModuleId> = entries
            .iter()
            .map(|(name, file)| (name.to_string(), id(file)))
            .collect();
        let mut graph = ModuleGraph::new(entries);
        for module in modules {
            graph.insert(module);
        }
        graph
    }

    fn names(ids: &[ModuleId]) -> Vec<String> {
        ids.iter().map(ModuleId::stem).collect()
    }

    fn two_entries() -> ModuleGraph {
        use ImportKind::Static;
        graph(
            &[("a", "a.js"), ("b", "b.js")],
            vec![
                module("a.js", &[("util.js", Static), ("only-a.js", Static)], true),
                module("b.js", &[("util.js", Static)], true),
                module("util.js", &[("base.js", Static)], false),
                module("only-a.js", &[], false),
                module("base.js", &[], false),
            ],
        )
    }

    #[test]
    fn html_entry_collects_scripts_styles_and_assets() {
        use ImportKind::*;
        let graph = graph(
            &[("index", "index.html")],
            vec![
                module(
                    "index.html",
                    &[
                        ("favicon.ico", HtmlAsset),
                        ("app.css", HtmlStylesheet),
                        ("main.js", HtmlScript),
                    ],
                    true,
                ),
                module("app.css", &[("base.css", CssImport), ("bg.png", CssUrl)], false),
                module("base.css", &[], false),
                module("main.js", &[("dep.js", Static), ("theme.css", SideEffect)], false),
                module("dep.js", &[("logo.svg", Static)], false),
                module("theme.css", &[], false),
                module("favicon.ico", &[], false),
                module("bg.png", &[], false),
                module("logo.svg", &[], false),
            ],
        );

        let plan = plan(&graph, false, true);

        assert_eq!(plan.chunks.len(), 1);
        assert_eq!(names(&plan.chunks[0].modules), vec!["dep", "main"]);
        assert_eq!(plan.chunks[0].entry_module, None);
        assert_eq!(names(&plan.chunks[0].roots), vec!["main"]);
        assert_eq!(plan.stylesheets.len(), 1);
        assert_eq!(plan.stylesheets[0].name, "style");
        assert_eq!(names(&plan.stylesheets[0].modules), vec!["base", "app", "theme"]);
        assert_eq!(names(&plan.assets), vec!["favicon", "bg", "logo"]);
        assert_eq!(plan.entries[0].chunk, 0);
        assert_eq!(plan.entries[0].stylesheet, Some(0));
    }

    #[test]
    fn unsplit_entries_duplicate_shared_modules() {
        let plan = plan(&two_entries(), false, true);

        assert_eq!(plan.chunks.len(), 2);
        assert!(plan.shared_of.is_empty());
        assert_eq!(names(&plan.chunks[0].modules), vec!["base", "util", "only-a", "a"]);
        assert_eq!(names(&plan.chunks[1].modules), vec!["base", "util", "b"]);
        assert_eq!(plan.chunks[0].entry_module, Some(id("a.js")));
        assert_eq!(plan.chunks[0].roots, vec![id("a.js")]);
    }

    #[test]
    fn split_entries_share_one_chunk() {
        let plan = plan(&two_entries(), true, true);

        assert_eq!(plan.chunks.len(), 3);
        assert_eq!(names(&plan.chunks[0].modules), vec!["only-a", "a"]);
        assert_eq!(names(&plan.chunks[1].modules), vec!["b"]);
        let shared = &plan.chunks[2];
        assert_eq!(shared.kind, ChunkKind::Shared);
        assert_eq!(shared.name, "base");
        assert_eq!(names(&shared.modules), vec!["base", "util"]);
        assert_eq!(plan.chunks[0].imports, vec![2]);
        assert_eq!(plan.chunks[1].imports, vec![2]);
        assert!(plan.chunk_contains(2, &id("util.js")));
        assert!(!plan.chunk_contains(0, &id("util.js")));
    }

    #[test]
    fn url_references_are_assets_even_for_scripts() {
        use ImportKind::*;
        let graph = graph(
            &[("main", "main.js")],
            vec![
                module("main.js", &[("worker.js", AssetUrl)], true),
                module("worker.js", &[], false),
            ],
        );
        let plan = plan(&graph, false, true);
        assert_eq!(names(&plan.chunks[0].modules), vec!["main"]);
        assert_eq!(names(&plan.assets), vec!["worker"]);
    }

    #[test]
    fn dynamic_imports_stay_in_the_importing_entry_chunk() {
        use ImportKind::*;
        let graph = graph(
            &[("main", "main.js")],
            vec![
                module("main.js", &[("lazy.js", Dynamic)], true),
                module("lazy.js", &[("dep.js", Static)], false),
                module("dep.js", &[], false),
            ],
        );
        let plan = plan(&graph, true, true);
        assert_eq!(plan.chunks.len(), 1);
        assert_eq!(names(&plan.chunks[0].modules), vec!["dep", "lazy", "main"]);
        assert_eq!(plan.chunks[0].roots, vec![id("main.js")]);
    }

    #[test]
    fn every_entry_gets_a_chunk_even_without_scripts() {
        use ImportKind::HtmlScript;
        let graph = graph(
            &[("index", "index.html"), ("about", "about.html")],
            vec![
                module("index.html", &[("main.js", HtmlScript)], true),
                module("main.js", &[], false),
                module("about.html", &[], true),
            ],
        );
        let plan = plan(&graph, true, true);
        assert_eq!(plan.chunks.len(), 2);
        assert_eq!(plan.entries[1].chunk, 1);
        assert_eq!(plan.entries[1].kind, ModuleKind::Html);
        assert!(plan.chunks[1].modules.is_empty());
        assert!(plan.chunks[1].roots.is_empty());
    }
}
