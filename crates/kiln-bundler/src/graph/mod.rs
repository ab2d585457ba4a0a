//! Module graph: every module reachable from the entries, exactly once.

mod builder;
mod module;
pub mod scanner;

pub use builder::GraphBuilder;
pub use module::{
    DEFAULT_EXPORT_BINDING, ExportLocal, ImportClause, ImportKind, ImportRecord, ImportedName,
    Module, ModuleId, ModuleKind, RewriteKind, ScriptExport, ScriptFacts, ScriptRewrite,
};

use indexmap::IndexMap;

/// Modules in discovery order, keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    modules: IndexMap<ModuleId, Module>,
    entries: IndexMap<String, ModuleId>,
}

impl ModuleGraph {
    pub fn new(entries: IndexMap<String, ModuleId>) -> Self {
        Self {
            modules: IndexMap::new(),
            entries,
        }
    }

    pub fn get(&self, id: &ModuleId) -> Option<&Module> {
        self.modules.get(id)
    }

    /// Stable position of a module in discovery order.
    pub fn index_of(&self, id: &ModuleId) -> Option<usize> {
        self.modules.get_index_of(id)
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.modules.contains_key(id)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    /// Entry name -> entry module, in declaration order.
    pub fn entries(&self) -> &IndexMap<String, ModuleId> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub(crate) fn insert(&mut self, module: Module) {
        self.modules.insert(module.id.clone(), module);
    }
}
