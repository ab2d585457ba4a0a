use std::fmt;
use std::ops::Range;
use std::path::Path;

use path_clean::PathClean;
use serde::{Deserialize, Serialize};

use crate::resolver::Resolution;

/// Prefixes that mark an id as virtual (not backed by a file).
const VIRTUAL_PREFIXES: [&str; 2] = ["\0", "virtual:"];

/// Stable module identity: a cleaned absolute path or a virtual id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(String);

impl ModuleId {
    /// Identity for a file on disk.
    pub fn from_path(path: &Path) -> Self {
        Self(path.clean().to_string_lossy().into_owned())
    }

    /// Identity as produced by a resolve hook.
    ///
    /// Absolute paths are cleaned; anything else is kept verbatim.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        if !is_virtual_id(&id) && Path::new(&id).is_absolute() {
            return Self::from_path(Path::new(&id));
        }
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_virtual(&self) -> bool {
        is_virtual_id(&self.0) || !Path::new(&self.0).is_absolute()
    }

    /// Filesystem path, unless the id is virtual.
    pub fn as_path(&self) -> Option<&Path> {
        if self.is_virtual() {
            None
        } else {
            Some(Path::new(&self.0))
        }
    }

    /// The id without its virtual marker, used for naming and kind detection.
    fn display_name(&self) -> &str {
        let mut name = self.0.as_str();
        for prefix in VIRTUAL_PREFIXES {
            if let Some(rest) = name.strip_prefix(prefix) {
                name = rest;
            }
        }
        name
    }

    /// File stem used as the logical output name.
    pub fn stem(&self) -> String {
        let name = self.display_name();
        let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
        match file.split_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => file.to_string(),
        }
    }

    /// Extension without the dot, lowercased.
    pub fn extension(&self) -> Option<String> {
        let name = self.display_name();
        let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
        let file = file.split(['?', '#']).next().unwrap_or(file);
        file.rsplit_once('.')
            .filter(|(stem, _)| !stem.is_empty())
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

fn is_virtual_id(id: &str) -> bool {
    VIRTUAL_PREFIXES.iter().any(|prefix| id.starts_with(prefix))
}

/// Content category of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Html,
    Script,
    Style,
    Asset,
}

impl ModuleKind {
    /// Kind implied by a file extension.
    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext {
            Some("html" | "htm") => ModuleKind::Html,
            Some("js" | "mjs" | "cjs" | "jsx" | "ts" | "tsx" | "mts" | "cts") => {
                ModuleKind::Script
            }
            Some("css") => ModuleKind::Style,
            _ => ModuleKind::Asset,
        }
    }

    pub fn of(id: &ModuleId) -> Self {
        Self::from_extension(id.extension().as_deref())
    }
}

/// Syntactic origin of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    /// `import x from '...'`
    Static,
    /// `import '...'`
    SideEffect,
    /// `export ... from '...'`
    ReExport,
    /// `new URL('...', import.meta.url)`
    AssetUrl,
    /// CSS `@import`
    CssImport,
    /// CSS `url(...)`
    CssUrl,
    /// `import('...')` with a string literal specifier.
    Dynamic,
    /// `<script type="module" src>`
    HtmlScript,
    /// `<script type="module">` with an inline body.
    HtmlInlineScript,
    /// `<link rel="stylesheet" href>`
    HtmlStylesheet,
    /// Any other `src`/`href` attribute in HTML.
    HtmlAsset,
    /// Reported by a transform hook; has no location in the code.
    Plugin,
}

impl ImportKind {
    /// References that only need the target's URL, never its code.
    pub fn is_url_reference(self) -> bool {
        matches!(
            self,
            ImportKind::AssetUrl | ImportKind::CssUrl | ImportKind::HtmlAsset
        )
    }

    /// Script tags of an HTML page, external or inline.
    pub fn is_html_script(self) -> bool {
        matches!(self, ImportKind::HtmlScript | ImportKind::HtmlInlineScript)
    }

    /// Script imports evaluated before the importing module runs.
    pub fn is_eager(self) -> bool {
        matches!(
            self,
            ImportKind::Static | ImportKind::SideEffect | ImportKind::ReExport
        )
    }
}

/// Bindings introduced by a static import clause.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportClause {
    pub default: Option<String>,
    pub namespace: Option<String>,
    /// `(imported, local)` pairs.
    pub named: Vec<(String, String)>,
}

/// One reference from a module to another module or external URL.
#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub specifier: String,
    pub kind: ImportKind,
    /// Byte range of the specifier text in the transformed code.
    pub span: Option<Range<usize>>,
    /// Byte range of the whole statement or tag.
    pub statement: Option<Range<usize>>,
    pub clause: Option<ImportClause>,
    pub resolved: Resolution,
}

impl ImportRecord {
    pub fn module(&self) -> Option<&ModuleId> {
        match &self.resolved {
            Resolution::Module(id) => Some(id),
            Resolution::External => None,
        }
    }
}

/// Local name an anonymous `export default` value is bound to.
pub const DEFAULT_EXPORT_BINDING: &str = "__kiln_default";

/// A name taken from another module's exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedName {
    /// A single export; `default` included.
    Named(String),
    /// The whole namespace object.
    Namespace,
}

/// What an export of a script module is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportLocal {
    /// A binding declared at the module's top level.
    Binding(String),
    /// A name forwarded from the module behind import record `record`.
    Import { record: usize, name: ImportedName },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptExport {
    pub exported: String,
    pub local: ExportLocal,
}

/// A source edit the emitter must make when it inlines a script module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteKind {
    /// Drop the text (`export ` keywords, local export lists).
    Remove,
    /// `export default ` in front of an expression or anonymous declaration.
    DefaultExpression,
    /// Terminates an anonymous default function or class.
    Semicolon,
    /// An identifier bound by an import of record `record`.
    Reference {
        record: usize,
        name: ImportedName,
        /// Appears as a shorthand object property (`{ name }`).
        shorthand: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRewrite {
    /// Byte range in the transformed code.
    pub span: Range<usize>,
    pub kind: RewriteKind,
}

/// Binding and export facts of a parsed script module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptFacts {
    pub exports: Vec<ScriptExport>,
    /// Import records re-exported wholesale with `export * from`.
    pub star_exports: Vec<usize>,
    /// In source order.
    pub rewrites: Vec<ScriptRewrite>,
}

impl ScriptFacts {
    pub fn export(&self, exported: &str) -> Option<&ScriptExport> {
        self.exports.iter().find(|export| export.exported == exported)
    }
}

/// A resolved, loaded and transformed unit of source.
///
/// Owned by the [`ModuleGraph`](super::ModuleGraph); never mutated once the
/// graph is complete.
#[derive(Debug, Clone)]
pub struct Module {
    pub id: ModuleId,
    pub kind: ModuleKind,
    /// Bytes as loaded, before any transform.
    pub raw: Vec<u8>,
    /// Transformed text. `None` for binary content.
    pub code: Option<String>,
    pub imports: Vec<ImportRecord>,
    /// Empty for anything but scripts.
    pub script: ScriptFacts,
    pub is_entry: bool,
}

impl Module {
    /// The bytes that end up in the bundle.
    pub fn bytes(&self) -> &[u8] {
        match &self.code {
            Some(code) => code.as_bytes(),
            None => &self.raw,
        }
    }

    pub fn code(&self) -> &str {
        self.code.as_deref().unwrap_or_default()
    }

    /// Ids of every module this one references, in source order.
    pub fn dependencies(&self) -> impl Iterator<Item = &ModuleId> {
        self.imports.iter().filter_map(ImportRecord::module)
    }
}
