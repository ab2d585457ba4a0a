//! Import discovery for scripts, stylesheets and HTML.
//!
//! Scripts are parsed (see [`script`]). Stylesheets and HTML pages are
//! matched with patterns: CSS `@import`/`url()`, module `<script>` tags,
//! stylesheet links and the `src`/`href` attributes of resource tags.

mod script;

use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::module::{ImportClause, ImportKind, ModuleId, ModuleKind, ScriptFacts};
use crate::{Error, Result};

static CSS_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@import\s+(?:url\(\s*)?['"]?(?P<spec>[^'")\s;]+)['"]?\s*\)?[^;\n]*;?"#)
        .expect("css import pattern is valid")
});

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*['"]?(?P<spec>[^'")\s]+)['"]?\s*\)"#).expect("css url pattern is valid")
});

static HTML_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("html comment pattern is valid"));

static HTML_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b(?P<attrs>[^>]*)>(?P<body>.*?)</script\s*>")
        .expect("script tag pattern is valid")
});

static HTML_RESOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(?P<tag>link|img|source|video|audio|iframe|embed)\b(?P<attrs>[^>]*)>")
        .expect("resource tag pattern is valid")
});

static HTML_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?P<name>[a-z][a-z0-9_:-]*)\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<uq>[^\s"'>]+))"#,
    )
    .expect("attribute pattern is valid")
});

/// An import found in module code, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedImport {
    pub specifier: String,
    pub kind: ImportKind,
    /// The specifier text, or the body of an inline script.
    pub span: Range<usize>,
    pub statement: Range<usize>,
    pub clause: Option<ImportClause>,
}

#[derive(Debug, Default)]
pub struct ScanResult {
    /// Scripts list module declarations first, then `import()` and
    /// `new URL()` references; both in source order. Other kinds are sorted
    /// by position.
    pub imports: Vec<ScannedImport>,
    pub script: ScriptFacts,
}

/// Scan the transformed code of module `id` according to its kind.
/// Assets have no imports.
pub fn scan(id: &ModuleId, kind: ModuleKind, code: &str) -> Result<ScanResult> {
    let mut result = match kind {
        ModuleKind::Script => {
            let source_type = script::source_type(id.extension().as_deref());
            let (imports, script) =
                script::scan_script(code, source_type).map_err(|message| Error::Parse {
                    id: id.to_string(),
                    message,
                })?;
            return Ok(ScanResult { imports, script });
        }
        ModuleKind::Style => ScanResult {
            imports: scan_style(code),
            ..ScanResult::default()
        },
        ModuleKind::Html => ScanResult {
            imports: scan_html(code),
            ..ScanResult::default()
        },
        ModuleKind::Asset => ScanResult::default(),
    };
    result.imports.sort_by_key(|import| import.span.start);
    Ok(result)
}

/// Specifier of the `index`-th inline module script of a page, relative to
/// the page's own id.
pub fn inline_script_specifier(index: usize) -> String {
    format!("?html-proxy&index={}.js", index)
}

fn spec_import(caps: &Captures<'_>, kind: ImportKind) -> Option<ScannedImport> {
    let whole = caps.get(0)?;
    let spec = caps.name("spec")?;
    Some(ScannedImport {
        specifier: spec.as_str().to_string(),
        kind,
        span: spec.range(),
        statement: whole.range(),
        clause: None,
    })
}

fn scan_style(code: &str) -> Vec<ScannedImport> {
    let mut imports: Vec<ScannedImport> = CSS_IMPORT
        .captures_iter(code)
        .filter_map(|caps| spec_import(&caps, ImportKind::CssImport))
        .collect();

    let import_ranges: Vec<Range<usize>> = imports.iter().map(|i| i.statement.clone()).collect();
    imports.extend(
        CSS_URL
            .captures_iter(code)
            .filter_map(|caps| spec_import(&caps, ImportKind::CssUrl))
            .filter(|url| !import_ranges.iter().any(|r| r.contains(&url.span.start))),
    );
    imports
}

fn scan_html(code: &str) -> Vec<ScannedImport> {
    let comments: Vec<Range<usize>> = HTML_COMMENT.find_iter(code).map(|m| m.range()).collect();
    let in_comment = |pos: usize| comments.iter().any(|r| r.contains(&pos));
    let mut imports = Vec::new();
    let mut scripts = Vec::new();
    let mut inline = 0;

    for caps in HTML_SCRIPT.captures_iter(code) {
        let (Some(whole), Some(attrs), Some(body)) =
            (caps.get(0), caps.name("attrs"), caps.name("body"))
        else {
            continue;
        };
        if in_comment(whole.start()) {
            continue;
        }
        scripts.push(whole.range());

        let is_module = find_attr(attrs.as_str(), attrs.start(), "type")
            .is_some_and(|(value, _)| value.trim().eq_ignore_ascii_case("module"));
        if !is_module {
            tracing::trace!(offset = whole.start(), "classic script left in place");
            continue;
        }

        if let Some((value, span)) = find_attr(attrs.as_str(), attrs.start(), "src") {
            imports.push(ScannedImport {
                specifier: value,
                kind: ImportKind::HtmlScript,
                span,
                statement: whole.range(),
                clause: None,
            });
        } else if !body.as_str().trim().is_empty() {
            imports.push(ScannedImport {
                specifier: inline_script_specifier(inline),
                kind: ImportKind::HtmlInlineScript,
                span: body.range(),
                statement: whole.range(),
                clause: None,
            });
            inline += 1;
        }
    }

    for caps in HTML_RESOURCE.captures_iter(code) {
        let (Some(whole), Some(tag), Some(attrs)) =
            (caps.get(0), caps.name("tag"), caps.name("attrs"))
        else {
            continue;
        };
        if in_comment(whole.start()) || scripts.iter().any(|r| r.contains(&whole.start())) {
            continue;
        }
        let (attr_name, kind) = if tag.as_str().eq_ignore_ascii_case("link") {
            let rel = find_attr(attrs.as_str(), attrs.start(), "rel")
                .map(|(rel, _)| rel.to_ascii_lowercase())
                .unwrap_or_default();
            if rel.split_whitespace().any(|r| r == "stylesheet") {
                ("href", ImportKind::HtmlStylesheet)
            } else if rel.contains("icon") || rel.contains("manifest") || rel.contains("preload") {
                ("href", ImportKind::HtmlAsset)
            } else {
                continue;
            }
        } else {
            ("src", ImportKind::HtmlAsset)
        };

        if let Some((value, span)) = find_attr(attrs.as_str(), attrs.start(), attr_name) {
            imports.push(ScannedImport {
                specifier: value,
                kind,
                span,
                statement: whole.range(),
                clause: None,
            });
        }
    }

    imports
}

/// Find attribute `name` in a tag's attribute text, returning its value and
/// the value's absolute byte range.
fn find_attr(attrs: &str, offset: usize, name: &str) -> Option<(String, Range<usize>)> {
    HTML_ATTR.captures_iter(attrs).find_map(|caps| {
        if !caps.name("name")?.as_str().eq_ignore_ascii_case(name) {
            return None;
        }
        let value = caps
            .name("dq")
            .or_else(|| caps.name("sq"))
            .or_else(|| caps.name("uq"))?;
        let range = value.start() + offset..value.end() + offset;
        Some((value.as_str().to_string(), range))
    })
}
