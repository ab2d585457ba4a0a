//! HTML entry rewriting.
//!
//! The first bundled module script, external or inline, becomes the tag
//! loading the entry chunk and the first bundled stylesheet `<link>` the one
//! loading the entry's stylesheet; any further bundled tags are dropped since
//! their content is already part of those outputs. Classic scripts are left
//! as written. Other resource attributes point at their emitted assets.

use super::chunk::EntryPlan;
use super::rewrite::{Edit, RenderContext, apply_edits};
use crate::graph::{ImportKind, Module, ModuleKind};

pub fn script_tag(url: &str) -> String {
    format!(r#"<script type="module" crossorigin src="{}"></script>"#, url)
}

pub fn stylesheet_tag(url: &str) -> String {
    format!(r#"<link rel="stylesheet" crossorigin href="{}">"#, url)
}

/// Rewritten HTML for `entry`, emitted as `this_file`.
pub fn render_html(ctx: &RenderContext<'_>, this_file: &str, module: &Module, entry: &EntryPlan) -> String {
    let code = module.code();
    let script_url = ctx.url(this_file, &ctx.chunk_files[entry.chunk]);
    let style_url = entry
        .stylesheet
        .map(|sheet| ctx.url(this_file, &ctx.style_files[sheet]));

    let mut edits = Vec::new();
    let mut script_placed = false;
    let mut style_placed = false;

    for import in &module.imports {
        let Some(dep) = import.module() else {
            continue;
        };
        let Some(target) = ctx.graph.get(dep) else {
            continue;
        };
        match (import.kind, target.kind, &import.statement) {
            (kind, ModuleKind::Script, Some(statement)) if kind.is_html_script() => {
                let tag = if script_placed {
                    String::new()
                } else {
                    script_tag(&script_url)
                };
                script_placed = true;
                edits.push(Edit::new(statement.clone(), tag));
            }
            (ImportKind::HtmlStylesheet, ModuleKind::Style, Some(statement)) => {
                let tag = match &style_url {
                    Some(url) if !style_placed => stylesheet_tag(url),
                    _ => String::new(),
                };
                style_placed = true;
                edits.push(Edit::new(statement.clone(), tag));
            }
            _ => {
                if let (Some(span), Some(url)) = (&import.span, ctx.asset_url(this_file, dep)) {
                    edits.push(Edit::new(span.clone(), url));
                }
            }
        }
    }

    // Styles pulled in from scripts still need a link.
    if let (false, Some(url)) = (style_placed, &style_url) {
        edits.push(Edit::insert(
            injection_point(code),
            format!("{}\n", stylesheet_tag(url)),
        ));
    }

    apply_edits(code, edits)
}

/// Just before `</head>`, else at the start of `<body>`, else the top.
fn injection_point(code: &str) -> usize {
    let lower = code.to_ascii_lowercase();
    if let Some(pos) = lower.find("</head>") {
        return pos;
    }
    lower
        .find("<body")
        .unwrap_or(0)
}
