//! Script analysis on the oxc AST.
//!
//! Module declarations are read first, in source order, so every import
//! binding is known before the visitor walks the body. The walk then records
//! `import()` calls with literal specifiers, `new URL('...', import.meta.url)`
//! and every identifier that resolves to an import binding.

use std::ops::Range;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, BindingPattern, BindingPatternKind, Declaration, ExportAllDeclaration,
    ExportDefaultDeclaration, ExportDefaultDeclarationKind, ExportNamedDeclaration, Expression,
    IdentifierReference, ImportDeclaration, ImportDeclarationSpecifier, ImportExpression,
    ModuleDeclaration, ModuleExportName, NewExpression, ObjectProperty, StringLiteral,
};
use oxc_ast_visit::{Visit, walk};
use oxc_parser::{Parser, ParserReturn};
use oxc_semantic::{Scoping, SemanticBuilder, SymbolId};
use oxc_span::{GetSpan, SourceType, Span};
use rustc_hash::FxHashMap;

use super::ScannedImport;
use crate::graph::module::{
    DEFAULT_EXPORT_BINDING, ExportLocal, ImportClause, ImportKind, ImportedName, RewriteKind,
    ScriptExport, ScriptFacts, ScriptRewrite,
};

/// Parser settings for a script with the given extension.
pub(super) fn source_type(extension: Option<&str>) -> SourceType {
    let source_type = match extension {
        Some("ts" | "mts" | "cts") => SourceType::ts(),
        Some("tsx") => SourceType::tsx(),
        Some("jsx") => SourceType::jsx(),
        _ => SourceType::mjs(),
    };
    source_type.with_module(true)
}

/// Parse `code` and collect its imports and export facts.
///
/// Returns the first parser diagnostic on failure.
pub(super) fn scan_script(
    code: &str,
    source_type: SourceType,
) -> Result<(Vec<ScannedImport>, ScriptFacts), String> {
    let allocator = Allocator::default();
    let ParserReturn {
        program, errors, ..
    } = Parser::new(&allocator, code, source_type).parse();
    if let Some(error) = errors.first() {
        return Err(error.to_string());
    }

    let semantic = SemanticBuilder::new().build(&program).semantic;
    let mut collector = Collector {
        scoping: semantic.scoping(),
        imports: Vec::new(),
        facts: ScriptFacts::default(),
        bindings: FxHashMap::default(),
    };

    for statement in &program.body {
        if let Some(declaration) = statement.as_module_declaration() {
            collector.module_declaration(declaration);
        }
    }
    collector.visit_program(&program);

    let Collector {
        imports, mut facts, ..
    } = collector;
    facts.rewrites.sort_by_key(|rewrite| rewrite.span.start);
    Ok((imports, facts))
}

struct Collector<'s> {
    scoping: &'s Scoping,
    imports: Vec<ScannedImport>,
    facts: ScriptFacts,
    /// Import binding -> record index and the name it imports.
    bindings: FxHashMap<SymbolId, (usize, ImportedName)>,
}

fn range(span: Span) -> Range<usize> {
    span.start as usize..span.end as usize
}

/// Text of a string literal without its quotes.
fn literal_range(literal: &StringLiteral<'_>) -> Range<usize> {
    let span = range(literal.span);
    if span.len() < 2 {
        return span;
    }
    span.start + 1..span.end - 1
}

fn export_name(name: &ModuleExportName<'_>) -> String {
    match name {
        ModuleExportName::IdentifierName(ident) => ident.name.to_string(),
        ModuleExportName::IdentifierReference(ident) => ident.name.to_string(),
        ModuleExportName::StringLiteral(literal) => literal.value.to_string(),
    }
}

impl Collector<'_> {
    fn push_import(
        &mut self,
        specifier: &StringLiteral<'_>,
        kind: ImportKind,
        statement: Span,
        clause: Option<ImportClause>,
    ) -> usize {
        self.imports.push(ScannedImport {
            specifier: specifier.value.to_string(),
            kind,
            span: literal_range(specifier),
            statement: range(statement),
            clause,
        });
        self.imports.len() - 1
    }

    fn rewrite(&mut self, span: Range<usize>, kind: RewriteKind) {
        self.facts.rewrites.push(ScriptRewrite { span, kind });
    }

    fn remove(&mut self, start: u32, end: u32) {
        self.rewrite(start as usize..end as usize, RewriteKind::Remove);
    }

    fn export(&mut self, exported: impl Into<String>, local: ExportLocal) {
        self.facts.exports.push(ScriptExport {
            exported: exported.into(),
            local,
        });
    }

    /// The import an identifier refers to, if it refers to one.
    fn imported_binding(&self, ident: &IdentifierReference<'_>) -> Option<(usize, ImportedName)> {
        let reference = ident.reference_id.get()?;
        let symbol = self.scoping.get_reference(reference).symbol_id()?;
        self.bindings.get(&symbol).cloned()
    }

    fn module_declaration(&mut self, declaration: &ModuleDeclaration<'_>) {
        match declaration {
            ModuleDeclaration::ImportDeclaration(import) => self.import_declaration(import),
            ModuleDeclaration::ExportNamedDeclaration(export) => self.export_named(export),
            ModuleDeclaration::ExportDefaultDeclaration(export) => self.export_default(export),
            ModuleDeclaration::ExportAllDeclaration(export) => self.export_all(export),
            _ => {}
        }
    }

    fn import_declaration(&mut self, import: &ImportDeclaration<'_>) {
        if import.import_kind.is_type() {
            self.remove(import.span.start, import.span.end);
            return;
        }
        let Some(specifiers) = &import.specifiers else {
            self.push_import(&import.source, ImportKind::SideEffect, import.span, None);
            return;
        };

        let record = self.imports.len();
        let mut clause = ImportClause::default();
        for specifier in specifiers {
            let (local, name) = match specifier {
                ImportDeclarationSpecifier::ImportDefaultSpecifier(default) => {
                    clause.default = Some(default.local.name.to_string());
                    (&default.local, ImportedName::Named("default".to_string()))
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(namespace) => {
                    clause.namespace = Some(namespace.local.name.to_string());
                    (&namespace.local, ImportedName::Namespace)
                }
                ImportDeclarationSpecifier::ImportSpecifier(named) => {
                    if named.import_kind.is_type() {
                        continue;
                    }
                    let imported = export_name(&named.imported);
                    clause
                        .named
                        .push((imported.clone(), named.local.name.to_string()));
                    (&named.local, ImportedName::Named(imported))
                }
            };
            if let Some(symbol) = local.symbol_id.get() {
                self.bindings.insert(symbol, (record, name));
            }
        }
        self.push_import(&import.source, ImportKind::Static, import.span, Some(clause));
    }

    fn export_named(&mut self, export: &ExportNamedDeclaration<'_>) {
        if export.export_kind.is_type() {
            self.remove(export.span.start, export.span.end);
            return;
        }

        if let Some(source) = &export.source {
            let record = self.push_import(source, ImportKind::ReExport, export.span, None);
            for specifier in &export.specifiers {
                if specifier.export_kind.is_type() {
                    continue;
                }
                self.export(
                    export_name(&specifier.exported),
                    ExportLocal::Import {
                        record,
                        name: ImportedName::Named(export_name(&specifier.local)),
                    },
                );
            }
            return;
        }

        if let Some(declaration) = &export.declaration {
            self.remove(export.span.start, declaration.span().start);
            for name in declared_names(declaration) {
                self.export(name.clone(), ExportLocal::Binding(name));
            }
            return;
        }

        self.remove(export.span.start, export.span.end);
        for specifier in &export.specifiers {
            if specifier.export_kind.is_type() {
                continue;
            }
            let local = match &specifier.local {
                ModuleExportName::IdentifierReference(ident) => match self.imported_binding(ident) {
                    Some((record, name)) => ExportLocal::Import { record, name },
                    None => ExportLocal::Binding(ident.name.to_string()),
                },
                other => ExportLocal::Binding(export_name(other)),
            };
            self.export(export_name(&specifier.exported), local);
        }
    }

    fn export_default(&mut self, export: &ExportDefaultDeclaration<'_>) {
        let start = export.span.start;
        match &export.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(function) => match &function.id {
                Some(id) => {
                    self.remove(start, function.span.start);
                    self.export("default", ExportLocal::Binding(id.name.to_string()));
                }
                None => self.default_value(start, function.span, true),
            },
            ExportDefaultDeclarationKind::ClassDeclaration(class) => match &class.id {
                Some(id) => {
                    self.remove(start, class.span.start);
                    self.export("default", ExportLocal::Binding(id.name.to_string()));
                }
                None => self.default_value(start, class.span, true),
            },
            ExportDefaultDeclarationKind::TSInterfaceDeclaration(_) => {
                self.remove(start, export.span.end);
            }
            other => {
                if let Some(expression) = other.as_expression() {
                    self.default_value(start, expression.span(), false);
                }
            }
        }
    }

    /// Bind the value starting at `value.start` to the default export name.
    fn default_value(&mut self, start: u32, value: Span, terminate: bool) {
        self.rewrite(
            start as usize..value.start as usize,
            RewriteKind::DefaultExpression,
        );
        if terminate {
            let end = value.end as usize;
            self.rewrite(end..end, RewriteKind::Semicolon);
        }
        self.export(
            "default",
            ExportLocal::Binding(DEFAULT_EXPORT_BINDING.to_string()),
        );
    }

    fn export_all(&mut self, export: &ExportAllDeclaration<'_>) {
        if export.export_kind.is_type() {
            self.remove(export.span.start, export.span.end);
            return;
        }
        let record = self.push_import(&export.source, ImportKind::ReExport, export.span, None);
        match &export.exported {
            Some(name) => self.export(
                export_name(name),
                ExportLocal::Import {
                    record,
                    name: ImportedName::Namespace,
                },
            ),
            None => self.facts.star_exports.push(record),
        }
    }

    fn reference(&mut self, span: Span, record: usize, name: ImportedName, shorthand: bool) {
        self.rewrite(
            range(span),
            RewriteKind::Reference {
                record,
                name,
                shorthand,
            },
        );
    }
}

impl<'a> Visit<'a> for Collector<'_> {
    // Module declarations were handled up front; only exported declarations
    // carry code worth walking.
    fn visit_import_declaration(&mut self, _import: &ImportDeclaration<'a>) {}

    fn visit_export_all_declaration(&mut self, _export: &ExportAllDeclaration<'a>) {}

    fn visit_export_named_declaration(&mut self, export: &ExportNamedDeclaration<'a>) {
        if let Some(declaration) = &export.declaration {
            self.visit_declaration(declaration);
        }
    }

    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        if let Some((record, name)) = self.imported_binding(ident) {
            self.reference(ident.span, record, name, false);
        }
    }

    fn visit_object_property(&mut self, property: &ObjectProperty<'a>) {
        if property.shorthand {
            if let Expression::Identifier(ident) = &property.value {
                if let Some((record, name)) = self.imported_binding(ident) {
                    self.reference(ident.span, record, name, true);
                    return;
                }
            }
        }
        walk::walk_object_property(self, property);
    }

    fn visit_import_expression(&mut self, import: &ImportExpression<'a>) {
        if let Expression::StringLiteral(source) = &import.source {
            self.push_import(source, ImportKind::Dynamic, import.span, None);
        }
        walk::walk_import_expression(self, import);
    }

    fn visit_new_expression(&mut self, new: &NewExpression<'a>) {
        if let Some(specifier) = asset_url(new) {
            self.push_import(specifier, ImportKind::AssetUrl, new.span, None);
        }
        walk::walk_new_expression(self, new);
    }
}

/// The literal in `new URL('<literal>', import.meta.url)`.
fn asset_url<'b, 'a>(new: &'b NewExpression<'a>) -> Option<&'b StringLiteral<'a>> {
    let Expression::Identifier(callee) = &new.callee else {
        return None;
    };
    if callee.name.as_str() != "URL" || new.arguments.len() != 2 {
        return None;
    }
    let Argument::StringLiteral(specifier) = &new.arguments[0] else {
        return None;
    };
    let Argument::StaticMemberExpression(member) = &new.arguments[1] else {
        return None;
    };
    let Expression::MetaProperty(meta) = &member.object else {
        return None;
    };
    let is_meta_url = meta.meta.name.as_str() == "import"
        && meta.property.name.as_str() == "meta"
        && member.property.name.as_str() == "url";
    is_meta_url.then_some(&**specifier)
}

/// Runtime bindings introduced by an exported declaration.
fn declared_names(declaration: &Declaration<'_>) -> Vec<String> {
    let mut names = Vec::new();
    match declaration {
        Declaration::VariableDeclaration(variable) => {
            for declarator in &variable.declarations {
                pattern_names(&declarator.id, &mut names);
            }
        }
        Declaration::FunctionDeclaration(function) => {
            names.extend(function.id.as_ref().map(|id| id.name.to_string()));
        }
        Declaration::ClassDeclaration(class) => {
            names.extend(class.id.as_ref().map(|id| id.name.to_string()));
        }
        Declaration::TSEnumDeclaration(enumeration) => names.push(enumeration.id.name.to_string()),
        _ => {}
    }
    names
}

fn pattern_names(pattern: &BindingPattern<'_>, names: &mut Vec<String>) {
    match &pattern.kind {
        BindingPatternKind::BindingIdentifier(ident) => names.push(ident.name.to_string()),
        BindingPatternKind::ObjectPattern(object) => {
            for property in &object.properties {
                pattern_names(&property.value, names);
            }
            if let Some(rest) = &object.rest {
                pattern_names(&rest.argument, names);
            }
        }
        BindingPatternKind::ArrayPattern(array) => {
            for element in array.elements.iter().flatten() {
                pattern_names(element, names);
            }
            if let Some(rest) = &array.rest {
                pattern_names(&rest.argument, names);
            }
        }
        BindingPatternKind::AssignmentPattern(assignment) => {
            pattern_names(&assignment.left, names);
        }
    }
}
