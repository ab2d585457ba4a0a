//! Shared fixtures for kiln-bundler integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use kiln_bundler::{BuildConfig, BuildResult};
use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use regex::Regex;
use tempfile::TempDir;

/// A throwaway project directory.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn dist(&self) -> PathBuf {
        self.root().join("dist")
    }

    /// Write `content` to `rel`, creating parent directories.
    pub fn file(&self, rel: &str, content: impl AsRef<[u8]>) -> &Self {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, content).expect("write fixture");
        self
    }

    pub fn read_output(&self, rel: &str) -> String {
        fs::read_to_string(self.dist().join(rel))
            .unwrap_or_else(|e| panic!("reading dist/{}: {}", rel, e))
    }

    pub fn output_exists(&self, rel: &str) -> bool {
        self.dist().join(rel).exists()
    }

    /// Flat, relative layout with a single `index` HTML entry.
    pub fn relocatable(&self) -> BuildConfig {
        BuildConfig::relocatable(self.root()).entry("index", "index.html")
    }
}

/// The sample application: an HTML page, a script importing a helper,
/// an image and a stylesheet, plus a manifest copied after the build.
pub fn sample_app() -> Project {
    let project = Project::new();
    project
        .file(
            "index.html",
            r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <link rel="icon" href="/favicon.ico">
  <link rel="stylesheet" href="/src/style.css">
  <title>Sample</title>
</head>
<body>
  <div id="app"></div>
  <script type="module" src="/src/main.js"></script>
</body>
</html>
"#,
        )
        .file(
            "src/main.js",
            "import { greet } from './greet.js';\nimport logo from './assets/logo.svg';\n\ndocument.querySelector('#app').append(greet('kiln'), logo);\n",
        )
        .file(
            "src/greet.js",
            "export function greet(name) {\n  return `hello ${name}`;\n}\n",
        )
        .file(
            "src/style.css",
            "@import './reset.css';\nbody { background: url('./assets/bg.png'); }\n",
        )
        .file("src/reset.css", "* { margin: 0; }\n")
        .file("src/assets/logo.svg", "<svg xmlns=\"http://www.w3.org/2000/svg\"/>")
        .file("src/assets/bg.png", [0x89u8, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0xff])
        .file("favicon.ico", [0u8, 0, 1, 0, 0xff, 0xfe])
        .file("manifest.json", "{\n  \"name\": \"sample\",\n  \"version\": \"1.0.0\"\n}\n");
    project
}

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:src|href)="(?P<attr>[^"]+)"|(?:from|import)\s*"(?P<import>[^"]+)"|url\(['"]?(?P<url>[^'")]+)['"]?\)|new URL\('(?P<new_url>[^']+)'|const [\w$]+ = "(?P<binding>[^"]+)";"#,
    )
    .expect("reference pattern")
});

/// Every reference emitted into text outputs, as `(file, reference)`.
pub fn emitted_references(result: &BuildResult) -> Vec<(String, String)> {
    let mut references = Vec::new();
    for file in result.output.iter() {
        let is_text = [".html", ".js", ".css"]
            .iter()
            .any(|ext| file.filename.ends_with(ext));
        if !is_text {
            continue;
        }
        let text = file.text();
        for caps in REFERENCE.captures_iter(&text) {
            let reference = ["attr", "import", "url", "new_url", "binding"]
                .iter()
                .find_map(|name| caps.name(name))
                .map(|m| m.as_str().to_string());
            if let Some(reference) = reference {
                references.push((file.filename.clone(), reference));
            }
        }
    }
    references
}

/// Resolve `reference` as a browser would from `file` inside `out_dir`.
pub fn resolve_reference(out_dir: &Path, file: &str, reference: &str) -> PathBuf {
    let dir = Path::new(file).parent().unwrap_or(Path::new(""));
    let mut resolved = out_dir.join(dir);
    for part in reference.split('/') {
        match part {
            "." | "" => {}
            ".." => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    resolved
}

/// Parse every emitted chunk as a module, including redeclaration checks,
/// and check that its relative imports name files in the output.
pub fn assert_chunks_are_valid_modules(result: &BuildResult) {
    for file in result.output.iter().filter(|f| f.filename.ends_with(".js")) {
        let text = file.text();
        let allocator = Allocator::default();
        let parsed = Parser::new(&allocator, &text, SourceType::mjs()).parse();
        assert!(
            parsed.errors.is_empty(),
            "{} does not parse: {:?}\n{}",
            file.filename,
            parsed.errors,
            text
        );
        let semantic = SemanticBuilder::new()
            .with_check_syntax_error(true)
            .build(&parsed.program);
        assert!(
            semantic.errors.is_empty(),
            "{} is not a valid module: {:?}\n{}",
            file.filename,
            semantic.errors,
            text
        );

        for (from, reference) in emitted_references(result) {
            let is_relative = reference.starts_with("./") || reference.starts_with("../");
            if from != file.filename || !is_relative {
                continue;
            }
            let target = resolve_reference(&result.out_dir, &from, &reference);
            assert!(
                target.is_file(),
                "{} imports {} which is missing from the output",
                from,
                reference
            );
        }
    }
}
