//! End-to-end builds of small projects in the relocatable layout.

mod helpers;

use std::fs;

use helpers::{
    Project, assert_chunks_are_valid_modules, emitted_references, resolve_reference, sample_app,
};
use kiln_bundler::plugins::CopyFilePlugin;
use kiln_bundler::{Bundler, OutputKind};

#[tokio::test]
async fn single_script_page_builds_to_flat_outputs() {
    let project = Project::new();
    project
        .file(
            "index.html",
            "<html><body><script type=\"module\" src=\"./main.js\"></script></body></html>\n",
        )
        .file("main.js", "console.log('hello');\n");

    let result = project.relocatable().build().await.unwrap();

    assert!(result.is_clean());
    assert_eq!(result.module_count, 2);
    let mut names = result.output.filenames();
    names.sort();
    assert_eq!(names, vec!["index.html".to_string(), "index.js".to_string()]);

    let html = project.read_output("index.html");
    assert!(html.contains(r#"<script type="module" crossorigin src="./index.js"></script>"#));
    assert!(!html.contains("main.js"));
    assert!(project.read_output("index.js").contains("console.log('hello');"));
    assert!(!project.output_exists("index.js.map"));
}

#[tokio::test]
async fn sample_app_produces_expected_layout() {
    let project = sample_app();
    let result = Bundler::new(project.relocatable())
        .plugin(CopyFilePlugin::new("manifest.json"))
        .build()
        .await
        .unwrap();

    assert!(result.is_clean(), "{:?}", result.post_write_errors);
    let mut names = result.output.filenames();
    names.sort();
    assert_eq!(
        names,
        vec![
            "bg.png",
            "favicon.ico",
            "index.html",
            "index.js",
            "logo.svg",
            "style.css",
        ]
    );
    assert_eq!(result.chunks().count(), 1);
    assert_eq!(result.written.len(), 6);

    let html = project.read_output("index.html");
    assert!(html.contains(r#"href="./favicon.ico""#));
    assert!(html.contains(r#"<link rel="stylesheet" crossorigin href="./style.css">"#));
    assert!(html.contains(r#"<script type="module" crossorigin src="./index.js"></script>"#));

    let js = project.read_output("index.js");
    assert!(js.contains("function greet(name)"));
    assert!(js.contains(r#"const logo = "./logo.svg";"#));
    assert!(js.contains("__kiln_ns_6.greet('kiln')"));
    assert!(!js.contains("import "));
    assert_chunks_are_valid_modules(&result);

    let css = project.read_output("style.css");
    let reset = css.find("margin: 0").unwrap();
    let body = css.find("body {").unwrap();
    assert!(reset < body, "imported sheet comes first");
    assert!(css.contains("url('./bg.png')"));
    assert!(!css.contains("@import"));

    assert_eq!(
        fs::read(project.dist().join("bg.png")).unwrap(),
        fs::read(project.root().join("src/assets/bg.png")).unwrap()
    );
}

#[tokio::test]
async fn copied_manifest_is_byte_identical() {
    let project = sample_app();
    Bundler::new(project.relocatable())
        .plugin(CopyFilePlugin::new("manifest.json"))
        .build()
        .await
        .unwrap();

    assert_eq!(
        fs::read(project.dist().join("manifest.json")).unwrap(),
        fs::read(project.root().join("manifest.json")).unwrap()
    );
}

#[tokio::test]
async fn manifest_is_not_copied_when_the_build_fails() {
    let project = sample_app();
    project.file(
        "src/main.js",
        "import { greet } from './missing.js';\ngreet('kiln');\n",
    );
    fs::create_dir_all(project.dist()).unwrap();
    fs::write(project.dist().join("manifest.json"), "stale").unwrap();

    let err = Bundler::new(project.relocatable())
        .plugin(CopyFilePlugin::new("manifest.json"))
        .build()
        .await
        .unwrap_err();

    assert!(err.is_pre_write());
    assert_eq!(project.read_output("manifest.json"), "stale");
    assert!(!project.output_exists("index.html"));
}

#[tokio::test]
async fn relative_base_never_emits_root_absolute_references() {
    let project = sample_app();
    let result = project.relocatable().build().await.unwrap();

    let references = emitted_references(&result);
    assert!(!references.is_empty());
    for (file, reference) in &references {
        assert!(
            !reference.starts_with('/'),
            "{} references {} absolutely",
            file,
            reference
        );
    }
}

#[tokio::test]
async fn every_emitted_reference_resolves_inside_the_output() {
    let project = sample_app();
    let result = project.relocatable().build().await.unwrap();

    for (file, reference) in emitted_references(&result) {
        let target = resolve_reference(&result.out_dir, &file, &reference);
        assert!(
            target.is_file(),
            "{} references {} which resolves to missing {}",
            file,
            reference,
            target.display()
        );
    }
}

#[tokio::test]
async fn output_directory_is_emptied_by_default() {
    let project = sample_app();
    fs::create_dir_all(project.dist().join("old")).unwrap();
    fs::write(project.dist().join("old/leftover.js"), "old").unwrap();

    project.relocatable().build().await.unwrap();

    assert!(!project.output_exists("old/leftover.js"));
    assert!(project.output_exists("index.html"));
}

#[tokio::test]
async fn keeping_the_output_directory_preserves_unrelated_files() {
    let project = sample_app();
    fs::create_dir_all(project.dist()).unwrap();
    fs::write(project.dist().join("CNAME"), "example.com").unwrap();

    project
        .relocatable()
        .empty_out_dir(false)
        .build()
        .await
        .unwrap();

    assert_eq!(project.read_output("CNAME"), "example.com");
    assert!(project.output_exists("index.js"));
}

#[tokio::test]
async fn script_entry_without_html_emits_only_its_chunk() {
    let project = Project::new();
    project
        .file("src/worker.js", "import { tick } from './tick.js';\nexport default tick;\n")
        .file("src/tick.js", "export const tick = () => 1;\n");

    let result = kiln_bundler::BuildConfig::relocatable(project.root())
        .entry("worker", "src/worker.js")
        .build()
        .await
        .unwrap();

    assert_eq!(result.output.filenames(), vec!["worker.js".to_string()]);
    let js = project.read_output("worker.js");
    assert!(js.contains("const __kiln_default = __kiln_ns_1.tick;"));
    assert!(js.contains("__kiln_init_0();"));
    assert!(js.trim_end().ends_with("export { __kiln_export_0 as default };"));
    assert_chunks_are_valid_modules(&result);
    assert_eq!(
        result.output.get("worker.js").map(|f| f.kind),
        Some(OutputKind::Chunk)
    );
}

#[tokio::test]
async fn external_imports_are_left_untouched() {
    let project = Project::new();
    project.file(
        "main.js",
        "import { h } from 'preact';\nimport 'https://cdn.example.com/x.js';\nh();\n",
    );

    kiln_bundler::BuildConfig::relocatable(project.root())
        .entry("main", "main.js")
        .external(["preact"])
        .build()
        .await
        .unwrap();

    let js = project.read_output("main.js");
    assert!(js.starts_with(
        "import \"https://cdn.example.com/x.js\";\nimport * as __kiln_ext_0 from \"preact\";\n"
    ));
    assert!(js.contains("__kiln_ext_0.h();"));
}

#[tokio::test]
async fn dynamic_imports_are_bundled_and_rewritten() {
    let project = Project::new();
    project
        .file(
            "main.js",
            "export const load = () => import('./lazy.js').then((m) => m.lazy);
",
        )
        .file("lazy.js", "export const lazy = 'loaded';
");

    let result = kiln_bundler::BuildConfig::relocatable(project.root())
        .entry("main", "main.js")
        .build()
        .await
        .unwrap();

    assert_eq!(result.module_count, 2);
    assert_eq!(result.output.filenames(), vec!["main.js".to_string()]);
    let js = project.read_output("main.js");
    assert!(!js.contains("./lazy.js"), "{}", js);
    assert!(js.contains("const lazy = 'loaded';"));
    assert!(js.contains("Promise.resolve().then(() => (__kiln_init_1(), __kiln_ns_1))"));
    assert_chunks_are_valid_modules(&result);
}

#[tokio::test]
async fn duplicate_top_level_names_do_not_collide() {
    let project = Project::new();
    project
        .file(
            "main.js",
            "import { a } from './a.js';\nconst helper = 2;\nconsole.log(a, helper);\n",
        )
        .file("a.js", "const helper = 1;\nexport const a = helper;\n");

    let result = kiln_bundler::BuildConfig::relocatable(project.root())
        .entry("main", "main.js")
        .build()
        .await
        .unwrap();

    let js = project.read_output("main.js");
    assert_eq!(js.matches("const helper").count(), 2);
    assert!(js.contains("console.log(__kiln_ns_1.a, helper);"));
    assert_chunks_are_valid_modules(&result);
}

#[tokio::test]
async fn inline_module_scripts_are_bundled() {
    let project = Project::new();
    project
        .file(
            "index.html",
            "<html><body>\n<script type=\"module\">import './main.js';</script>\n<script src=\"./legacy.js\"></script>\n</body></html>\n",
        )
        .file("main.js", "document.body.dataset.ready = 'yes';\n");

    let result = project.relocatable().build().await.unwrap();

    let mut names = result.output.filenames();
    names.sort();
    assert_eq!(names, vec!["index.html".to_string(), "index.js".to_string()]);
    let html = project.read_output("index.html");
    assert!(html.contains(r#"<script type="module" crossorigin src="./index.js"></script>"#));
    assert!(!html.contains("import './main.js'"));
    assert!(html.contains(r#"<script src="./legacy.js"></script>"#));
    let js = project.read_output("index.js");
    assert!(js.contains("document.body.dataset.ready = 'yes';"));
    assert_chunks_are_valid_modules(&result);
}

#[tokio::test]
async fn pages_without_module_scripts_still_get_an_entry_chunk() {
    let project = Project::new();
    project.file("index.html", "<html><body><p>static</p></body></html>\n");

    let result = project.relocatable().build().await.unwrap();

    assert_eq!(result.chunks().count(), 1);
    assert_eq!(project.read_output("index.html"), "<html><body><p>static</p></body></html>\n");
    assert_eq!(project.read_output("index.js"), "");
}

#[tokio::test]
async fn bare_specifier_without_external_fails() {
    let project = Project::new();
    project.file("main.js", "import { h } from 'preact';\n");

    let err = kiln_bundler::BuildConfig::relocatable(project.root())
        .entry("main", "main.js")
        .build()
        .await
        .unwrap_err();

    assert!(matches!(err, kiln_bundler::Error::Resolution { ref specifier, .. } if specifier == "preact"));
    assert!(!project.dist().exists());
}
