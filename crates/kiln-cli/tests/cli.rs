// assert_cmd::cargo_bin is deprecated but still works
#![allow(deprecated)]

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn kiln(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("kiln").unwrap();
    cmd.current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("KILN_OUT_DIR")
        .env_remove("KILN_BASE")
        .env_remove("KILN_PRESET");
    cmd
}

fn write(dir: &Path, path: &str, contents: &str) {
    let path = dir.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn app() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "index.html",
        r#"<!DOCTYPE html>
<html>
<head>
  <link rel="stylesheet" href="/src/style.css">
</head>
<body>
  <script type="module" src="/src/main.js"></script>
</body>
</html>
"#,
    );
    write(
        dir.path(),
        "src/main.js",
        "import { greet } from './greet.js';\nconsole.log(greet('kiln'));\n",
    );
    write(
        dir.path(),
        "src/greet.js",
        "export function greet(name) {\n  return 'hello ' + name;\n}\n",
    );
    write(dir.path(), "src/style.css", "body { margin: 0; }\n");
    write(dir.path(), "manifest.json", "{ \"name\": \"app\" }\n");
    dir
}

#[test]
fn builds_from_kiln_toml() {
    let dir = app();
    write(
        dir.path(),
        "kiln.toml",
        r#"
[build]
preset = "relocatable"
copy = [{ from = "manifest.json" }]

[build.entries]
index = "index.html"
"#,
    );

    kiln(dir.path())
        .arg("build")
        .assert()
        .success()
        .stderr(predicate::str::contains("index.js"));

    let dist = dir.path().join("dist");
    for name in ["index.html", "index.js", "style.css", "manifest.json"] {
        assert!(dist.join(name).is_file(), "missing {name}");
    }
    let html = fs::read_to_string(dist.join("index.html")).unwrap();
    assert!(html.contains("src=\"./index.js\""));
    assert!(html.contains("href=\"./style.css\""));
    assert_eq!(
        fs::read(dist.join("manifest.json")).unwrap(),
        fs::read(dir.path().join("manifest.json")).unwrap()
    );
}

#[test]
fn builds_from_flags_alone() {
    let dir = app();

    kiln(dir.path())
        .args([
            "--quiet",
            "build",
            "--preset",
            "relocatable",
            "--entry",
            "index=index.html",
            "--out-dir",
            "public",
            "--copy",
            "manifest.json",
        ])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());

    let public = dir.path().join("public");
    assert!(public.join("index.html").is_file());
    assert!(public.join("index.js").is_file());
    assert!(public.join("manifest.json").is_file());
}

#[test]
fn missing_configuration_exits_with_one() {
    let dir = TempDir::new().unwrap();

    kiln(dir.path())
        .arg("build")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No entries to build"));
}

#[test]
fn explicit_config_that_does_not_exist_exits_with_one() {
    let dir = app();

    kiln(dir.path())
        .args(["build", "--config", "nope.toml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("nope.toml"));
}

#[test]
fn missing_entry_file_is_reported() {
    let dir = app();

    kiln(dir.path())
        .args(["build", "--entry", "admin=admin.html"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("admin.html"));
}

#[test]
fn naming_collision_names_both_sources_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "index.html",
        "<img src=\"./a/logo.png\">\n<img src=\"./b/logo.png\">\n",
    );
    write(dir.path(), "a/logo.png", "first");
    write(dir.path(), "b/logo.png", "second");

    kiln(dir.path())
        .args(["build", "--preset", "relocatable", "--entry", "index=index.html"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("logo.png"))
        .stderr(predicate::str::contains("a/logo.png"))
        .stderr(predicate::str::contains("b/logo.png"));

    assert!(!dir.path().join("dist").exists());
}

#[test]
fn failed_copy_after_write_exits_with_two() {
    let dir = app();

    // index.html is a file in the output, so nothing can be copied below it.
    kiln(dir.path())
        .args([
            "build",
            "--preset",
            "relocatable",
            "--entry",
            "index=index.html",
            "--copy",
            "manifest.json:index.html/manifest.json",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("manifest.json"));

    assert!(dir.path().join("dist/index.html").is_file());
    assert!(dir.path().join("dist/index.js").is_file());
}

#[test]
fn profile_flag_selects_overrides() {
    let dir = app();
    write(
        dir.path(),
        "kiln.toml",
        r#"
[build]
preset = "relocatable"

[build.entries]
index = "index.html"

[profiles.maps.build]
source_maps = true
"#,
    );

    kiln(dir.path())
        .args(["build", "--profile", "maps"])
        .assert()
        .success();
    assert!(dir.path().join("dist/index.js.map").is_file());

    kiln(dir.path())
        .args(["build", "--profile", "staging"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("staging"));
}

#[test]
fn env_overrides_the_config_file() {
    let dir = app();
    write(
        dir.path(),
        "kiln.toml",
        "[build]\npreset = \"relocatable\"\nout_dir = \"dist\"\n\n[build.entries]\nindex = \"index.html\"\n",
    );

    kiln(dir.path())
        .arg("build")
        .env("KILN_OUT_DIR", "from-env")
        .assert()
        .success();

    assert!(dir.path().join("from-env/index.html").is_file());
    assert!(!dir.path().join("dist").exists());
}

#[test]
fn help_lists_build_flags() {
    let dir = TempDir::new().unwrap();

    kiln(dir.path())
        .args(["build", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--entry"))
        .stdout(predicate::str::contains("--preset"));
}

#[test]
fn usage_errors_exit_with_one() {
    let dir = TempDir::new().unwrap();

    kiln(dir.path())
        .args(["build", "--entry", "no-equals-sign"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("NAME=PATH"));
}
