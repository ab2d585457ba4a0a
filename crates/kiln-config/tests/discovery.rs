//! Config file discovery and loading.

use std::fs;
use std::path::PathBuf;

use kiln_config::{ConfigDiscovery, ConfigError, Preset};
use tempfile::TempDir;

#[test]
fn discovers_kiln_toml() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("kiln.toml"),
        r#"
[build]
preset = "relocatable"
out_dir = "public"
copy = [{ from = "manifest.json" }, { from = "static/robots.txt", to = "robots.txt" }]

[build.entries]
index = "index.html"
"#,
    )
    .unwrap();

    let discovery = ConfigDiscovery::new(dir.path());
    assert_eq!(discovery.find().unwrap().file_name().unwrap(), "kiln.toml");

    let config = discovery.load().unwrap();
    assert_eq!(config.build.preset, Preset::Relocatable);
    assert_eq!(config.build.out_dir, Some(PathBuf::from("public")));
    assert_eq!(config.build.entries["index"], PathBuf::from("index.html"));
    assert_eq!(config.build.copy.len(), 2);
    assert_eq!(config.build.copy[1].to, Some(PathBuf::from("robots.txt")));
}

#[test]
fn discovers_package_json_field() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{
  "name": "app",
  "kiln": {
    "build": {
      "entries": { "index": "index.html" },
      "base": "./"
    }
  }
}"#,
    )
    .unwrap();

    let discovery = ConfigDiscovery::new(dir.path());
    assert_eq!(discovery.find().unwrap().file_name().unwrap(), "package.json");
    let config = discovery.load().unwrap();
    assert_eq!(config.build.base.as_deref(), Some("./"));
}

#[test]
fn toml_takes_precedence_over_package_json() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("kiln.toml"),
        "[build.entries]\nindex = \"from-toml.html\"\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{ "kiln": { "build": { "entries": { "index": "from-pkg.html" } } } }"#,
    )
    .unwrap();

    let config = ConfigDiscovery::new(dir.path()).load().unwrap();
    assert_eq!(config.build.entries["index"], PathBuf::from("from-toml.html"));
}

#[test]
fn unknown_fields_in_values_are_reported() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("kiln.toml"),
        "[build]\nsplit_chunks = \"sometimes\"\n",
    )
    .unwrap();

    let err = ConfigDiscovery::new(dir.path()).load().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));
}

#[test]
fn toml_config_converts_to_build_config() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("kiln.toml"),
        r#"
[build]
preset = "relocatable"
source_maps = true
external = ["vue"]

[build.entries]
index = "index.html"
admin = "admin/index.html"
"#,
    )
    .unwrap();

    let options = ConfigDiscovery::new(dir.path()).load().unwrap().build;
    let config = options.to_build_config(dir.path());

    assert_eq!(config.root, dir.path());
    assert_eq!(config.base, "./");
    assert!(config.css_combined);
    assert!(config.source_maps);
    assert_eq!(config.external, vec!["vue".to_string()]);
    let names: Vec<&str> = config.entries.keys().map(String::as_str).collect();
    assert_eq!(names, ["index", "admin"]);
}
