//! Path resolution.
//!
//! Maps entry and import specifiers to module ids, and emitted filenames back
//! to the URLs written into the bundle. Plugin `resolve_id` hooks are consulted
//! first by the graph builder; [`PathResolver`] is the fallback.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use path_clean::PathClean;

use crate::graph::ModuleId;
use crate::runtime::Runtime;
use crate::{Error, Result};

/// Extensions tried, in order, when a specifier has none that exists.
const EXTENSIONS: [&str; 7] = [".js", ".mjs", ".ts", ".jsx", ".tsx", ".json", ".css"];

/// Index files tried when a specifier names a directory.
const INDEX_FILES: [&str; 2] = ["index.js", "index.ts"];

/// Outcome of resolving a specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A module that becomes part of the graph.
    Module(ModuleId),
    /// Left untouched in the output.
    External,
}

/// Filesystem-backed resolver for relative, root-absolute and entry specifiers.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    external: Vec<String>,
    runtime: Arc<dyn Runtime>,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>, external: Vec<String>, runtime: Arc<dyn Runtime>) -> Self {
        Self {
            root: root.into().clean(),
            external,
            runtime,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `specifier` referenced from `importer` (`None` for entries).
    ///
    /// Bare specifiers that are not configured as external fail: there is no
    /// package lookup.
    pub fn resolve(&self, specifier: &str, importer: Option<&ModuleId>) -> Result<Resolution> {
        if is_url(specifier) {
            return Ok(Resolution::External);
        }
        if self.is_external(specifier) {
            return Ok(Resolution::External);
        }

        let request = strip_query(specifier);
        let candidate = if importer.is_none() {
            let path = Path::new(request);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.root.join(path)
            }
        } else if let Some(rooted) = request.strip_prefix('/') {
            let under_root = self.root.join(rooted);
            if self.find_file(&under_root).is_none() && self.runtime.is_file(Path::new(request)) {
                PathBuf::from(request)
            } else {
                under_root
            }
        } else if request.starts_with("./") || request.starts_with("../") || request == "." || request == ".." {
            self.importer_dir(importer).join(request)
        } else {
            return Err(self.unresolved(specifier, importer));
        };

        self.find_file(&candidate.clean())
            .map(|path| Resolution::Module(ModuleId::from_path(&path)))
            .ok_or_else(|| self.unresolved(specifier, importer))
    }

    fn is_external(&self, specifier: &str) -> bool {
        self.external.iter().any(|name| {
            specifier == name
                || specifier
                    .strip_prefix(name.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    fn importer_dir(&self, importer: Option<&ModuleId>) -> PathBuf {
        importer
            .and_then(ModuleId::as_path)
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone())
    }

    /// Exact file, then added extensions, then directory index files.
    fn find_file(&self, path: &Path) -> Option<PathBuf> {
        if self.runtime.is_file(path) {
            return Some(path.to_path_buf());
        }
        let base = path.as_os_str().to_string_lossy();
        for ext in EXTENSIONS {
            let candidate = PathBuf::from(format!("{}{}", base, ext));
            if self.runtime.is_file(&candidate) {
                return Some(candidate);
            }
        }
        if self.runtime.is_dir(path) {
            for index in INDEX_FILES {
                let candidate = path.join(index);
                if self.runtime.is_file(&candidate) {
                    return Some(candidate);
                }
            }
        }
        None
    }

    fn unresolved(&self, specifier: &str, importer: Option<&ModuleId>) -> Error {
        Error::Resolution {
            specifier: specifier.to_string(),
            importer: importer
                .map(|id| self.display_id(id))
                .unwrap_or_else(|| "the build configuration".to_string()),
        }
    }

    /// Project-relative form of a module id for diagnostics.
    pub fn display_id(&self, id: &ModuleId) -> String {
        display_path(&self.root, id)
    }
}

/// `id` relative to `root` with `/` separators; virtual ids as-is.
pub fn display_path(root: &Path, id: &ModuleId) -> String {
    match id.as_path() {
        Some(path) => path
            .strip_prefix(root)
            .map(|rel| rel.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|_| path.display().to_string()),
        None => id.to_string(),
    }
}

/// Whether a specifier is a URL that is never bundled.
pub fn is_url(specifier: &str) -> bool {
    if specifier.starts_with("//") || specifier.starts_with('#') || specifier.is_empty() {
        return true;
    }
    match specifier.split_once(':') {
        Some((scheme, _)) => {
            scheme.len() > 1
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        }
        None => false,
    }
}

fn strip_query(specifier: &str) -> &str {
    specifier.split(['?', '#']).next().unwrap_or(specifier)
}

/// URL for `to_file` as referenced from `from_file`.
///
/// Both are output filenames relative to the output root, `/`-separated. With
/// a relative `base` (`./`, `.` or empty) the result is a path relative to
/// `from_file`'s directory that always starts with `./` or `../`; otherwise it
/// is `base` joined with `to_file`.
pub fn relative_url(from_file: &str, to_file: &str, base: &str) -> String {
    if !(base.is_empty() || base == "." || base.starts_with("./")) {
        let base = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        };
        return format!("{}{}", base, to_file);
    }

    let from_dir: Vec<&str> = match from_file.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').filter(|s| !s.is_empty()).collect(),
        None => Vec::new(),
    };
    let to: Vec<&str> = to_file.split('/').filter(|s| !s.is_empty()).collect();

    let common = from_dir
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = std::iter::repeat_n("..", from_dir.len() - common).collect();
    parts.extend(&to[common..]);
    let joined = parts.join("/");

    if joined.starts_with("../") {
        joined
    } else {
        format!("./{}", joined)
    }
}

/// Relative filesystem path from directory `from` to `to`, `/`-separated.
pub(crate) fn relative_path(from: &Path, to: &Path) -> String {
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<String> = std::iter::repeat_n("..".to_string(), from.len() - common).collect();
    parts.extend(
        to[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    parts.join("/")
}
