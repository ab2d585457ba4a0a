//! Output file naming.
//!
//! Patterns understand `[name]`, `[ext]`, `[extname]` and `[hash]`. The hash
//! is the first eight hex digits of a blake3 digest over whatever the caller
//! considers the file's identity, and is only computed when the pattern asks
//! for it.

use rustc_hash::FxHashMap;

use crate::{Error, Result};

const HASH_LEN: usize = 8;

/// Short content hash used for `[hash]`.
pub fn content_hash(parts: &[&[u8]]) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
        hasher.update(&[0]);
    }
    let hex = hasher.finalize().to_hex();
    hex[..HASH_LEN].to_string()
}

/// Expand `pattern` and place the result under `dir` when `dir` is non-empty.
pub fn render_file_name(
    pattern: &str,
    dir: &str,
    name: &str,
    ext: &str,
    hash: impl FnOnce() -> String,
) -> String {
    let mut file = if ext.is_empty() {
        pattern.replace(".[ext]", "").replace("[extname]", "")
    } else {
        pattern.replace("[extname]", &format!(".{}", ext))
    };
    file = file.replace("[ext]", ext).replace("[name]", name);
    if file.contains("[hash]") {
        file = file.replace("[hash]", &hash());
    }

    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        file
    } else {
        format!("{}/{}", dir, file)
    }
}

/// Split `name.ext` into `(name, ext)`.
pub fn split_name(file: &str) -> (&str, &str) {
    let file = file.rsplit('/').next().unwrap_or(file);
    match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext),
        _ => (file, ""),
    }
}

/// Every filename claimed so far and what claimed it.
#[derive(Debug, Default)]
pub struct NameRegistry {
    claimed: FxHashMap<String, String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `filename` for `source`; a second claim is a collision.
    pub fn claim(&mut self, filename: &str, source: impl Into<String>) -> Result<()> {
        let source = source.into();
        if let Some(first) = self.claimed.get(filename) {
            return Err(Error::NamingCollision {
                filename: filename.to_string(),
                first: first.clone(),
                second: source,
            });
        }
        self.claimed.insert(filename.to_string(), source);
        Ok(())
    }

    pub fn is_claimed(&self, filename: &str) -> bool {
        self.claimed.contains_key(filename)
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_patterns() {
        let unused = || -> String { unreachable!("hash not requested") };
        assert_eq!(render_file_name("[name].js", "", "index", "js", unused), "index.js");
        assert_eq!(render_file_name("[name].[ext]", "", "logo", "png", unused), "logo.png");
        assert_eq!(render_file_name("[name][extname]", "", "LICENSE", "", unused), "LICENSE");
        assert_eq!(render_file_name("[name].[ext]", "", "LICENSE", "", unused), "LICENSE");
    }

    #[test]
    fn hashed_pattern_under_assets_dir() {
        let name = render_file_name("[name]-[hash].[ext]", "assets/", "logo", "svg", || {
            content_hash(&[b"<svg/>"])
        });
        assert!(name.starts_with("assets/logo-"));
        assert!(name.ends_with(".svg"));
        assert_eq!(name.len(), "assets/logo-".len() + HASH_LEN + ".svg".len());
    }

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        assert_eq!(content_hash(&[b"a", b"b"]), content_hash(&[b"a", b"b"]));
        assert_ne!(content_hash(&[b"a", b"b"]), content_hash(&[b"ab"]));
        assert_ne!(content_hash(&[b"a"]), content_hash(&[b"b"]));
    }

    #[test]
    fn split_name_keeps_dotfiles_whole() {
        assert_eq!(split_name("style.css"), ("style", "css"));
        assert_eq!(split_name("icons/app.min.js"), ("app.min", "js"));
        assert_eq!(split_name(".nojekyll"), (".nojekyll", ""));
    }

    #[test]
    fn second_claim_collides() {
        let mut names = NameRegistry::new();
        names.claim("logo.png", "src/a/logo.png").unwrap();
        let err = names.claim("logo.png", "src/b/logo.png").unwrap_err();
        match err {
            Error::NamingCollision {
                filename,
                first,
                second,
            } => {
                assert_eq!(filename, "logo.png");
                assert_eq!(first, "src/a/logo.png");
                assert_eq!(second, "src/b/logo.png");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
