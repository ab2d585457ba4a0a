//! Generated bundle and the writer that flushes it to disk.

pub mod writer;

pub use writer::{empty_dir, write_bundle};

use serde::Serialize;

/// What an output file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Chunk,
    Asset,
    Html,
    SourceMap,
}

/// One file of the bundle, named relative to the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub filename: String,
    pub source: Vec<u8>,
    pub kind: OutputKind,
}

impl OutputFile {
    pub fn new(filename: impl Into<String>, source: impl Into<Vec<u8>>, kind: OutputKind) -> Self {
        Self {
            filename: filename.into(),
            source: source.into(),
            kind,
        }
    }

    /// Content as text, lossily decoded.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.source)
    }
}

/// Every file a build produces, in emission order. Filenames are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleOutput {
    files: Vec<OutputFile>,
}

impl BundleOutput {
    pub fn new(files: Vec<OutputFile>) -> Self {
        Self { files }
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutputFile> {
        self.files.iter()
    }

    pub fn get(&self, filename: &str) -> Option<&OutputFile> {
        self.files.iter().find(|f| f.filename == filename)
    }

    pub fn of_kind(&self, kind: OutputKind) -> impl Iterator<Item = &OutputFile> {
        self.files.iter().filter(move |f| f.kind == kind)
    }

    pub fn filenames(&self) -> Vec<String> {
        self.files.iter().map(|f| f.filename.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.source.len() as u64).sum()
    }

    pub(crate) fn push(&mut self, file: OutputFile) {
        self.files.push(file);
    }
}

impl<'a> IntoIterator for &'a BundleOutput {
    type Item = &'a OutputFile;
    type IntoIter = std::slice::Iter<'a, OutputFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}
