//! Line-granular source maps for rendered chunks.
//!
//! Rewrites keep every module's line structure intact, so each generated line
//! of a module body maps to the same line of its source, column zero. Lines
//! the bundler adds itself stay unmapped.

use oxc_sourcemap::SourceMapBuilder;

/// Tracks the generated line while a chunk is assembled.
#[derive(Default)]
pub struct ChunkMap {
    builder: SourceMapBuilder,
    line: u32,
}

impl ChunkMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source and its original text, returning its id.
    pub fn add_source(&mut self, name: &str, content: &str) -> u32 {
        self.builder.add_source_and_content(name, content)
    }

    /// Generated lines with no original.
    pub fn add_unmapped(&mut self, count: usize) {
        self.line += count as u32;
    }

    /// Map the next `count` generated lines to lines `0..count` of `source`.
    pub fn add_mapped(&mut self, source: u32, count: usize) {
        for original in 0..count as u32 {
            self.builder
                .add_token(self.line, 0, original, 0, Some(source), None);
            self.line += 1;
        }
    }

    pub fn line_count(&self) -> usize {
        self.line as usize
    }

    /// Serialize as JSON for the chunk named `file`.
    pub fn into_json(mut self, file: &str) -> String {
        self.builder.set_file(file);
        self.builder.into_sourcemap().to_json_string()
    }
}

/// Number of lines `text` occupies when followed by more output.
pub fn line_count(text: &str) -> usize {
    if text.is_empty() {
        0
    } else {
        text.lines().count().max(1)
    }
}
