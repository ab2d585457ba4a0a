//! Filesystem access for the module graph.
//!
//! The graph builder reads sources through the [`Runtime`] trait so that
//! embedders can serve modules from memory. [`NativeRuntime`] is the default,
//! backed by the local filesystem.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// Errors reported by a [`Runtime`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    /// The requested file does not exist.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;

/// Source access used while building the module graph.
#[async_trait]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    /// Read a file's bytes.
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Whether a regular file exists at `path`.
    fn is_file(&self, path: &Path) -> bool;

    /// Whether a directory exists at `path`.
    fn is_dir(&self, path: &Path) -> bool;
}

/// Runtime backed by the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeRuntime;

#[async_trait]
impl Runtime for NativeRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            std::fs::read(&path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RuntimeError::FileNotFound(path.clone())
                } else {
                    RuntimeError::Io(format!("Failed to read {}: {}", path.display(), e))
                }
            })
        })
        .await
        .map_err(|e| RuntimeError::Other(format!("Task join error: {}", e)))?
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}
