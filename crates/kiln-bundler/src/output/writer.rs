//! Bundle writer.
//!
//! Every filename is validated against the output root before anything on
//! disk changes. The root is then optionally emptied and each file written
//! through a temp file + rename, so a single file is either complete or
//! absent. There is no rollback across files: a failure midway leaves the
//! files written so far in place.

use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;

use super::BundleOutput;
use crate::{Error, Result};

/// Write `output` under `dir`, emptying `dir` first when `empty_out_dir` is set.
///
/// Returns the absolute paths written, in output order.
pub fn write_bundle(output: &BundleOutput, dir: &Path, empty_out_dir: bool) -> Result<Vec<PathBuf>> {
    let dir = dir.clean();

    let operations = output
        .iter()
        .map(|file| Ok((validate_output_path(&dir, &file.filename)?, file.source.as_slice())))
        .collect::<Result<Vec<_>>>()?;

    if empty_out_dir {
        empty_dir(&dir)?;
    }
    fs::create_dir_all(&dir).map_err(|source| Error::Write {
        path: dir.clone(),
        source,
    })?;

    let mut written = Vec::with_capacity(operations.len());
    for (path, content) in operations {
        write_file_atomic(&path, content)?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "wrote");
        written.push(path);
    }
    Ok(written)
}

/// Remove everything inside `dir`, keeping `dir` itself. Missing dirs are fine.
pub fn empty_dir(dir: &Path) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(Error::Write {
                path: dir.to_path_buf(),
                source,
            });
        }
    };

    for entry in entries {
        let entry = entry.map_err(|source| Error::Write {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|source| Error::Write {
            path: path.clone(),
            source,
        })?;
        let removed = if file_type.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|source| Error::Write { path, source })?;
    }
    tracing::debug!(dir = %dir.display(), "emptied output directory");
    Ok(())
}

/// Join `filename` onto `base_dir`, rejecting anything that escapes it.
fn validate_output_path(base_dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.is_empty() {
        return Err(Error::InvalidOutputPath("empty filename".to_string()));
    }
    if filename.contains('\0') {
        return Err(Error::InvalidOutputPath(format!(
            "filename '{}' contains a null byte",
            filename.escape_debug()
        )));
    }
    if Path::new(filename).is_absolute() {
        return Err(Error::InvalidOutputPath(format!(
            "filename '{}' is absolute",
            filename
        )));
    }

    let full_path = base_dir.join(Path::new(filename).clean()).clean();
    if !full_path.starts_with(base_dir) || full_path == base_dir {
        return Err(Error::InvalidOutputPath(format!(
            "'{}' escapes output directory '{}'",
            filename,
            base_dir.display()
        )));
    }
    Ok(full_path)
}

fn write_file_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| Error::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut temp = path.as_os_str().to_owned();
    temp.push(".kiln-tmp");
    let temp = PathBuf::from(temp);

    fs::write(&temp, content).map_err(|source| {
        let _ = fs::remove_file(&temp);
        Error::Write {
            path: path.to_path_buf(),
            source,
        }
    })?;
    fs::rename(&temp, path).map_err(|source| {
        let _ = fs::remove_file(&temp);
        Error::Write {
            path: path.to_path_buf(),
            source,
        }
    })
}
