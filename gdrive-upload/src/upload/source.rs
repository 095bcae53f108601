use std::io;
use std::path::{Path, PathBuf};

use super::error::LocalFileError;
use crate::config::expand_path;

/// Type used when the file name gives no hint.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// A local file that has been checked and is ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

impl SourceFile {
    /// Resolves `raw` (with `~` expanded) to an absolute path and checks that it
    /// names an existing regular file.
    pub fn inspect(raw: &Path) -> Result<Self, LocalFileError> {
        let expanded = expand_path(raw, dirs::home_dir().as_deref());
        let path = std::path::absolute(&expanded).map_err(|source| {
            LocalFileError::Inaccessible {
                path: expanded.clone(),
                source,
            }
        })?;

        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(LocalFileError::Missing(path));
            }
            Err(source) => return Err(LocalFileError::Inaccessible { path, source }),
        };
        if !metadata.is_file() {
            return Err(LocalFileError::NotAFile(path));
        }

        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return Err(LocalFileError::NotAFile(path));
        };
        let mime_type = guess_mime_type(&path);

        Ok(Self {
            name,
            mime_type,
            size: metadata.len(),
            path,
        })
    }
}

fn guess_mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string()
}
