use std::path::PathBuf;

use thiserror::Error;

use crate::remote::RemoteError;

#[derive(Debug, Error)]
pub enum LocalFileError {
    #[error("source file '{}' does not exist", .0.display())]
    Missing(PathBuf),
    #[error("'{}' is not a regular file; only individual files can be uploaded", .0.display())]
    NotAFile(PathBuf),
    #[error("failed to inspect '{}': {source}", path.display())]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    LocalFile(#[from] LocalFileError),
    #[error("failed to look up '{folder}': {source}")]
    RemoteQuery {
        folder: String,
        #[source]
        source: RemoteError,
    },
    #[error("failed to create folder '{folder}' ({created} folder(s) created before the failure were kept): {source}")]
    RemoteCreate {
        folder: String,
        created: usize,
        #[source]
        source: RemoteError,
    },
    #[error("failed to upload '{name}': {source}")]
    RemoteUpload {
        name: String,
        #[source]
        source: RemoteError,
    },
}

impl UploadError {
    /// Short name of the pipeline step that failed.
    pub fn step(&self) -> &'static str {
        match self {
            UploadError::LocalFile(_) => "inspect source file",
            UploadError::RemoteQuery { .. } => "resolve destination",
            UploadError::RemoteCreate { .. } => "create folders",
            UploadError::RemoteUpload { .. } => "upload file",
        }
    }

    pub fn remote_source(&self) -> Option<&RemoteError> {
        match self {
            UploadError::LocalFile(_) => None,
            UploadError::RemoteQuery { source, .. }
            | UploadError::RemoteCreate { source, .. }
            | UploadError::RemoteUpload { source, .. } => Some(source),
        }
    }
}
