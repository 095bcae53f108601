use std::path::Path;

use async_trait::async_trait;
use gdrive_core::{DriveClient, DriveError, DriveFile, FileQuery, ListScope};
use thiserror::Error;

use crate::container::Container;
use crate::upload::FolderDescriptor;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error(transparent)]
    Drive(#[from] DriveError),
    #[error("failed to read local file: {0}")]
    Io(#[from] std::io::Error),
    #[error("remote store rejected request: {0}")]
    Rejected(String),
}

impl RemoteError {
    pub fn is_auth_error(&self) -> bool {
        matches!(self, RemoteError::Drive(err) if err.is_auth_error())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch<'a> {
    Exact(&'a str),
    Contains(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildFilter<'a> {
    pub name: NameMatch<'a>,
    pub folders_only: bool,
    pub include_trashed: bool,
}

impl<'a> ChildFilter<'a> {
    /// Non-trashed folders whose name equals `name` exactly.
    pub fn folder_named(name: &'a str) -> Self {
        Self {
            name: NameMatch::Exact(name),
            folders_only: true,
            include_trashed: false,
        }
    }

    /// Non-trashed entries of any kind whose name contains `fragment`.
    pub fn name_containing(fragment: &'a str) -> Self {
        Self {
            name: NameMatch::Contains(fragment),
            folders_only: false,
            include_trashed: false,
        }
    }
}

/// Transient record of one child returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub id: String,
    pub name: String,
    pub parents: Vec<String>,
}

impl From<DriveFile> for ListingEntry {
    fn from(file: DriveFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
            parents: file.parents,
        }
    }
}

/// Remote operations the upload pipeline depends on. Implementations own the
/// transport, credentials and container scope; listings come back fully paginated.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Descriptor of the folder at the top of the target container.
    fn root(&self) -> FolderDescriptor;

    async fn list_children(
        &self,
        parent_id: &str,
        filter: ChildFilter<'_>,
    ) -> Result<Vec<ListingEntry>, RemoteError>;

    /// Creates a folder and returns its id.
    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<String, RemoteError>;

    /// Uploads the file at `local_path` and returns the new file's id.
    async fn upload_file(
        &self,
        parent_id: &str,
        name: &str,
        mime_type: &str,
        local_path: &Path,
    ) -> Result<String, RemoteError>;
}

/// `RemoteStore` backed by the Drive REST API, scoped to one container.
pub struct DriveStore {
    client: DriveClient,
    scope: ListScope,
    root: FolderDescriptor,
}

impl DriveStore {
    pub fn new(client: DriveClient, container: &Container) -> Self {
        Self {
            client,
            scope: container.scope(),
            root: container.root(),
        }
    }
}

#[async_trait]
impl RemoteStore for DriveStore {
    fn root(&self) -> FolderDescriptor {
        self.root.clone()
    }

    async fn list_children(
        &self,
        parent_id: &str,
        filter: ChildFilter<'_>,
    ) -> Result<Vec<ListingEntry>, RemoteError> {
        let mut query = FileQuery::new();
        if filter.folders_only {
            query = query.folders_only();
        }
        query = query.in_parents(parent_id);
        query = match filter.name {
            NameMatch::Exact(name) => query.name_equals(name),
            NameMatch::Contains(fragment) => query.name_contains(fragment),
        };
        if !filter.include_trashed {
            query = query.trashed(false);
        }
        let files = self.client.list_files(&query, &self.scope).await?;
        Ok(files.into_iter().map(ListingEntry::from).collect())
    }

    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<String, RemoteError> {
        let folder = self
            .client
            .create_folder(parent_id, name, &self.scope)
            .await?;
        require_id(folder, "folder creation")
    }

    async fn upload_file(
        &self,
        parent_id: &str,
        name: &str,
        mime_type: &str,
        local_path: &Path,
    ) -> Result<String, RemoteError> {
        let content = tokio::fs::File::open(local_path).await?;
        let size = content.metadata().await?.len();
        let file = self
            .client
            .upload_file(parent_id, name, mime_type, content, size, &self.scope)
            .await?;
        require_id(file, "upload")
    }
}

fn require_id(file: DriveFile, operation: &str) -> Result<String, RemoteError> {
    if file.id.trim().is_empty() {
        return Err(RemoteError::Rejected(format!(
            "{operation} response did not include an id"
        )));
    }
    Ok(file.id)
}
