use std::fmt;
use std::path::Path;

use tracing::{debug, info};

use crate::remote::RemoteStore;

use super::collision::resolve_collision;
use super::destination::DestinationPath;
use super::error::UploadError;
use super::folders::create_missing_folders;
use super::source::SourceFile;
use super::walker::{FolderDescriptor, walk_remote_tree};

/// Outcome of reconciling a destination path with the remote tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    pub root: FolderDescriptor,
    /// Existing folders, root to leaf. Holds only `root` when the
    /// destination has no folder segments.
    pub present_folders: Vec<FolderDescriptor>,
    /// Segments still to be created, in creation order.
    pub missing_folders: Vec<String>,
    pub final_file_name: String,
}

impl ResolutionResult {
    /// Deepest folder that already exists; the container root when none do.
    pub fn deepest_present(&self) -> &FolderDescriptor {
        self.present_folders.last().unwrap_or(&self.root)
    }

    pub fn needs_folders(&self) -> bool {
        !self.missing_folders.is_empty()
    }
}

/// Everything decided before any write happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    pub source: SourceFile,
    pub destination: DestinationPath,
    pub resolution: ResolutionResult,
}

impl fmt::Display for UploadPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resolution = &self.resolution;
        writeln!(
            f,
            "source:           {} ({}, {} bytes)",
            self.source.path.display(),
            self.source.mime_type,
            self.source.size
        )?;
        writeln!(f, "destination:      {}", self.destination.normalized())?;
        let existing: Vec<&str> = resolution
            .present_folders
            .iter()
            .filter(|folder| folder.id != resolution.root.id)
            .map(|folder| folder.name.as_str())
            .collect();
        writeln!(
            f,
            "existing folders: {}",
            display_list(&existing, &resolution.root.name)
        )?;
        let missing: Vec<&str> = resolution.missing_folders.iter().map(String::as_str).collect();
        writeln!(f, "folders to create: {}", display_list(&missing, "none"))?;
        write!(f, "upload as:        {}", resolution.final_file_name)
    }
}

fn display_list(items: &[&str], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.join(" / ")
    }
}

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub file_id: String,
    pub file_name: String,
    pub parent_id: String,
    pub created_folders: usize,
    pub mime_type: String,
    pub size: u64,
}

/// Entry point tying source inspection, destination resolution, folder
/// creation and the upload together. Remote calls are issued one at a time.
pub struct UploadOrchestrator<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> UploadOrchestrator<'a, S>
where
    S: RemoteStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Splits `destination` into existing and missing folders and picks the
    /// final file name. Only listings are issued.
    pub async fn resolve(
        &self,
        destination: &DestinationPath,
    ) -> Result<ResolutionResult, UploadError> {
        let root = self.store.root();
        let walk = walk_remote_tree(self.store, &root, &destination.segments).await?;

        let mut resolution = ResolutionResult {
            root,
            present_folders: walk.present,
            missing_folders: walk.missing,
            final_file_name: destination.leaf.clone(),
        };
        if !resolution.needs_folders() {
            let parent_id = resolution.deepest_present().id.clone();
            resolution.final_file_name =
                resolve_collision(self.store, &parent_id, &destination.leaf)
                    .await
                    .map_err(|source| UploadError::RemoteQuery {
                        folder: destination.leaf.clone(),
                        source,
                    })?;
        }
        Ok(resolution)
    }

    /// Plans an upload of the file at `source_path` without changing anything remotely.
    pub async fn plan(&self, source_path: &Path, destination: &str) -> Result<UploadPlan, UploadError> {
        let source = SourceFile::inspect(source_path)?;
        self.plan_source(source, destination).await
    }

    pub async fn plan_source(
        &self,
        source: SourceFile,
        destination: &str,
    ) -> Result<UploadPlan, UploadError> {
        let destination = DestinationPath::parse(destination, &source.name);
        debug!(
            destination = %destination.normalized(),
            root = destination.is_root(),
            "parsed destination"
        );
        let resolution = self.resolve(&destination).await?;
        Ok(UploadPlan {
            source,
            destination,
            resolution,
        })
    }

    /// Uploads the file at `source_path` to `destination`.
    pub async fn upload(
        &self,
        source_path: &Path,
        destination: &str,
    ) -> Result<UploadReport, UploadError> {
        let plan = self.plan(source_path, destination).await?;
        self.execute(plan).await
    }

    /// Uploads an already inspected source file to `destination`.
    pub async fn upload_source(
        &self,
        source: SourceFile,
        destination: &str,
    ) -> Result<UploadReport, UploadError> {
        let plan = self.plan_source(source, destination).await?;
        self.execute(plan).await
    }

    /// Creates the planned folders, then uploads.
    pub async fn execute(&self, plan: UploadPlan) -> Result<UploadReport, UploadError> {
        let UploadPlan {
            source,
            resolution,
            ..
        } = plan;

        let parent = if resolution.needs_folders() {
            create_missing_folders(
                self.store,
                resolution.deepest_present(),
                &resolution.missing_folders,
            )
            .await?
        } else {
            resolution.deepest_present().clone()
        };

        let file_name = resolution.final_file_name;
        let file_id = self
            .store
            .upload_file(&parent.id, &file_name, &source.mime_type, &source.path)
            .await
            .map_err(|source| UploadError::RemoteUpload {
                name: file_name.clone(),
                source,
            })?;
        info!(file_id = %file_id, name = %file_name, parent_id = %parent.id, "file uploaded");

        Ok(UploadReport {
            file_id,
            file_name,
            parent_id: parent.id,
            created_folders: resolution.missing_folders.len(),
            mime_type: source.mime_type,
            size: source.size,
        })
    }
}
