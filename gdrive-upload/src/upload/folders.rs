use tracing::info;

use crate::remote::RemoteStore;

use super::error::UploadError;
use super::walker::FolderDescriptor;

/// Creates `missing` one level at a time under `parent`, each new folder
/// becoming the parent of the next. Returns the deepest folder.
///
/// Folders created before a failure are left in place.
pub async fn create_missing_folders<S>(
    store: &S,
    parent: &FolderDescriptor,
    missing: &[String],
) -> Result<FolderDescriptor, UploadError>
where
    S: RemoteStore + ?Sized,
{
    let mut current = parent.clone();
    for (created, name) in missing.iter().enumerate() {
        let id = store
            .create_folder(&current.id, name)
            .await
            .map_err(|source| UploadError::RemoteCreate {
                folder: name.clone(),
                created,
                source,
            })?;
        info!(name = %name, id = %id, parent_id = %current.id, "created folder");
        current = FolderDescriptor {
            name: name.clone(),
            id,
            parent_id: current.id,
        };
    }
    Ok(current)
}
