use tracing::debug;

use crate::remote::{ChildFilter, RemoteError, RemoteStore};

use super::error::UploadError;

/// A remote folder, either found by a listing or returned by a create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderDescriptor {
    pub name: String,
    pub id: String,
    pub parent_id: String,
}

impl FolderDescriptor {
    /// Top-level folder of a container. It is its own parent.
    pub fn root(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: name.into(),
            parent_id: id.clone(),
            id,
        }
    }
}

/// Split of the folder segments into the prefix that exists remotely and the
/// suffix that still has to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeWalk {
    pub present: Vec<FolderDescriptor>,
    pub missing: Vec<String>,
}

/// Looks up a non-trashed child folder named exactly `name`. The store does
/// not enforce unique names, so the first match wins.
pub async fn find_child_folder<S>(
    store: &S,
    parent_id: &str,
    name: &str,
) -> Result<Option<FolderDescriptor>, RemoteError>
where
    S: RemoteStore + ?Sized,
{
    let matches = store
        .list_children(parent_id, ChildFilter::folder_named(name))
        .await?;
    if matches.len() > 1 {
        debug!(
            parent_id,
            name,
            count = matches.len(),
            "multiple folders share this name, using the first"
        );
    }
    Ok(matches.into_iter().next().map(|entry| FolderDescriptor {
        name: name.to_string(),
        id: entry.id,
        parent_id: parent_id.to_string(),
    }))
}

/// Walks `segments` from `root`, stopping at the first segment that does not
/// exist. No lookups are issued past that point.
pub async fn walk_remote_tree<S>(
    store: &S,
    root: &FolderDescriptor,
    segments: &[String],
) -> Result<TreeWalk, UploadError>
where
    S: RemoteStore + ?Sized,
{
    if segments.is_empty() {
        return Ok(TreeWalk {
            present: vec![root.clone()],
            missing: Vec::new(),
        });
    }

    let mut present: Vec<FolderDescriptor> = Vec::with_capacity(segments.len());
    for (index, segment) in segments.iter().enumerate() {
        let parent_id = present.last().map_or(root.id.as_str(), |f| f.id.as_str());
        let found = find_child_folder(store, parent_id, segment)
            .await
            .map_err(|source| UploadError::RemoteQuery {
                folder: segment.clone(),
                source,
            })?;
        match found {
            Some(folder) => present.push(folder),
            None => {
                let missing = segments[index..].to_vec();
                debug!(
                    found = present.len(),
                    missing = ?missing,
                    "destination folders partially present"
                );
                return Ok(TreeWalk { present, missing });
            }
        }
    }

    debug!(found = present.len(), "all destination folders present");
    Ok(TreeWalk {
        present,
        missing: Vec::new(),
    })
}
