//! Destination resolution and upload orchestration.
//!
//! A destination path such as `/Reports/2024/q1.pdf` is parsed into folder
//! segments and a leaf name, walked against the remote tree to find the
//! existing prefix, completed by creating the missing folders in order, and
//! finally used as the parent of the uploaded file. When the whole folder
//! path already exists the leaf name is checked for collisions and given a
//! ` (N)` suffix if needed.

mod collision;
mod destination;
mod error;
mod folders;
mod orchestrator;
mod source;
mod walker;

#[cfg(test)]
pub(crate) mod testing;

pub use collision::{next_free_name, resolve_collision, split_extension};
pub use destination::{DestinationPath, ROOT_MARKER};
pub use error::{LocalFileError, UploadError};
pub use folders::create_missing_folders;
pub use orchestrator::{ResolutionResult, UploadOrchestrator, UploadPlan, UploadReport};
pub use source::{DEFAULT_MIME_TYPE, SourceFile};
pub use walker::{FolderDescriptor, TreeWalk, find_child_folder, walk_remote_tree};
