use std::fmt;
use std::io::{BufRead, Write};

use async_trait::async_trait;
use gdrive_core::{DriveClient, DriveError, ListScope, ROOT_FOLDER_ID, SharedDrive};
use thiserror::Error;
use tracing::{debug, info};

use crate::upload::FolderDescriptor;

/// Name selecting the personal drive instead of a shared drive. Case-sensitive.
pub const PERSONAL_DRIVE_NAME: &str = "My Drive";

/// Failures choosing the target drive. Raised before any upload step, so
/// these sit beside `UploadError` rather than inside it.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("no shared drive named '{0}' is visible to this account")]
    NotFound(String),
    #[error("{count} shared drives are named '{name}'; cannot choose one while running unattended")]
    NeedsInteraction { name: String, count: usize },
    #[error("invalid selection '{input}': expected a number between 1 and {max}")]
    InvalidSelection { input: String, max: usize },
    #[error("failed to list shared drives: {0}")]
    Query(#[from] DriveError),
    #[error("failed to read selection: {0}")]
    Io(#[from] std::io::Error),
}

/// The drive an upload targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container {
    MyDrive,
    Shared(SharedDrive),
}

impl Container {
    pub fn scope(&self) -> ListScope {
        match self {
            Container::MyDrive => ListScope::MyDrive,
            Container::Shared(drive) => ListScope::SharedDrive(drive.id.clone()),
        }
    }

    /// A shared drive's root folder shares the drive's id.
    pub fn root(&self) -> FolderDescriptor {
        match self {
            Container::MyDrive => FolderDescriptor::root(ROOT_FOLDER_ID, PERSONAL_DRIVE_NAME),
            Container::Shared(drive) => FolderDescriptor::root(drive.id.clone(), drive.name.clone()),
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Container::MyDrive => f.write_str(PERSONAL_DRIVE_NAME),
            Container::Shared(drive) => write!(f, "{} ({})", drive.name, drive.id),
        }
    }
}

/// Source of shared drives by exact name.
#[async_trait]
pub trait DriveDirectory: Send + Sync {
    async fn shared_drives_named(&self, name: &str) -> Result<Vec<SharedDrive>, DriveError>;
}

#[async_trait]
impl DriveDirectory for DriveClient {
    async fn shared_drives_named(&self, name: &str) -> Result<Vec<SharedDrive>, DriveError> {
        let drives = self.list_drives(Some(name)).await?;
        // The server-side filter is case-insensitive.
        Ok(drives.into_iter().filter(|drive| drive.name == name).collect())
    }
}

/// Picks one of several equally named drives, returning its index.
pub trait DriveChooser {
    fn choose(&mut self, name: &str, drives: &[SharedDrive]) -> Result<usize, ContainerError>;
}

/// Refuses to choose.
pub struct Unattended;

impl DriveChooser for Unattended {
    fn choose(&mut self, name: &str, drives: &[SharedDrive]) -> Result<usize, ContainerError> {
        Err(ContainerError::NeedsInteraction {
            name: name.to_string(),
            count: drives.len(),
        })
    }
}

/// Prints a numbered list and reads a 1-based choice from one line of input.
pub struct TerminalChooser<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalChooser<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> DriveChooser for TerminalChooser<R, W> {
    fn choose(&mut self, name: &str, drives: &[SharedDrive]) -> Result<usize, ContainerError> {
        writeln!(self.output, "Several shared drives are named '{name}':")?;
        for (index, drive) in drives.iter().enumerate() {
            writeln!(self.output, "  {}) {} ({})", index + 1, drive.name, drive.id)?;
        }
        write!(self.output, "Choose a drive [1-{}]: ", drives.len())?;
        self.output.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        parse_selection(&line, drives.len())
    }
}

/// Parses a 1-based choice into a 0-based index.
pub fn parse_selection(input: &str, max: usize) -> Result<usize, ContainerError> {
    let trimmed = input.trim();
    match trimmed.parse::<usize>() {
        Ok(choice) if (1..=max).contains(&choice) => Ok(choice - 1),
        _ => Err(ContainerError::InvalidSelection {
            input: trimmed.to_string(),
            max,
        }),
    }
}

pub async fn resolve_container<D, C>(
    name: &str,
    directory: &D,
    chooser: &mut C,
) -> Result<Container, ContainerError>
where
    D: DriveDirectory + ?Sized,
    C: DriveChooser + ?Sized,
{
    if name == PERSONAL_DRIVE_NAME {
        return Ok(Container::MyDrive);
    }

    let mut drives = directory.shared_drives_named(name).await?;
    debug!(name, matches = drives.len(), "looked up shared drives");
    let drive = match drives.len() {
        0 => return Err(ContainerError::NotFound(name.to_string())),
        1 => drives.remove(0),
        _ => {
            let index = chooser.choose(name, &drives)?;
            drives.swap_remove(index)
        }
    };
    info!(name = %drive.name, id = %drive.id, "using shared drive");
    Ok(Container::Shared(drive))
}
