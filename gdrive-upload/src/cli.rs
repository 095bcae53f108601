//! Command-line argument parsing

use std::path::PathBuf;

use clap::Parser;

/// Upload a file into a Google Drive folder path, creating missing folders
/// and renaming on collisions
#[derive(Parser, Debug, Default)]
#[command(name = "gdrive-upload", author, version, about, long_about = None)]
pub struct CliArgs {
    /// Local file to upload
    #[arg(short = 's', long, required_unless_present = "logout")]
    pub source_file: Option<PathBuf>,

    /// Destination folder path; a trailing component without '/' names the uploaded file
    #[arg(short = 'd', long, default_value = "/")]
    pub destination_path: String,

    /// Shared drive to upload into [default: My Drive, or GDRIVE_DRIVE_NAME]
    #[arg(short = 'n', long)]
    pub drive_name: Option<String>,

    /// Cached OAuth token path [env: GDRIVE_TOKEN_FILE]
    #[arg(long)]
    pub token_file: Option<PathBuf>,

    /// OAuth client credentials downloaded from the Google Cloud console [env: GDRIVE_CREDENTIALS_FILE]
    #[arg(long)]
    pub credentials_file: Option<PathBuf>,

    /// Never prompt; fail with exit code 2 when interaction is needed
    #[arg(long)]
    pub unattended: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Show what would be created and uploaded without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Remove the cached OAuth token and exit
    #[arg(long)]
    pub logout: bool,
}
