use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use gdrive_core::{DriveClient, DriveError};
use gdrive_upload::cli::CliArgs;
use gdrive_upload::config::UploadConfig;
use gdrive_upload::container::{
    Container, ContainerError, TerminalChooser, Unattended, resolve_container,
};
use gdrive_upload::credentials::{self, CredentialError};
use gdrive_upload::remote::{DriveStore, RemoteError};
use gdrive_upload::upload::{SourceFile, UploadOrchestrator};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const EXIT_FAILURE: u8 = 1;
const EXIT_NEEDS_INTERACTION: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = CliArgs::parse();
    init_tracing(cli.verbose);

    let config = UploadConfig::resolve(&cli);
    let result = if cli.logout {
        logout(&config)
    } else {
        run(&config).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            if is_auth_failure(&err) {
                eprintln!(
                    "hint: the stored Google credentials were rejected; run with --logout and sign in again"
                );
            }
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directives = if verbose {
        "info,gdrive_upload=debug,gdrive_core=debug"
    } else {
        "info"
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn logout(config: &UploadConfig) -> anyhow::Result<()> {
    let removed = credentials::logout(&config.credential_settings())
        .context("failed to remove saved token")?;
    if removed {
        info!(path = %config.token_file.display(), "saved token removed");
    } else {
        info!(path = %config.token_file.display(), "no saved token to remove");
    }
    Ok(())
}

async fn run(config: &UploadConfig) -> anyhow::Result<()> {
    let source_path = config
        .source_file
        .as_deref()
        .context("--source-file is required")?;
    // Local problems are reported before any sign-in or remote call.
    let source = SourceFile::inspect(source_path).context("cannot upload source file")?;

    let token = credentials::resolve_access_token(&config.credential_settings())
        .await
        .context("failed to obtain Google Drive credentials")?;
    let client = match config.api_base.as_deref() {
        Some(base) => DriveClient::with_base_url(base, token),
        None => DriveClient::new(token),
    }
    .context("failed to build Drive client")?;

    let container = select_container(config, &client).await?;
    info!(drive = %container, "target drive resolved");

    let store = DriveStore::new(client, &container);
    let orchestrator = UploadOrchestrator::new(&store);

    if config.dry_run {
        let plan = orchestrator
            .plan_source(source, &config.destination_path)
            .await
            .map_err(|err| {
                let step = err.step();
                anyhow::Error::new(err).context(format!("dry run failed to {step}"))
            })?;
        println!("{plan}");
        return Ok(());
    }

    let report = orchestrator
        .upload_source(source, &config.destination_path)
        .await
        .map_err(|err| {
            let step = err.step();
            anyhow::Error::new(err).context(format!("upload failed to {step}"))
        })?;
    info!(
        name = %report.file_name,
        parent_id = %report.parent_id,
        created_folders = report.created_folders,
        mime_type = %report.mime_type,
        size = report.size,
        "upload complete"
    );
    println!("{}", report.file_id);
    Ok(())
}

async fn select_container(
    config: &UploadConfig,
    client: &DriveClient,
) -> anyhow::Result<Container> {
    let name = config.drive_name.as_str();
    let container = if config.unattended {
        resolve_container(name, client, &mut Unattended).await
    } else {
        let stdin = std::io::stdin();
        let mut chooser = TerminalChooser::new(stdin.lock(), std::io::stderr());
        resolve_container(name, client, &mut chooser).await
    };
    container.with_context(|| format!("failed to select drive '{name}'"))
}

fn exit_code(err: &anyhow::Error) -> u8 {
    let needs_interaction = err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<CredentialError>(),
            Some(CredentialError::NeedsInteraction(_))
        ) || matches!(
            cause.downcast_ref::<ContainerError>(),
            Some(ContainerError::NeedsInteraction { .. })
        )
    });
    if needs_interaction {
        EXIT_NEEDS_INTERACTION
    } else {
        EXIT_FAILURE
    }
}

fn is_auth_failure(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<RemoteError>()
            .is_some_and(RemoteError::is_auth_error)
            || cause
                .downcast_ref::<DriveError>()
                .is_some_and(DriveError::is_auth_error)
    })
}
