use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::CliArgs;
use crate::container::PERSONAL_DRIVE_NAME;
use crate::credentials::CredentialSettings;

const APP_DIR_NAME: &str = "gdrive-upload";
const TOKEN_FILE_NAME: &str = "token.json";
const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";
const DEFAULT_OAUTH_TIMEOUT_SECS: u64 = 180;

/// Settings for one run, merged from flags, environment and defaults in
/// that order of precedence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadConfig {
    pub source_file: Option<PathBuf>,
    pub destination_path: String,
    pub drive_name: String,
    pub token_file: PathBuf,
    pub credentials_file: PathBuf,
    pub unattended: bool,
    pub dry_run: bool,
    pub api_base: Option<String>,
    pub oauth_base: Option<String>,
    pub oauth_timeout: Duration,
}

impl UploadConfig {
    pub fn resolve(cli: &CliArgs) -> Self {
        Self::resolve_with(cli, |name| std::env::var(name).ok())
    }

    /// Like `resolve`, reading variables through `env`.
    pub fn resolve_with<F>(cli: &CliArgs, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = dirs::home_dir();
        let env_path = |name: &str| {
            non_empty(env(name)).map(|value| expand_with_home(&value, home.as_deref()))
        };

        let token_file = cli
            .token_file
            .as_ref()
            .map(|path| expand_path(path, home.as_deref()))
            .or_else(|| env_path("GDRIVE_TOKEN_FILE"))
            .unwrap_or_else(default_token_file);
        let credentials_file = cli
            .credentials_file
            .as_ref()
            .map(|path| expand_path(path, home.as_deref()))
            .or_else(|| env_path("GDRIVE_CREDENTIALS_FILE"))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_FILE));
        let drive_name = cli
            .drive_name
            .clone()
            .or_else(|| non_empty(env("GDRIVE_DRIVE_NAME")))
            .unwrap_or_else(|| PERSONAL_DRIVE_NAME.to_string());
        let unattended = cli.unattended || parse_flag(env("GDRIVE_UNATTENDED"));
        let oauth_timeout = Duration::from_secs(
            env("GDRIVE_OAUTH_TIMEOUT_SECS")
                .and_then(|value| value.trim().parse::<u64>().ok())
                .filter(|value| *value > 0)
                .unwrap_or(DEFAULT_OAUTH_TIMEOUT_SECS),
        );

        Self {
            source_file: cli.source_file.clone(),
            destination_path: cli.destination_path.clone(),
            drive_name,
            token_file,
            credentials_file,
            unattended,
            dry_run: cli.dry_run,
            api_base: non_empty(env("GDRIVE_API_BASE")),
            oauth_base: non_empty(env("GDRIVE_OAUTH_BASE")),
            oauth_timeout,
        }
    }

    pub fn credential_settings(&self) -> CredentialSettings {
        CredentialSettings {
            token_file: self.token_file.clone(),
            credentials_file: self.credentials_file.clone(),
            unattended: self.unattended,
            oauth_timeout: self.oauth_timeout,
            oauth_base_url: self.oauth_base.clone(),
        }
    }
}

fn default_token_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
        .join(TOKEN_FILE_NAME)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn parse_flag(value: Option<String>) -> bool {
    value
        .map(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}

/// Replaces a leading `~` or `~/` with `home`. Other paths, and every path
/// when `home` is unknown, are returned unchanged.
pub(crate) fn expand_path(path: &Path, home: Option<&Path>) -> PathBuf {
    match path.to_str() {
        Some(value) => expand_with_home(value, home),
        None => path.to_path_buf(),
    }
}

fn expand_with_home(value: &str, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return PathBuf::from(value);
    };
    if value == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(cli: &CliArgs, vars: &[(&str, &str)]) -> UploadConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        UploadConfig::resolve_with(cli, |name| vars.get(name).cloned())
    }

    fn cli() -> CliArgs {
        CliArgs {
            source_file: Some(PathBuf::from("a.txt")),
            destination_path: "/".into(),
            ..CliArgs::default()
        }
    }

    #[test]
    fn defaults_apply_without_flags_or_env() {
        let config = resolve(&cli(), &[]);

        assert_eq!(config.drive_name, PERSONAL_DRIVE_NAME);
        assert_eq!(config.credentials_file, PathBuf::from("credentials.json"));
        assert!(config.token_file.ends_with("gdrive-upload/token.json"));
        assert_eq!(config.oauth_timeout, Duration::from_secs(180));
        assert!(!config.unattended);
        assert_eq!(config.api_base, None);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = resolve(
            &cli(),
            &[
                ("GDRIVE_TOKEN_FILE", "/var/lib/uploader/token.json"),
                ("GDRIVE_DRIVE_NAME", "Team"),
                ("GDRIVE_UNATTENDED", "yes"),
                ("GDRIVE_API_BASE", "http://127.0.0.1:8080"),
                ("GDRIVE_OAUTH_TIMEOUT_SECS", "30"),
            ],
        );

        assert_eq!(config.token_file, PathBuf::from("/var/lib/uploader/token.json"));
        assert_eq!(config.drive_name, "Team");
        assert!(config.unattended);
        assert_eq!(config.api_base.as_deref(), Some("http://127.0.0.1:8080"));
        assert_eq!(config.oauth_timeout, Duration::from_secs(30));
    }

    #[test]
    fn flags_override_environment() {
        let cli = CliArgs {
            token_file: Some(PathBuf::from("/tmp/flag-token.json")),
            drive_name: Some("Finance".into()),
            ..cli()
        };
        let config = resolve(
            &cli,
            &[
                ("GDRIVE_TOKEN_FILE", "/tmp/env-token.json"),
                ("GDRIVE_DRIVE_NAME", "Team"),
            ],
        );

        assert_eq!(config.token_file, PathBuf::from("/tmp/flag-token.json"));
        assert_eq!(config.drive_name, "Finance");
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = resolve(
            &cli(),
            &[
                ("GDRIVE_OAUTH_TIMEOUT_SECS", "0"),
                ("GDRIVE_UNATTENDED", "maybe"),
                ("GDRIVE_DRIVE_NAME", "  "),
            ],
        );

        assert_eq!(config.oauth_timeout, Duration::from_secs(180));
        assert!(!config.unattended);
        assert_eq!(config.drive_name, PERSONAL_DRIVE_NAME);
    }

    #[test]
    fn expands_home_prefix() {
        let home = Path::new("/home/user");
        assert_eq!(expand_with_home("~", Some(home)), PathBuf::from("/home/user"));
        assert_eq!(
            expand_with_home("~/.config/t.json", Some(home)),
            PathBuf::from("/home/user/.config/t.json")
        );
        assert_eq!(expand_with_home("~other/x", Some(home)), PathBuf::from("~other/x"));
        assert_eq!(expand_with_home("~/x", None), PathBuf::from("~/x"));
        assert_eq!(
            expand_path(Path::new("~/docs/a.txt"), Some(home)),
            PathBuf::from("/home/user/docs/a.txt")
        );
        assert_eq!(
            expand_path(Path::new("/tmp/a.txt"), Some(home)),
            PathBuf::from("/tmp/a.txt")
        );
    }
}
