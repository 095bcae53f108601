use std::{
    fs, io,
    path::{Path, PathBuf},
};

use gdrive_core::{GOOGLE_AUTHORIZE_URL, GOOGLE_TOKEN_URL, OAuthClient, OAuthError};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientSecretsError {
    #[error(
        "client credentials file '{}' not found; download an OAuth client (desktop app) JSON from the Google Cloud console",
        .0.display()
    )]
    Missing(PathBuf),
    #[error("failed to read client credentials '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("client credentials '{}' are malformed: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("client credentials '{}' contain neither an \"installed\" nor a \"web\" client", .0.display())]
    NoClient(PathBuf),
    #[error(transparent)]
    OAuth(#[from] OAuthError),
}

/// OAuth client registration as downloaded from the Google Cloud console.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTHORIZE_URL.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

impl ClientSecrets {
    pub fn load(path: &Path) -> Result<Self, ClientSecretsError> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ClientSecretsError::Missing(path.to_path_buf()));
            }
            Err(source) => {
                return Err(ClientSecretsError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::from_json(&data, path)
    }

    fn from_json(data: &[u8], path: &Path) -> Result<Self, ClientSecretsError> {
        let file: SecretsFile =
            serde_json::from_slice(data).map_err(|source| ClientSecretsError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        file.installed
            .or(file.web)
            .ok_or_else(|| ClientSecretsError::NoClient(path.to_path_buf()))
    }

    /// Token endpoint client for these credentials. A base url override
    /// replaces both Google endpoints so tests can point at a local server.
    pub fn oauth_client(&self, base_override: Option<&str>) -> Result<OAuthClient, ClientSecretsError> {
        let client = match base_override {
            Some(base) => {
                let base = base.trim_end_matches('/');
                OAuthClient::with_endpoints(
                    &format!("{base}/o/oauth2/auth"),
                    &format!("{base}/token"),
                    &self.client_id,
                    &self.client_secret,
                )?
            }
            None => OAuthClient::with_endpoints(
                &self.auth_uri,
                &self.token_uri,
                &self.client_id,
                &self.client_secret,
            )?,
        };
        Ok(client)
    }
}
