use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::oauth_flow::{OAuthFlow, OAuthFlowError};
use crate::storage::{ClientSecrets, ClientSecretsError, OAuthState, StorageError, TokenFile};
use crate::token_provider::{TokenProvider, TokenProviderError};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error(
        "sign-in required but running unattended ({0}); run once without --unattended to authorize"
    )]
    NeedsInteraction(&'static str),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Secrets(#[from] ClientSecretsError),
    #[error("token refresh failed: {0}")]
    Refresh(#[from] TokenProviderError),
    #[error("sign-in failed: {0}")]
    Flow(#[from] OAuthFlowError),
}

#[derive(Debug, Clone)]
pub struct CredentialSettings {
    pub token_file: PathBuf,
    pub credentials_file: PathBuf,
    pub unattended: bool,
    pub oauth_timeout: Duration,
    /// Replaces the Google OAuth endpoints; used against local test servers.
    pub oauth_base_url: Option<String>,
}

/// Produces a usable access token: the cached one, a refreshed one, or one
/// from a new browser sign-in. Refreshed and new tokens are written back.
/// A sign-in is never started when `unattended` is set.
pub async fn resolve_access_token(settings: &CredentialSettings) -> Result<String, CredentialError> {
    let token_file = TokenFile::new(&settings.token_file);

    if let Some(state) = token_file.load()? {
        let mut provider = TokenProvider::new(state, None);
        if !provider.should_refresh() {
            return Ok(provider.state().access_token.clone());
        }
        let client = ClientSecrets::load(&settings.credentials_file)?
            .oauth_client(settings.oauth_base_url.as_deref())?;
        provider = TokenProvider::new(provider.state().clone(), Some(client));
        match provider.valid_access_token().await {
            Ok(token) => {
                if provider.was_refreshed() {
                    token_file.save(provider.state())?;
                }
                return Ok(token);
            }
            Err(err @ (TokenProviderError::MissingRefreshToken | TokenProviderError::OAuth(_))) => {
                if settings.unattended {
                    warn!(error = %err, "stored token cannot be refreshed");
                    return Err(CredentialError::NeedsInteraction(
                        "stored token cannot be refreshed",
                    ));
                }
                warn!(error = %err, "stored token cannot be refreshed, signing in again");
            }
            Err(err) => return Err(err.into()),
        }
    } else if settings.unattended {
        return Err(CredentialError::NeedsInteraction("no stored token"));
    }

    let client = ClientSecrets::load(&settings.credentials_file)?
        .oauth_client(settings.oauth_base_url.as_deref())?;
    let token = OAuthFlow::new(client, settings.oauth_timeout)
        .authenticate()
        .await?;
    let state = OAuthState::from_oauth_token(&token);
    token_file.save(&state)?;
    info!(path = %token_file.path().display(), "signed in and saved token");
    Ok(state.access_token)
}

/// Deletes the cached token. Returns whether one existed.
pub fn logout(settings: &CredentialSettings) -> Result<bool, CredentialError> {
    Ok(TokenFile::new(&settings.token_file).delete()?)
}
