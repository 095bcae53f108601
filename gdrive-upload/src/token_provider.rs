use gdrive_core::{OAuthClient, OAuthError};
use thiserror::Error;
use tracing::debug;

use crate::storage::{OAuthState, now_unix};

#[derive(Debug, Error)]
pub enum TokenProviderError {
    #[error("oauth client is required to refresh expired token")]
    MissingOAuthClient,
    #[error("stored token has expired and carries no refresh token")]
    MissingRefreshToken,
    #[error("oauth refresh failed: {0}")]
    OAuth(#[from] OAuthError),
}

/// Hands out access tokens, refreshing shortly before expiry.
pub struct TokenProvider {
    state: OAuthState,
    oauth_client: Option<OAuthClient>,
    refresh_skew_secs: i64,
    refreshed: bool,
}

impl TokenProvider {
    pub fn new(state: OAuthState, oauth_client: Option<OAuthClient>) -> Self {
        Self {
            state,
            oauth_client,
            refresh_skew_secs: 60,
            refreshed: false,
        }
    }

    pub async fn valid_access_token(&mut self) -> Result<String, TokenProviderError> {
        if self.should_refresh() {
            self.refresh().await?;
        }
        Ok(self.state.access_token.clone())
    }

    pub fn state(&self) -> &OAuthState {
        &self.state
    }

    /// Whether the state changed since construction and should be persisted.
    pub fn was_refreshed(&self) -> bool {
        self.refreshed
    }

    pub fn should_refresh(&self) -> bool {
        let Some(expires_at) = self.state.expires_at else {
            return false;
        };
        expires_at <= now_unix().saturating_add(self.refresh_skew_secs)
    }

    async fn refresh(&mut self) -> Result<(), TokenProviderError> {
        let refresh_token = self
            .state
            .refresh_token
            .clone()
            .ok_or(TokenProviderError::MissingRefreshToken)?;
        let client = self
            .oauth_client
            .as_ref()
            .ok_or(TokenProviderError::MissingOAuthClient)?;
        debug!("access token expired, refreshing");
        let token = client.refresh_token(&refresh_token, None).await?;
        let mut refreshed = OAuthState::from_oauth_token(&token);
        // Google omits the refresh token on refresh responses.
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = Some(refresh_token);
        }
        if refreshed.scope.is_none() {
            refreshed.scope = self.state.scope.clone();
        }
        self.state = refreshed;
        self.refreshed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

    fn expired_state(refresh_token: Option<&str>) -> OAuthState {
        OAuthState {
            access_token: "old-token".into(),
            refresh_token: refresh_token.map(str::to_string),
            expires_at: Some(0),
            scope: Some(DRIVE_FILE_SCOPE.into()),
            token_type: Some("Bearer".into()),
        }
    }

    #[tokio::test]
    async fn returns_current_token_when_not_expired() {
        let mut provider = TokenProvider::new(
            OAuthState {
                access_token: "token-1".into(),
                refresh_token: Some("refresh-1".into()),
                expires_at: Some(i64::MAX),
                scope: Some(DRIVE_FILE_SCOPE.into()),
                token_type: Some("Bearer".into()),
            },
            None,
        );

        let token = provider
            .valid_access_token()
            .await
            .expect("token should be valid");
        assert_eq!(token, "token-1");
        assert!(!provider.was_refreshed());
    }

    #[tokio::test]
    async fn token_without_expiry_is_used_as_is() {
        let mut state = expired_state(None);
        state.expires_at = None;
        let mut provider = TokenProvider::new(state, None);

        assert_eq!(provider.valid_access_token().await.unwrap(), "old-token");
    }

    #[tokio::test]
    async fn refreshes_token_when_expired_and_keeps_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "new-token",
                "token_type": "Bearer",
                "expires_in": 3599,
                "scope": DRIVE_FILE_SCOPE
            })))
            .expect(1)
            .mount(&server)
            .await;
        let oauth_client = OAuthClient::with_endpoints(
            &format!("{}/auth", server.uri()),
            &format!("{}/token", server.uri()),
            "client-id",
            "secret",
        )
        .expect("oauth client should be built");
        let mut provider = TokenProvider::new(expired_state(Some("refresh-1")), Some(oauth_client));

        let token = provider
            .valid_access_token()
            .await
            .expect("token should refresh");
        assert_eq!(token, "new-token");
        assert_eq!(provider.state().refresh_token.as_deref(), Some("refresh-1"));
        assert!(provider.was_refreshed());
        assert!(!provider.should_refresh());
    }

    #[tokio::test]
    async fn refresh_rejection_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
            .mount(&server)
            .await;
        let oauth_client = OAuthClient::with_endpoints(
            &format!("{}/auth", server.uri()),
            &format!("{}/token", server.uri()),
            "client-id",
            "secret",
        )
        .unwrap();
        let mut provider = TokenProvider::new(expired_state(Some("revoked")), Some(oauth_client));

        let err = provider.valid_access_token().await.unwrap_err();
        assert!(matches!(err, TokenProviderError::OAuth(OAuthError::Api { .. })));
        assert!(!provider.was_refreshed());
    }

    #[tokio::test]
    async fn returns_error_when_expired_and_no_refresh_token() {
        let mut provider = TokenProvider::new(expired_state(None), None);

        let err = provider
            .valid_access_token()
            .await
            .expect_err("expected missing refresh token error");
        assert!(matches!(err, TokenProviderError::MissingRefreshToken));
    }

    #[tokio::test]
    async fn returns_error_when_expired_without_oauth_client() {
        let mut provider = TokenProvider::new(expired_state(Some("refresh-1")), None);

        let err = provider
            .valid_access_token()
            .await
            .expect_err("expected missing client error");
        assert!(matches!(err, TokenProviderError::MissingOAuthClient));
    }
}
