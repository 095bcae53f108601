use gdrive_core::OAuthClient;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn authorize_url_requests_offline_access() {
    let client = OAuthClient::with_endpoints(
        "https://accounts.example/o/oauth2/auth",
        "https://oauth.example/token",
        "client-id",
        "secret",
    )
    .expect("client should build");
    let url = client.authorize_url(
        "http://127.0.0.1:8080/callback",
        "https://www.googleapis.com/auth/drive.file",
        Some("state-1"),
    );

    assert_eq!(url.path(), "/o/oauth2/auth");
    let query = url.query().unwrap_or_default();
    assert!(query.contains("response_type=code"));
    assert!(query.contains("client_id=client-id"));
    assert!(query.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2Fcallback"));
    assert!(query.contains("scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fdrive.file"));
    assert!(query.contains("access_type=offline"));
    assert!(query.contains("prompt=consent"));
    assert!(query.contains("state=state-1"));
}

#[tokio::test]
async fn exchange_code_posts_form_data() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code"))
        .and(body_string_contains("client_id=client-id"))
        .and(body_string_contains("client_secret=secret"))
        .and(body_string_contains(
            "redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2Fcallback",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "token",
            "token_type": "Bearer",
            "expires_in": 3599,
            "refresh_token": "refresh",
            "scope": "https://www.googleapis.com/auth/drive.file"
        })))
        .mount(&server)
        .await;

    let client = OAuthClient::with_endpoints(
        &format!("{}/auth", server.uri()),
        &format!("{}/token", server.uri()),
        "client-id",
        "secret",
    )
    .unwrap();
    let token = client
        .exchange_code("auth-code", "http://127.0.0.1:8080/callback")
        .await
        .unwrap();

    assert_eq!(token.access_token, "token");
    assert_eq!(token.token_type, "Bearer");
    assert_eq!(token.expires_in, Some(3599));
    assert_eq!(token.refresh_token.as_deref(), Some("refresh"));
}

#[tokio::test]
async fn refresh_token_reports_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .mount(&server)
        .await;

    let client = OAuthClient::with_endpoints(
        &format!("{}/auth", server.uri()),
        &format!("{}/token", server.uri()),
        "client-id",
        "secret",
    )
    .unwrap();
    let err = client
        .refresh_token("stale", None)
        .await
        .expect_err("expected refresh failure");

    assert!(err.to_string().contains("invalid_grant"));
}
