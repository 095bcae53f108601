use std::io::{BufRead, Write};
use std::net::SocketAddr;
use std::time::Duration;

use gdrive_core::{OAuthClient, OAuthError, OAuthToken};
use rand::{Rng, distributions::Alphanumeric};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

/// Read-only metadata access for walking folders plus per-file access for
/// the folders and files this tool creates.
pub const DRIVE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive.metadata.readonly",
    "https://www.googleapis.com/auth/drive.file",
];

const CALLBACK_PATH: &str = "/callback";
const MANUAL_REDIRECT_URI: &str = "http://localhost";
const STATE_LEN: usize = 32;
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum OAuthFlowError {
    #[error("oauth error: {0}")]
    OAuth(#[from] OAuthError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("authorization code missing in redirect")]
    MissingCode,
    #[error("authorization was denied: {0}")]
    Denied(String),
    #[error("authorization response carried an unexpected state value")]
    StateMismatch,
    #[error("authorization timed out")]
    Timeout,
}

pub fn scope_string() -> String {
    DRIVE_SCOPES.join(" ")
}

/// Interactive consent flow. The browser is sent to Google and the code is
/// caught on a loopback listener; if that fails the user pastes the
/// redirected URL instead.
pub struct OAuthFlow {
    client: OAuthClient,
    timeout: Duration,
}

impl OAuthFlow {
    pub fn new(client: OAuthClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub async fn authenticate(&self) -> Result<OAuthToken, OAuthFlowError> {
        let state = random_state();
        let (code, redirect_uri) = match self.authorize_via_loopback(&state).await {
            Ok(result) => result,
            Err(err @ (OAuthFlowError::Io(_) | OAuthFlowError::Timeout)) => {
                warn!(error = %err, "browser sign-in unavailable, falling back to manual code entry");
                let stdin = std::io::stdin();
                let mut input = stdin.lock();
                let mut output = std::io::stderr();
                let code = self.authorize_manually(&state, &mut input, &mut output)?;
                (code, MANUAL_REDIRECT_URI.to_string())
            }
            Err(err) => return Err(err),
        };
        debug!("exchanging authorization code");
        Ok(self.client.exchange_code(&code, &redirect_uri).await?)
    }

    async fn authorize_via_loopback(
        &self,
        state: &str,
    ) -> Result<(String, String), OAuthFlowError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let redirect_uri = format!("http://127.0.0.1:{}{CALLBACK_PATH}", addr.port());
        let url = self
            .client
            .authorize_url(&redirect_uri, &scope_string(), Some(state));

        eprintln!("Sign in to Google Drive in your browser. If it does not open, visit:\n{url}");
        if let Err(err) = open::that(url.as_str()) {
            debug!(error = %err, "could not launch a browser");
        }

        let code = wait_for_callback(&listener, state, self.timeout).await?;
        Ok((code, redirect_uri))
    }

    fn authorize_manually(
        &self,
        state: &str,
        input: &mut dyn BufRead,
        output: &mut dyn Write,
    ) -> Result<String, OAuthFlowError> {
        let url = self
            .client
            .authorize_url(MANUAL_REDIRECT_URI, &scope_string(), Some(state));
        writeln!(output, "Open this URL in your browser:\n{url}")?;
        writeln!(
            output,
            "After approving, the browser is sent to a localhost page that may fail to load."
        )?;
        write!(output, "Paste that page's full URL (or just the code): ")?;
        output.flush()?;

        let mut line = String::new();
        input.read_line(&mut line)?;
        code_from_pasted_input(&line, state)
    }
}

fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}

async fn wait_for_callback(
    listener: &TcpListener,
    expected_state: &str,
    timeout: Duration,
) -> Result<String, OAuthFlowError> {
    tokio::time::timeout(timeout, accept_callback(listener, expected_state))
        .await
        .map_err(|_| OAuthFlowError::Timeout)?
}

/// Accepts connections until one hits the callback path. Each connection is
/// served on its own task; other paths get a 404.
async fn accept_callback(
    listener: &TcpListener,
    expected_state: &str,
) -> Result<String, OAuthFlowError> {
    let (results_tx, mut results_rx) = mpsc::channel(1);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                debug!(%peer, "oauth callback connection");
                tokio::spawn(serve_connection(
                    stream,
                    peer,
                    expected_state.to_string(),
                    results_tx.clone(),
                ));
            }
            Some(result) = results_rx.recv() => return result,
        }
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    expected_state: String,
    results: mpsc::Sender<Result<String, OAuthFlowError>>,
) {
    let request = match read_request(&mut stream).await {
        Ok(request) => request,
        Err(err) => {
            debug!(%peer, error = %err, "dropping unreadable connection");
            return;
        }
    };
    let Some(callback) = parse_callback_request(&request) else {
        respond(&mut stream, "404 Not Found", "Not found").await;
        return;
    };
    let result = callback.into_code(&expected_state);
    let page = match &result {
        Ok(_) => {
            "<h2>Google Drive connected</h2><p>You can close this tab and return to the terminal.</p>"
        }
        Err(_) => "<h2>Authorization failed</h2><p>Return to the terminal for details.</p>",
    };
    respond(&mut stream, "200 OK", page).await;
    let _ = results.send(result).await;
}

async fn read_request(stream: &mut TcpStream) -> Result<String, OAuthFlowError> {
    let mut request = vec![0u8; 8192];
    let read = tokio::time::timeout(REQUEST_READ_TIMEOUT, stream.read(&mut request))
        .await
        .map_err(|_| OAuthFlowError::Timeout)??;
    Ok(String::from_utf8_lossy(&request[..read]).into_owned())
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nConnection: close\r\n\r\n<html><body>{body}</body></html>"
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Callback {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

impl Callback {
    fn from_url(url: &Url) -> Self {
        let mut callback = Self::default();
        for (key, value) in url.query_pairs() {
            let value = Some(value.into_owned()).filter(|v| !v.is_empty());
            match key.as_ref() {
                "code" => callback.code = value,
                "state" => callback.state = value,
                "error" => callback.error = value,
                _ => {}
            }
        }
        callback
    }

    fn into_code(self, expected_state: &str) -> Result<String, OAuthFlowError> {
        if let Some(error) = self.error {
            return Err(OAuthFlowError::Denied(error));
        }
        if self.state.as_deref() != Some(expected_state) {
            return Err(OAuthFlowError::StateMismatch);
        }
        self.code.ok_or(OAuthFlowError::MissingCode)
    }
}

fn parse_callback_request(request: &str) -> Option<Callback> {
    let request_line = request.lines().next()?;
    let target = request_line.split_whitespace().nth(1)?;
    let request_url = if target.starts_with("http://") || target.starts_with("https://") {
        Url::parse(target).ok()?
    } else {
        Url::parse(&format!("http://127.0.0.1{target}")).ok()?
    };
    (request_url.path() == CALLBACK_PATH).then(|| Callback::from_url(&request_url))
}

/// Accepts either the full redirected URL or a bare authorization code.
fn code_from_pasted_input(input: &str, expected_state: &str) -> Result<String, OAuthFlowError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(OAuthFlowError::MissingCode);
    }
    match Url::parse(trimmed) {
        Ok(url) if url.has_host() => Callback::from_url(&url).into_code(expected_state),
        _ => Ok(trimmed.to_string()),
    }
}
