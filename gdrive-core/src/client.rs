use std::io;

use bytes::Bytes;
use futures_util::future;
use futures_util::stream::{self, StreamExt};
use rand::{Rng, distributions::Alphanumeric};
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Body, Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::debug;
use url::Url;

use crate::query::{FileQuery, escape_query_literal};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";
const FILE_FIELDS: &str = "id,name,mimeType,parents";
const PAGE_SIZE: u32 = 1000;
const BOUNDARY_PREFIX: &str = "gdrive-upload-";
const BOUNDARY_RANDOM_LEN: usize = 32;

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
/// Alias the API accepts in place of the personal drive's root folder id.
pub const ROOT_FOLDER_ID: &str = "root";

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to encode request metadata: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorClass {
    Auth,
    RateLimit,
    Transient,
    Permanent,
}

/// Which corpus a request targets: the user's own drive or one shared drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    MyDrive,
    SharedDrive(String),
}

impl ListScope {
    pub fn shared_drive_id(&self) -> Option<&str> {
        match self {
            ListScope::MyDrive => None,
            ListScope::SharedDrive(id) => Some(id),
        }
    }

    /// Id of the folder at the top of this scope.
    pub fn root_folder_id(&self) -> &str {
        match self {
            ListScope::MyDrive => ROOT_FOLDER_ID,
            ListScope::SharedDrive(id) => id,
        }
    }
}

#[derive(Clone)]
pub struct DriveClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl DriveClient {
    pub fn new(token: impl Into<String>) -> Result<Self, DriveError> {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    pub fn with_base_url(base_url: &str, token: impl Into<String>) -> Result<Self, DriveError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
            token: token.into(),
        })
    }

    /// Runs a `files.list` query and follows `nextPageToken` until the listing is exhausted.
    pub async fn list_files(
        &self,
        query: &FileQuery,
        scope: &ListScope,
    ) -> Result<Vec<DriveFile>, DriveError> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self
                .list_files_page(query, scope, page_token.as_deref())
                .await?;
            files.extend(page.files);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(files)
    }

    pub async fn list_files_page(
        &self,
        query: &FileQuery,
        scope: &ListScope,
        page_token: Option<&str>,
    ) -> Result<FileList, DriveError> {
        let mut url = self.endpoint("/drive/v3/files")?;
        {
            let mut pairs = url.query_pairs_mut();
            if !query.is_empty() {
                pairs.append_pair("q", &query.build());
            }
            pairs
                .append_pair("fields", &format!("nextPageToken,files({FILE_FIELDS})"))
                .append_pair("pageSize", &PAGE_SIZE.to_string())
                .append_pair("spaces", "drive");
            if let Some(drive_id) = scope.shared_drive_id() {
                pairs
                    .append_pair("corpora", "drive")
                    .append_pair("driveId", drive_id)
                    .append_pair("includeItemsFromAllDrives", "true")
                    .append_pair("supportsAllDrives", "true");
            }
            if let Some(page_token) = page_token {
                pairs.append_pair("pageToken", page_token);
            }
        }
        debug!(query = %query, ?scope, page_token, "listing drive files");
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Creates a folder. Single quotes in `name` are backslash-escaped before
    /// the name is placed in the request body.
    pub async fn create_folder(
        &self,
        parent_id: &str,
        name: &str,
        scope: &ListScope,
    ) -> Result<DriveFile, DriveError> {
        let mut url = self.endpoint("/drive/v3/files")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("fields", FILE_FIELDS);
            if scope.shared_drive_id().is_some() {
                pairs.append_pair("supportsAllDrives", "true");
            }
        }
        let metadata = FileMetadata {
            name: name.replace('\'', "\\'"),
            mime_type: FOLDER_MIME_TYPE.to_string(),
            parents: vec![parent_id.to_string()],
        };
        debug!(parent_id, name = %metadata.name, "creating drive folder");
        let response = self
            .http
            .post(url)
            .header("Authorization", self.auth_header_value())
            .json(&metadata)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Uploads `file` as a new file using a single `multipart/related` request.
    ///
    /// The media part is streamed from `file`; `size` must be its length in
    /// bytes so the request can carry an exact `Content-Length`.
    pub async fn upload_file(
        &self,
        parent_id: &str,
        name: &str,
        mime_type: &str,
        file: File,
        size: u64,
        scope: &ListScope,
    ) -> Result<DriveFile, DriveError> {
        let mut url = self.endpoint("/upload/drive/v3/files")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("uploadType", "multipart")
                .append_pair("fields", FILE_FIELDS);
            if scope.shared_drive_id().is_some() {
                pairs.append_pair("supportsAllDrives", "true");
            }
        }
        let metadata = FileMetadata {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            parents: vec![parent_id.to_string()],
        };
        let boundary = multipart_boundary();
        let frame = MultipartFrame::new(&metadata, &boundary)?;
        let content_length = frame.len() + size;
        debug!(parent_id, name, mime_type, size, "uploading drive file");
        let response = self
            .http
            .post(url)
            .header("Authorization", self.auth_header_value())
            .header(
                "Content-Type",
                format!("multipart/related; boundary={boundary}"),
            )
            .header(CONTENT_LENGTH, content_length)
            .body(frame.into_body(file))
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Lists shared drives visible to the user, optionally filtered by exact name.
    pub async fn list_drives(&self, name: Option<&str>) -> Result<Vec<SharedDrive>, DriveError> {
        let mut drives = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = self.endpoint("/drive/v3/drives")?;
            {
                let mut pairs = url.query_pairs_mut();
                if let Some(name) = name {
                    pairs.append_pair("q", &format!("name = '{}'", escape_query_literal(name)));
                }
                pairs
                    .append_pair("fields", "nextPageToken,drives(id,name)")
                    .append_pair("pageSize", "100");
                if let Some(token) = page_token.as_deref() {
                    pairs.append_pair("pageToken", token);
                }
            }
            debug!(name, "listing shared drives");
            let response = self
                .http
                .get(url)
                .header("Authorization", self.auth_header_value())
                .send()
                .await?;
            let page: DriveList = Self::handle_response(response).await?;
            drives.extend(page.drives);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(drives)
    }

    fn auth_header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn endpoint(&self, path: &str) -> Result<Url, DriveError> {
        Ok(self.base_url.join(path)?)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, DriveError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(DriveError::Api { status, body })
        }
    }
}

/// A fresh delimiter per request, so file content cannot end the media part early.
fn multipart_boundary() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BOUNDARY_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{BOUNDARY_PREFIX}{suffix}")
}

/// The fixed parts of a `multipart/related` body around the streamed media.
struct MultipartFrame {
    head: Vec<u8>,
    tail: Vec<u8>,
}

impl MultipartFrame {
    fn new(metadata: &FileMetadata, boundary: &str) -> Result<Self, DriveError> {
        let metadata_json = serde_json::to_vec(metadata)?;
        let mut head = Vec::with_capacity(metadata_json.len() + 256);
        head.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        head.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
        head.extend_from_slice(&metadata_json);
        head.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
        head.extend_from_slice(
            format!("Content-Type: {}\r\n\r\n", metadata.mime_type).as_bytes(),
        );
        let tail = format!("\r\n--{boundary}--").into_bytes();
        Ok(Self { head, tail })
    }

    fn len(&self) -> u64 {
        (self.head.len() + self.tail.len()) as u64
    }

    fn into_body(self, file: File) -> Body {
        let head = stream::once(future::ready(Ok::<_, io::Error>(Bytes::from(self.head))));
        let tail = stream::once(future::ready(Ok::<_, io::Error>(Bytes::from(self.tail))));
        Body::wrap_stream(head.chain(ReaderStream::new(file)).chain(tail))
    }
}

impl DriveError {
    pub fn classification(&self) -> Option<ApiErrorClass> {
        match self {
            DriveError::Api { status, .. } => Some(classify_api_status(*status)),
            _ => None,
        }
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self.classification(), Some(ApiErrorClass::Auth))
    }
}

fn classify_api_status(status: StatusCode) -> ApiErrorClass {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        ApiErrorClass::Auth
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        ApiErrorClass::RateLimit
    } else if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        ApiErrorClass::Transient
    } else {
        ApiErrorClass::Permanent
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub parents: Vec<String>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SharedDrive {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveList {
    #[serde(default)]
    drives: Vec<SharedDrive>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileMetadata {
    name: String,
    mime_type: String,
    parents: Vec<String>,
}
