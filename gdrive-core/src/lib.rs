mod client;
mod oauth;
mod query;

pub use client::{
    ApiErrorClass, DriveClient, DriveError, DriveFile, FOLDER_MIME_TYPE, FileList, ListScope,
    ROOT_FOLDER_ID, SharedDrive,
};
pub use oauth::{GOOGLE_AUTHORIZE_URL, GOOGLE_TOKEN_URL, OAuthClient, OAuthError, OAuthToken};
pub use query::{FileQuery, escape_query_literal};
