//! put.io API client.
//!
//! Every call goes through [`Client`], which owns the HTTP connection pool and
//! the OAuth token. Resource operations take the client explicitly instead of
//! being bound to it.

use crate::error::SyncError;
use crate::types::RemoteNode;
use regex::Regex;
use reqwest::header::{ACCEPT, CONTENT_DISPOSITION, RANGE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

/// Default base URL for the put.io v2 API.
pub const DEFAULT_API_URL: &str = "https://api.put.io/v2";

static ATTACHMENT_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^attachment; filename=(.*)$").expect("attachment regex is valid") // Static pattern, safe to panic
});

/// Authenticated handle on the put.io API.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl Client {
    /// Creates a client against the public put.io API.
    pub fn new(token: impl Into<String>) -> Result<Self, SyncError> {
        Self::with_base_url(DEFAULT_API_URL, token)
    }

    /// Creates a client against an arbitrary base URL (used by tests and proxies).
    pub fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        self.http
            .request(method, url)
            .query(&[("oauth_token", self.token.as_str())])
            .header(ACCEPT, "application/json")
    }

    /// Sends a request and unwraps the JSON status envelope.
    async fn send_json(&self, builder: RequestBuilder) -> Result<Value, SyncError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let envelope: Value = serde_json::from_slice(&body).map_err(|_| {
            SyncError::InvalidResponse {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }
        })?;

        if envelope.get("status").and_then(Value::as_str) == Some("ERROR") {
            let error_type = envelope
                .get("error_type")
                .and_then(Value::as_str)
                .unwrap_or("UNKNOWN_ERROR")
                .to_string();
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                return Err(SyncError::Unauthorized(error_type));
            }
            return Err(SyncError::Api(error_type));
        }
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(SyncError::Unauthorized(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(SyncError::Api(format!("HTTP {}", status)));
        }

        Ok(envelope)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        field: &str,
    ) -> Result<T, SyncError> {
        let mut envelope = self.send_json(builder).await?;
        let value = envelope
            .get_mut(field)
            .map(Value::take)
            .ok_or_else(|| SyncError::Api(format!("response is missing '{}'", field)))?;
        Ok(serde_json::from_value(value)?)
    }

    /// Lists the children of a folder in the order the API returns them.
    pub async fn list(&self, parent_id: u64) -> Result<Vec<RemoteNode>, SyncError> {
        let builder = self
            .request(Method::GET, "/files/list")
            .query(&[("parent_id", parent_id)]);
        let files: Vec<RemoteNode> = self.fetch(builder, "files").await?;
        debug!("Listed {} children of {}", files.len(), parent_id);
        Ok(files)
    }

    /// Fetches a single node.
    pub async fn get(&self, id: u64) -> Result<RemoteNode, SyncError> {
        let builder = self.request(Method::GET, &format!("/files/{}", id));
        self.fetch(builder, "file").await
    }

    /// Deletes a file or folder (folders are deleted with their contents).
    pub async fn delete(&self, id: u64) -> Result<(), SyncError> {
        let builder = self
            .request(Method::POST, "/files/delete")
            .form(&[("file_ids", id.to_string())]);
        self.send_json(builder).await.map(|_| ())
    }

    /// Moves a node under another folder.
    pub async fn move_to(&self, id: u64, parent_id: u64) -> Result<(), SyncError> {
        let builder = self.request(Method::POST, "/files/move").form(&[
            ("file_ids", id.to_string()),
            ("parent_id", parent_id.to_string()),
        ]);
        self.send_json(builder).await.map(|_| ())
    }

    /// Renames a node.
    pub async fn rename(&self, id: u64, name: &str) -> Result<(), SyncError> {
        let builder = self
            .request(Method::POST, "/files/rename")
            .form(&[("file_id", id.to_string()), ("name", name.to_string())]);
        self.send_json(builder).await.map(|_| ())
    }

    /// Asks the download endpoint for the real filename.
    ///
    /// The listing name is not guaranteed to match the attachment name, so
    /// the local file is always named after the `content-disposition` header.
    pub async fn attachment_filename(&self, id: u64) -> Result<String, SyncError> {
        let response = self
            .request(Method::HEAD, &format!("/files/{}/download", id))
            .send()
            .await?
            .error_for_status()?;

        let header = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .ok_or_else(|| SyncError::AttachmentHeader {
                id,
                reason: "no content-disposition header".to_string(),
            })?
            .to_str()
            .map_err(|e| SyncError::AttachmentHeader {
                id,
                reason: e.to_string(),
            })?;

        parse_attachment_filename(header).ok_or_else(|| SyncError::AttachmentHeader {
            id,
            reason: format!("unexpected content-disposition '{}'", header),
        })
    }

    /// Starts streaming a file's content, from `offset` onwards when non-zero.
    pub async fn open_download(&self, id: u64, offset: u64) -> Result<Response, SyncError> {
        let mut builder = self.request(Method::GET, &format!("/files/{}/download", id));
        if offset > 0 {
            builder = builder.header(RANGE, format!("bytes={}-", offset));
        }
        Ok(builder.send().await?.error_for_status()?)
    }
}

/// Extracts the filename from `attachment; filename=...`.
///
/// Names containing spaces come quoted; the quotes are stripped.
pub(crate) fn parse_attachment_filename(header: &str) -> Option<String> {
    let raw = ATTACHMENT_FILENAME.captures(header)?.get(1)?.as_str();
    let name = raw.trim_matches('"');
    // A name that would escape the destination directory is as bad as none.
    if name.is_empty() || name.contains('/') || name == ".." || name == "." {
        return None;
    }
    Some(name.to_string())
}
