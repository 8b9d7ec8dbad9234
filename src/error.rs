//! Error types for sync operations.

use reqwest::StatusCode;
use std::io;
use thiserror::Error;

/// Errors that can occur while walking, matching or downloading.
#[derive(Error, Debug)]
pub enum SyncError {
    /// I/O error during file operations.
    #[error(transparent)]
    IoError(#[from] io::Error),

    /// HTTP request error (connection, status, or mid-stream failure).
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    /// The API answered with an `"ERROR"` status envelope.
    #[error("put.io API error: {0}")]
    Api(String),

    /// The API rejected the token.
    #[error("put.io rejected the token: {0}")]
    Unauthorized(String),

    /// The API answered with something that is not a JSON envelope.
    #[error("Server didn't send valid JSON (HTTP {status}): {body}")]
    InvalidResponse { status: u16, body: String },

    /// The download probe lacked a usable `content-disposition` header.
    #[error("Cannot determine filename for file {id}: {reason}")]
    AttachmentHeader { id: u64, reason: String },

    /// A source pattern failed to compile.
    #[error("Invalid source pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A rule given as text was not of the form `SRC=DST`.
    #[error("Invalid rule '{0}', expected SRC=DST")]
    InvalidRule(String),
}

impl SyncError {
    /// Returns `true` for failures that affect every later request of the run
    /// (a rejected token), as opposed to one file or folder.
    pub fn is_session_error(&self) -> bool {
        match self {
            SyncError::Unauthorized(_) => true,
            SyncError::ReqwestError(e) => matches!(
                e.status(),
                Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
            ),
            _ => false,
        }
    }
}
