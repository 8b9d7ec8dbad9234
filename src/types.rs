//! Data structures shared by the walker, the download engine and the CLI.

use crate::client::{Client, DEFAULT_API_URL};
use crate::error::SyncError;
use serde::{Deserialize, Deserializer};
use std::time::SystemTime;

/// Content type put.io uses to mark folders.
pub const DIRECTORY_CONTENT_TYPE: &str = "application/x-directory";

/// One file or folder as reported by the put.io API.
///
/// Instances are a snapshot of a single listing call; nothing is cached, so
/// listing the same folder twice yields fresh values.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RemoteNode {
    /// Remote identifier. The account root is `0`.
    pub id: u64,
    /// Display name; may differ from the download attachment name.
    pub name: String,
    /// Size in bytes (folders report the size of their contents).
    #[serde(default)]
    pub size: u64,
    /// MIME type, [`DIRECTORY_CONTENT_TYPE`] for folders.
    #[serde(default)]
    pub content_type: String,
    /// CRC32 as 8 lowercase hex digits, absent for folders.
    #[serde(default)]
    pub crc32: Option<String>,
    /// Parent folder identifier.
    #[serde(default)]
    pub parent_id: Option<u64>,
    /// Creation time, `None` when missing or unparseable.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<SystemTime>,
}

impl RemoteNode {
    /// Returns `true` if this node is a folder.
    pub fn is_dir(&self) -> bool {
        self.content_type == DIRECTORY_CONTENT_TYPE
    }

    /// Lists the immediate children of this folder.
    pub async fn children(&self, client: &Client) -> Result<Vec<RemoteNode>, SyncError> {
        client.list(self.id).await
    }
}

/// put.io sends timestamps like `2014-03-25T13:21:05` (no zone), which
/// `humantime` accepts in its weak RFC3339 mode.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<SystemTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| humantime::parse_rfc3339_weak(&s).ok()))
}

/// Configuration for a sync run.
///
/// # Example
///
/// ```
/// use putsync::SyncConfig;
///
/// let config = SyncConfig {
///     dry_run: true,
///     ..SyncConfig::default()
/// };
/// assert_eq!(config.root_path, "/");
/// ```
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the put.io API (e.g., `https://api.put.io/v2`)
    pub api_url: String,
    /// Remote folder the walk starts from (default: `0`, the account root).
    pub root_id: u64,
    /// Path given to the root folder; rule patterns are matched against paths
    /// built from it (default: `"/"`).
    pub root_path: String,
    /// Only report what would be downloaded (default: false).
    pub dry_run: bool,
    /// Delete remote files and folders once their download verified (default: false).
    pub delete_after_download: bool,
    /// Draw per-file progress bars (default: true).
    pub show_progress: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            root_id: 0,
            root_path: "/".to_string(),
            dry_run: false,
            delete_after_download: false,
            show_progress: true,
        }
    }
}
