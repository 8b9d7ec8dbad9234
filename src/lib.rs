//! PutSync - Mirror selected put.io folders onto local disk
//!
//! This library walks a put.io account, picks the folders and files that match
//! an ordered list of source patterns, and downloads them into local
//! destination folders with resumable, CRC32-verified transfers.
//!
//! # Features
//!
//! - **Resumable Downloads**: Partial files are continued with HTTP range requests
//! - **CRC32 Verification**: Every file is checked against the checksum put.io reports
//! - **Pattern Rules**: First-match-wins source patterns with destination templates
//! - **Metadata Extraction**: Season, episode, resolution and more from release names
//! - **Progress Tracking**: Per-file progress bars
//!
//! # Example
//!
//! ```no_run
//! use putsync::{sync, Client, Rule, RuleSet, SyncConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new("oauth-token")?;
//! let rules = RuleSet::new(vec![Rule::new("TV/", "/Volumes/Videos")?]);
//!
//! sync(&client, &rules, &SyncConfig::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod download;
pub mod error;
pub mod format;
pub mod metadata;
pub mod orchestrator;
pub mod progress;
pub mod rules;
pub mod types;
pub mod verify;
pub mod walk;

pub use client::{Client, DEFAULT_API_URL};
pub use download::{
    download_directory, download_file, plan_directory, DirectoryReport, DownloadPlan, FileReport,
};
pub use error::SyncError;
pub use format::format_size;
pub use metadata::{extract, MetadataBag, MetadataKind};
pub use orchestrator::{sync, SyncSummary};
pub use progress::Reporter;
pub use rules::{Rule, RuleSet};
pub use types::{RemoteNode, SyncConfig};
pub use verify::Verification;
pub use walk::{TreeWalker, Visit};
