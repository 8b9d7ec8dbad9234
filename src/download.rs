//! Resumable file and folder downloads.

use crate::client::Client;
use crate::error::SyncError;
use crate::progress::Reporter;
use crate::types::RemoteNode;
use crate::verify::{verify_local_file, Verification};
use futures_util::StreamExt;
use indicatif::ProgressBar;
use reqwest::StatusCode;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{error, info, warn};

/// Size of each write (and of each read during verification).
pub const CHUNK_SIZE: usize = 8 * 1024;

/// What happened to a single file.
#[derive(Debug, Clone)]
pub struct FileReport {
    /// Local path the file was written to.
    pub path: PathBuf,
    /// Bytes already on disk before this run.
    pub resumed_from: u64,
    /// Bytes received during this run.
    pub fetched: u64,
    /// Result of the CRC32 pass.
    pub verification: Verification,
    /// Whether the remote file was deleted afterwards.
    pub deleted: bool,
}

/// A file scheduled for download, with the local folder it lands in.
#[derive(Debug, Clone)]
pub struct PlannedFile {
    pub node: RemoteNode,
    pub dest_dir: PathBuf,
}

/// Everything a folder download will touch, in depth-first listing order.
#[derive(Debug, Clone, Default)]
pub struct DownloadPlan {
    /// Local folders to create, parents before children.
    pub directories: Vec<PathBuf>,
    /// Files to download.
    pub files: Vec<PlannedFile>,
    /// Subfolders whose listing failed, with the error message.
    pub unlisted: Vec<(RemoteNode, String)>,
}

impl DownloadPlan {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.node.size).sum()
    }
}

/// What happened to a folder.
#[derive(Debug, Default)]
pub struct DirectoryReport {
    pub files: Vec<FileReport>,
    /// Files and subfolders that errored, with the error message.
    pub failures: Vec<(RemoteNode, String)>,
    /// Whether the remote folder was deleted afterwards.
    pub deleted: bool,
}

impl DirectoryReport {
    /// Every file transferred and verified.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.files.iter().all(|f| f.verification.is_match())
    }
}

/// Downloads one remote file into `dest_dir`, resuming from whatever is
/// already on disk, then verifies it.
///
/// The local name comes from the download endpoint's attachment header. An
/// existing local file at least as large as the remote one is not fetched
/// again, only verified. A checksum mismatch is not an error: the file is
/// kept and reported, and `delete_after` is ignored for it.
///
/// # Arguments
///
/// * `client` - Authenticated put.io client
/// * `node` - Remote file to download
/// * `dest_dir` - Existing local folder the file is written into
/// * `delete_after` - Delete the remote file once its checksum matches
/// * `pb` - Progress bar for updating download progress
///
/// # Returns
///
/// A [`FileReport`] for the file, or an error if the transfer failed.
pub async fn download_file(
    client: &Client,
    node: &RemoteNode,
    dest_dir: &Path,
    delete_after: bool,
    pb: &ProgressBar,
) -> Result<FileReport, SyncError> {
    let filename = client.attachment_filename(node.id).await?;
    let filepath = dest_dir.join(&filename);

    let existing = match tokio::fs::metadata(&filepath).await {
        Ok(m) => Some(m.len()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    pb.set_length(node.size);
    let (resumed_from, fetched) = match existing {
        Some(len) if len >= node.size => {
            info!("Existing file: {}", filepath.display());
            pb.set_position(len);
            (len, 0)
        }
        _ => {
            let offset = existing.unwrap_or(0);
            if offset > 0 {
                info!("Resuming {} from byte {}", filepath.display(), offset);
            } else {
                info!("Downloading {}", filepath.display());
            }
            stream_to_file(client, node, &filepath, offset, pb).await?
        }
    };

    let verification = verify_local_file(&filepath, node.crc32.as_deref()).await?;

    let mut deleted = false;
    if verification.is_match() && delete_after {
        client.delete(node.id).await?;
        info!("Deleted remote file {}", node.name);
        deleted = true;
    }

    Ok(FileReport {
        path: filepath,
        resumed_from,
        fetched,
        verification,
        deleted,
    })
}

/// Streams the remote body into `filepath`, returning `(start offset, bytes written)`.
///
/// Every chunk is flushed before it counts as progress, so after a crash
/// the file length is exactly what the next resume starts from.
async fn stream_to_file(
    client: &Client,
    node: &RemoteNode,
    filepath: &Path,
    offset: u64,
    pb: &ProgressBar,
) -> Result<(u64, u64), SyncError> {
    let response = client.open_download(node.id, offset).await?;

    let resumed = offset > 0 && response.status() == StatusCode::PARTIAL_CONTENT;
    if offset > 0 && !resumed {
        warn!(
            "Server ignored range request for {} (HTTP {}), restarting from zero",
            filepath.display(),
            response.status()
        );
    }
    let start = if resumed { offset } else { 0 };

    let file = if resumed {
        OpenOptions::new().append(true).open(filepath).await?
    } else {
        tokio::fs::File::create(filepath).await?
    };
    let mut file = BufWriter::with_capacity(CHUNK_SIZE, file);

    let mut progress = start;
    pb.set_position(progress);

    let mut byte_stream = response.bytes_stream();
    while let Some(piece) = byte_stream.next().await {
        let piece = piece?;
        for chunk in piece.chunks(CHUNK_SIZE) {
            file.write_all(chunk).await?;
            file.flush().await?;
            progress += chunk.len() as u64;
            pb.set_position(progress);
        }
    }
    file.flush().await?;

    Ok((start, progress - start))
}

/// Lists a remote folder recursively and maps every file to the local folder
/// it belongs in. The folder itself lands at `dest/<folder name>`.
///
/// Uses an explicit stack of child iterators so files come out in the same
/// depth-first listing order a recursive walk would produce. A subfolder that
/// fails to list is recorded in [`DownloadPlan::unlisted`] and its siblings are
/// still planned; only a failure to list `node` itself is an error.
pub async fn plan_directory(
    client: &Client,
    node: &RemoteNode,
    dest: &Path,
) -> Result<DownloadPlan, SyncError> {
    let mut plan = DownloadPlan::default();

    let root = dest.join(&node.name);
    let children = client.list(node.id).await?;
    plan.directories.push(root.clone());
    let mut stack = vec![(root, children.into_iter())];

    while let Some((local_dir, children)) = stack.last_mut() {
        let Some(child) = children.next() else {
            stack.pop();
            continue;
        };

        if child.is_dir() {
            let child_dir = local_dir.join(&child.name);
            match client.list(child.id).await {
                Ok(grandchildren) => {
                    plan.directories.push(child_dir.clone());
                    stack.push((child_dir, grandchildren.into_iter()));
                }
                // Session-wide failures are not local to this subfolder.
                Err(e) if e.is_session_error() => return Err(e),
                Err(e) => {
                    error!("Failed to list {}: {}", child_dir.display(), e);
                    plan.unlisted.push((child, e.to_string()));
                }
            }
        } else {
            let dest_dir = local_dir.clone();
            plan.files.push(PlannedFile {
                node: child,
                dest_dir,
            });
        }
    }

    Ok(plan)
}

/// Downloads a remote folder into `dest/<folder name>`.
///
/// A failing file or subfolder is recorded and its siblings still run. With
/// `delete_after`, the remote folder is deleted only when every file in it
/// verified. A failed folder delete is logged and leaves `deleted` unset.
///
/// # Arguments
///
/// * `client` - Authenticated put.io client
/// * `node` - Remote folder to download
/// * `dest` - Local folder the remote folder is created in
/// * `delete_after` - Delete remote files and the folder once verified
/// * `reporter` - Source of per-file progress bars
///
/// # Returns
///
/// A [`DirectoryReport`], or an error if `node` itself could not be listed
/// or the token was rejected.
pub async fn download_directory(
    client: &Client,
    node: &RemoteNode,
    dest: &Path,
    delete_after: bool,
    reporter: &Reporter,
) -> Result<DirectoryReport, SyncError> {
    let plan = plan_directory(client, node, dest).await?;
    for dir in &plan.directories {
        tokio::fs::create_dir_all(dir).await?;
    }

    let mut report = DirectoryReport {
        failures: plan.unlisted,
        ..DirectoryReport::default()
    };
    for planned in plan.files {
        let pb = reporter.file_bar(&planned.node);
        match download_file(client, &planned.node, &planned.dest_dir, delete_after, &pb).await {
            Ok(file_report) => {
                pb.finish_with_message(format!("✅ {}", planned.node.name));
                report.files.push(file_report);
            }
            Err(e) if e.is_session_error() => {
                pb.abandon_with_message(format!("❌ {}", planned.node.name));
                return Err(e);
            }
            Err(e) => {
                pb.abandon_with_message(format!("❌ {}", planned.node.name));
                error!("Failed to download {}: {}", planned.node.name, e);
                report.failures.push((planned.node, e.to_string()));
            }
        }
    }

    if delete_after && report.is_complete() {
        match client.delete(node.id).await {
            Ok(()) => {
                info!("Deleted remote folder {}", node.name);
                report.deleted = true;
            }
            Err(e) if e.is_session_error() => return Err(e),
            Err(e) => error!("Failed to delete remote folder {}: {}", node.name, e),
        }
    }

    Ok(report)
}
