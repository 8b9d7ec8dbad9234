//! Main orchestration logic: walk the remote tree, match rules, download.

use crate::client::Client;
use crate::download::{download_directory, download_file, plan_directory};
use crate::error::SyncError;
use crate::format::format_size;
use crate::progress::Reporter;
use crate::rules::RuleSet;
use crate::types::{RemoteNode, SyncConfig};
use crate::verify::Verification;
use crate::walk::{join_remote_path, TreeWalker};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Totals for one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Remote folders and files that matched a rule.
    pub matched: usize,
    /// Files whose checksum matched after download.
    pub verified: usize,
    /// Bytes received over the network.
    pub bytes_fetched: u64,
    /// Files kept despite a checksum mismatch or a missing remote checksum.
    pub unverified: usize,
    /// Matched files or folders that errored.
    pub failures: usize,
    /// Remote files and folders deleted after download.
    pub deleted: usize,
}

/// Walks the remote tree from `config.root_id` and downloads everything the
/// first matching rule selects.
///
/// Matched folders are downloaded whole and not walked any further. Errors
/// for a single matched item, or for listing a single walked folder, are
/// logged and counted and the walk goes on. A rejected token ends the run.
///
/// # Arguments
///
/// * `client` - Authenticated put.io client
/// * `rules` - Rules tried in order against every walked path
/// * `config` - Root folder, dry-run and delete-after settings
///
/// # Returns
///
/// The run totals, or the error that ended the run early.
///
/// # Example
///
/// ```no_run
/// use putsync::{sync, Client, Rule, RuleSet, SyncConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::new("token")?;
/// let rules = RuleSet::new(vec![Rule::new("TV/", "/Volumes/Videos")?]);
/// let summary = sync(&client, &rules, &SyncConfig::default()).await?;
/// println!("{} files verified", summary.verified);
/// # Ok(())
/// # }
/// ```
pub async fn sync(
    client: &Client,
    rules: &RuleSet,
    config: &SyncConfig,
) -> Result<SyncSummary, SyncError> {
    let reporter = Reporter::new(config.show_progress && !config.dry_run);
    let mut summary = SyncSummary::default();

    let root = client.get(config.root_id).await?;
    let mut walker = TreeWalker::new(client, config.root_path.clone(), root);

    loop {
        let visit = match walker.next_dir().await {
            Ok(Some(visit)) => visit,
            Ok(None) => break,
            Err(e) if e.is_session_error() => return Err(e),
            Err(e) => {
                // The failed folder is already off the walker's stack.
                error!("Failed to list remote folder: {}", e);
                summary.failures += 1;
                continue;
            }
        };

        for dir in &visit.dirs {
            let dirpath = join_remote_path(&visit.path, &dir.name);
            let Some(rule) = rules.find(&dirpath) else {
                debug!("No match {}", dirpath);
                continue;
            };
            walker.claim(dir.id);
            let Some(dest_dir) = rule.resolve(&visit.path, &dirpath) else {
                warn!("No metadata to fill {} for {}, skipping", rule, dirpath);
                continue;
            };
            summary.matched += 1;
            info!(
                "Matched \"put.io:{}\", download to \"{}\"",
                dirpath,
                dest_dir.display()
            );

            if config.dry_run {
                if let Err(e) = print_plan(client, dir, &dest_dir).await {
                    if e.is_session_error() {
                        return Err(e);
                    }
                    error!("Failed to list {}: {}", dirpath, e);
                    summary.failures += 1;
                }
                continue;
            }

            match download_directory(
                client,
                dir,
                &dest_dir,
                config.delete_after_download,
                &reporter,
            )
            .await
            {
                Ok(report) => {
                    for file in &report.files {
                        summary.record(&file.verification, file.fetched, file.deleted);
                    }
                    summary.failures += report.failures.len();
                    if report.deleted {
                        summary.deleted += 1;
                    }
                }
                Err(e) if e.is_session_error() => return Err(e),
                Err(e) => {
                    error!("Failed to download {}: {}", dirpath, e);
                    summary.failures += 1;
                }
            }
        }

        for file in &visit.files {
            let filepath = join_remote_path(&visit.path, &file.name);
            let Some(rule) = rules.find(&filepath) else {
                continue;
            };
            let Some(dest_dir) = rule.resolve(&visit.path, &filepath) else {
                warn!("No metadata to fill {} for {}, skipping", rule, filepath);
                continue;
            };
            summary.matched += 1;
            info!(
                "Matched \"put.io:{}\", download to \"{}\"",
                filepath,
                dest_dir.display()
            );

            if config.dry_run {
                println!("{} ({})", dest_dir.join(&file.name).display(), format_size(file.size));
                continue;
            }

            let pb = reporter.file_bar(file);
            let result = match tokio::fs::create_dir_all(&dest_dir).await {
                Ok(()) => {
                    download_file(client, file, &dest_dir, config.delete_after_download, &pb)
                        .await
                }
                Err(e) => Err(e.into()),
            };
            match result {
                Ok(report) => {
                    pb.finish_with_message(format!("✅ {}", file.name));
                    summary.record(&report.verification, report.fetched, report.deleted);
                }
                Err(e) => {
                    pb.abandon_with_message(format!("❌ {}", file.name));
                    if e.is_session_error() {
                        return Err(e);
                    }
                    error!("Failed to download {}: {}", filepath, e);
                    summary.failures += 1;
                }
            }
        }
    }

    info!(
        "✅ Done: {} matched, {} verified, {} fetched, {} unverified, {} failed, {} deleted",
        summary.matched,
        summary.verified,
        format_size(summary.bytes_fetched),
        summary.unverified,
        summary.failures,
        summary.deleted
    );
    Ok(summary)
}

impl SyncSummary {
    fn record(&mut self, verification: &Verification, fetched: u64, deleted: bool) {
        self.bytes_fetched += fetched;
        if verification.is_match() {
            self.verified += 1;
        } else {
            self.unverified += 1;
        }
        if deleted {
            self.deleted += 1;
        }
    }
}

/// Dry run: lists what a folder download would write, without touching disk.
async fn print_plan(client: &Client, dir: &RemoteNode, dest_dir: &Path) -> Result<(), SyncError> {
    let plan = plan_directory(client, dir, dest_dir).await?;
    for planned in &plan.files {
        println!(
            "{} ({})",
            planned.dest_dir.join(&planned.node.name).display(),
            format_size(planned.node.size)
        );
    }
    info!(
        "Would download {} files, {}",
        plan.files.len(),
        format_size(plan.total_bytes())
    );
    Ok(())
}
