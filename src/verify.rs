//! File verification utilities (CRC32 checksums).

use crate::download::CHUNK_SIZE;
use crate::error::SyncError;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of comparing a local file against the remote checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Local CRC32 equals the remote one.
    Match,
    /// Checksums differ; the local file is kept for inspection or a re-run.
    Mismatch { local: String, remote: String },
    /// The remote reported no checksum, so nothing could be compared.
    Unavailable { local: String },
}

impl Verification {
    pub fn is_match(&self) -> bool {
        matches!(self, Verification::Match)
    }
}

/// Renders a CRC32 the way put.io reports it: 8 lowercase hex digits.
pub fn format_crc32(crc: u32) -> String {
    format!("{:08x}", crc)
}

/// Computes the CRC32 of a local file.
///
/// The file is read in [`CHUNK_SIZE`] pieces so arbitrarily large files never
/// sit in memory. It runs in a blocking task to avoid blocking the async
/// runtime.
pub async fn compute_file_crc32(path: &Path) -> Result<String, SyncError> {
    let path: PathBuf = path.to_path_buf();

    tokio::task::spawn_blocking(move || {
        use std::io::Read;

        let mut file = std::fs::File::open(&path).map_err(SyncError::IoError)?;
        let mut hasher = crc32fast::Hasher::new();
        let mut buffer = vec![0u8; CHUNK_SIZE];

        loop {
            let n = file.read(&mut buffer).map_err(SyncError::IoError)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(format_crc32(hasher.finalize()))
    })
    .await
    .map_err(|e| SyncError::IoError(std::io::Error::other(format!("Task join error: {}", e))))?
}

/// Verifies a downloaded file against the checksum reported by the API.
///
/// # Arguments
///
/// * `path` - Path to the local file
/// * `remote_crc32` - Checksum reported by put.io, if any
///
/// # Returns
///
/// The [`Verification`] outcome, or an error if the file could not be read.
pub async fn verify_local_file(
    path: &Path,
    remote_crc32: Option<&str>,
) -> Result<Verification, SyncError> {
    let file_display_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let local = compute_file_crc32(path).await?;

    let verification = match remote_crc32 {
        Some(remote) if remote.eq_ignore_ascii_case(&local) => {
            info!("✅ {} matches remote (crc32 {})", file_display_name, local);
            Verification::Match
        }
        Some(remote) => {
            warn!(
                "❌ File checksums not matching for {}: local {} remote {}",
                file_display_name, local, remote
            );
            Verification::Mismatch {
                local,
                remote: remote.to_string(),
            }
        }
        None => {
            warn!(
                "⚠️  No remote checksum for {}, local crc32 {}",
                file_display_name, local
            );
            Verification::Unavailable { local }
        }
    };

    Ok(verification)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_crc32_pads_to_eight_digits() {
        assert_eq!(format_crc32(0xabc), "00000abc");
        assert_eq!(format_crc32(0xCBF4_3926), "cbf43926");
    }

    #[tokio::test]
    async fn test_crc32_of_check_string() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("check.txt");
        std::fs::write(&path, b"123456789").unwrap();

        // Standard CRC-32 check value.
        assert_eq!(compute_file_crc32(&path).await.unwrap(), "cbf43926");
    }

    #[tokio::test]
    async fn test_crc32_spans_multiple_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let data: Vec<u8> = (0..CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let expected = format_crc32(crc32fast::hash(&data));
        assert_eq!(compute_file_crc32(&path).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_verify_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("check.txt");
        std::fs::write(&path, b"123456789").unwrap();

        assert_eq!(
            verify_local_file(&path, Some("CBF43926")).await.unwrap(),
            Verification::Match
        );
        assert_eq!(
            verify_local_file(&path, Some("00000000")).await.unwrap(),
            Verification::Mismatch {
                local: "cbf43926".to_string(),
                remote: "00000000".to_string()
            }
        );
        assert!(!verify_local_file(&path, None).await.unwrap().is_match());
    }
}
