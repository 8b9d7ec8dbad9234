//! Progress bars for file transfers.

use crate::types::RemoteNode;
use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{spinner:.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg} | {elapsed_precise} elapsed, ETA {eta_precise}";

/// Hands out one progress bar per file, or hidden bars when disabled.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    visible: bool,
}

impl Reporter {
    pub fn new(visible: bool) -> Self {
        Self { visible }
    }

    pub fn hidden() -> Self {
        Self::new(false)
    }

    /// Creates a byte progress bar sized to the remote file.
    pub fn file_bar(&self, node: &RemoteNode) -> ProgressBar {
        if !self.visible {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(node.size);
        let style = ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ ");
        bar.set_style(style);
        bar.set_message(format!("⬇️  {}", node.name));
        bar
    }
}
