use chrono::Local;
use log::error;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

pub const DOWNLOAD_REPORT: &str = "DOWNLOAD_ERRORS.txt";

/// Append-only log of failed transfers, one `timestamp | status-or-error | url`
/// line per failure, kept in the destination root.
#[derive(Debug, Clone)]
pub struct DownloadReport {
    path: PathBuf,
}

impl DownloadReport {
    pub fn in_dir(dest_root: &Path) -> Self {
        Self {
            path: dest_root.join(DOWNLOAD_REPORT),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format_line(status_or_error: &str, url: &str) -> String {
        let status = status_or_error.replace(['\n', '\r'], " ");
        format!(
            "{} | {} | {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            status,
            url
        )
    }

    /// Appends one entry. Failures to write the report are logged, not returned.
    pub async fn append(&self, status_or_error: &str, url: &str) {
        if let Err(e) = self.try_append(status_or_error, url).await {
            error!("Failed to write {}: {}", self.path.display(), e);
        }
    }

    async fn try_append(&self, status_or_error: &str, url: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(Self::format_line(status_or_error, url).as_bytes())
            .await?;
        file.flush().await
    }
}
