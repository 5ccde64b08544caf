use crate::fetch::Fetcher;
use crate::fsutil::partial_path;
use crate::report::DownloadReport;
use crate::types::{
    CatalogRecord, DownloadStatus, ExecutionResult, FailedDownload, FileFormat, Layout,
    PlannedDownload,
};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info};
use std::path::Path;
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// Stem budget in bytes; filesystems cap names at 255 bytes, not chars.
const MAX_STEM_BYTES: usize = 200;

/// Derives a filesystem-safe file name from a book title.
///
/// Letters, digits and `-` are kept; every other run of characters becomes a
/// single `_`, and leading or trailing `_` are trimmed. The mapping must stay
/// stable: resumed runs find completed files by this name.
pub fn safe_filename(title: &str, format: FileFormat) -> String {
    let mut stem = String::with_capacity(title.len());
    let mut prev_sep = false;
    for ch in title.chars() {
        if ch.is_alphanumeric() || ch == '-' {
            stem.push(ch);
            prev_sep = false;
        } else if !prev_sep {
            stem.push('_');
            prev_sep = true;
        }
    }
    let stem = truncate_to_bytes(stem.trim_matches('_'), MAX_STEM_BYTES).trim_end_matches('_');
    let stem = if stem.is_empty() { "untitled" } else { stem };
    format!("{}.{}", stem, format.extension())
}

fn truncate_to_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Package names keep their spelling; only path separators and characters
/// rejected by common filesystems are replaced.
pub fn safe_dirname(package: &str) -> String {
    let cleaned: String = package
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    truncate_to_bytes(cleaned.trim().trim_matches('.'), MAX_STEM_BYTES)
        .trim_end()
        .to_string()
}

/// Maps each record to its source URL and destination path.
pub fn plan(
    records: &[CatalogRecord],
    format: FileFormat,
    dest_root: &Path,
    layout: Layout,
) -> Vec<PlannedDownload> {
    info!("Planning {} downloads into {}", records.len(), dest_root.display());
    let tasks: Vec<PlannedDownload> = records
        .iter()
        .map(|record| plan_one(record, format, dest_root, layout))
        .collect();
    for task in &tasks {
        debug!("Planned: {} -> {}", task.url, task.output_path.display());
    }
    tasks
}

fn plan_one(
    record: &CatalogRecord,
    format: FileFormat,
    dest_root: &Path,
    layout: Layout,
) -> PlannedDownload {
    let mut dir = dest_root.to_path_buf();
    let package_dir = safe_dirname(&record.package);

    match layout {
        Layout::Flat => {}
        Layout::ByPackage => {
            if !package_dir.is_empty() {
                dir.push(&package_dir);
            }
        }
        Layout::ByCatalog { with_package } => {
            dir.push(record.identity.label_dir());
            if with_package && !package_dir.is_empty() {
                dir.push(&package_dir);
            }
        }
    }

    PlannedDownload {
        record: record.clone(),
        url: format.content_url(&record.url),
        output_path: dir.join(safe_filename(&record.title, format)),
    }
}

/// Runs planned downloads one at a time, skipping files already present.
pub struct Downloader {
    fetcher: Arc<dyn Fetcher>,
    report: DownloadReport,
    progress: ProgressBar,
}

impl Downloader {
    pub fn new(fetcher: Arc<dyn Fetcher>, dest_root: &Path) -> Self {
        Self {
            fetcher,
            report: DownloadReport::in_dir(dest_root),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn report(&self) -> &DownloadReport {
        &self.report
    }

    pub fn progress_bar(len: u64) -> ProgressBar {
        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }

    /// Executes `plan` in order. Per-item failures are collected in the result
    /// and appended to the report; they never stop the batch.
    pub async fn execute(&self, plan: &[PlannedDownload], overwrite: bool) -> ExecutionResult {
        self.progress.set_length(plan.len() as u64);
        let result = self.run_items(plan, overwrite).await;
        self.finish(&result);
        result
    }

    /// Executes several plans (one per catalog) in sequence and merges their
    /// results.
    pub async fn execute_batches(
        &self,
        plans: &[Vec<PlannedDownload>],
        overwrite: bool,
    ) -> ExecutionResult {
        self.progress
            .set_length(plans.iter().map(|p| p.len() as u64).sum());
        let mut result = ExecutionResult::default();
        for plan in plans {
            result.merge(self.run_items(plan, overwrite).await);
        }
        self.finish(&result);
        result
    }

    async fn run_items(&self, plan: &[PlannedDownload], overwrite: bool) -> ExecutionResult {
        let mut result = ExecutionResult::default();

        for task in plan {
            self.progress
                .set_message(task.record.title.chars().take(40).collect::<String>());

            match self.download_file(task, overwrite).await {
                DownloadStatus::Skipped => result.skipped += 1,
                DownloadStatus::Completed { bytes } => {
                    result.succeeded += 1;
                    result.bytes_downloaded += bytes;
                }
                DownloadStatus::Failed(reason) => {
                    self.report.append(&reason, &task.url).await;
                    result.failed.push(FailedDownload {
                        output_path: task.output_path.clone(),
                        reason,
                    });
                }
            }
            self.progress.inc(1);
        }
        result
    }

    fn finish(&self, result: &ExecutionResult) {
        self.progress.finish_with_message("done");
        info!(
            "Downloads finished: {} of {} succeeded, {} skipped, {} failed",
            result.succeeded,
            result.total(),
            result.skipped,
            result.failed.len()
        );
    }

    async fn download_file(&self, task: &PlannedDownload, overwrite: bool) -> DownloadStatus {
        if !overwrite && is_file(&task.output_path).await {
            info!("Skipping existing {}", task.output_path.display());
            return DownloadStatus::Skipped;
        }

        info!("Starting download: {}", task.url);
        match self.transfer(&task.url, &task.output_path).await {
            Ok(bytes) => {
                info!("Saved {} ({} bytes)", task.output_path.display(), bytes);
                DownloadStatus::Completed { bytes }
            }
            Err(reason) => {
                error!("Download failed for {}: {}", task.url, reason);
                DownloadStatus::Failed(reason)
            }
        }
    }

    /// Streams `url` into a partial file next to `output_path` and renames it
    /// into place once the body is complete.
    async fn transfer(&self, url: &str, output_path: &Path) -> Result<u64, String> {
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("create {}: {}", parent.display(), e))?;
        }

        let mut stream = self.fetcher.open(url).await.map_err(|e| e.to_string())?;

        let partial = partial_path(output_path);
        let written = async {
            let mut file = File::create(&partial)
                .await
                .map_err(|e| format!("create {}: {}", partial.display(), e))?;
            let mut downloaded: u64 = 0;

            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| e.to_string())?;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| format!("write {}: {}", partial.display(), e))?;
                downloaded += chunk.len() as u64;
            }

            file.flush().await.map_err(|e| e.to_string())?;
            file.sync_all().await.map_err(|e| e.to_string())?;
            Ok::<u64, String>(downloaded)
        }
        .await;

        let downloaded = match written {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&partial, output_path).await {
            let _ = fs::remove_file(&partial).await;
            return Err(format!("rename to {}: {}", output_path.display(), e));
        }
        Ok(downloaded)
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
