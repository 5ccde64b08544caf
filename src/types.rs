use crate::error::DownloaderError;
use crate::identity::CatalogIdentity;
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::str::FromStr;

const SPRINGER_PDF_URL: &str = "https://link.springer.com/content/pdf";
const SPRINGER_EPUB_URL: &str = "https://link.springer.com/download/epub";

/// One book row of a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRecord {
    pub title: String,
    pub package: String,
    pub url: String,
    pub identity: CatalogIdentity,
}

/// The records of one identity plus the modification time of its cache file.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub identity: CatalogIdentity,
    pub records: Vec<CatalogRecord>,
    pub fetched_at: Option<DateTime<Local>>,
    pub cache_path: PathBuf,
}

impl Catalog {
    pub fn summary(&self) -> String {
        let fetched = self
            .fetched_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "not yet fetched".to_string());
        format!(
            "{}/{} ({}): {} books in {} packages, cached {} at {}",
            self.identity.language().label(),
            self.identity.topic().label(),
            self.identity,
            self.records.len(),
            crate::store::packages(&self.records).len(),
            fetched,
            self.cache_path.display()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Pdf,
    Epub,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Pdf => "pdf",
            FileFormat::Epub => "epub",
        }
    }

    fn content_base(&self) -> &'static str {
        match self {
            FileFormat::Pdf => SPRINGER_PDF_URL,
            FileFormat::Epub => SPRINGER_EPUB_URL,
        }
    }

    /// Derives the concrete file URL for this format from a catalog URL.
    ///
    /// DOI links resolve to the publisher's content endpoints by their last two
    /// path segments. Any other URL has its `.pdf`/`.epub` suffix swapped, or
    /// the extension appended when it has none.
    pub fn content_url(&self, record_url: &str) -> String {
        let ext = self.extension();
        let trimmed = record_url.trim().trim_end_matches('/');

        if is_doi_url(trimmed) {
            let mut segments = trimmed.rsplit('/');
            if let (Some(book_id), Some(section)) = (segments.next(), segments.next()) {
                return format!("{}/{}/{}.{}", self.content_base(), section, book_id, ext);
            }
        }

        for known in [FileFormat::Pdf, FileFormat::Epub] {
            let suffix = format!(".{}", known.extension());
            let split = trimmed.len().saturating_sub(suffix.len());
            if let (Some(stem), Some(tail)) = (trimmed.get(..split), trimmed.get(split..)) {
                if tail.eq_ignore_ascii_case(&suffix) {
                    return format!("{}.{}", stem, ext);
                }
            }
        }
        format!("{}.{}", trimmed, ext)
    }
}

fn is_doi_url(url: &str) -> bool {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    let host = without_scheme.split('/').next().unwrap_or("");
    host == "doi.org" || host.ends_with(".doi.org")
}

impl FromStr for FileFormat {
    type Err = DownloaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(FileFormat::Pdf),
            "epub" => Ok(FileFormat::Epub),
            _ => Err(DownloaderError::UnknownFormat(s.to_string())),
        }
    }
}

/// Directory naming policy for planned downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `dest_root/title.ext`
    Flat,
    /// `dest_root/package/title.ext`
    ByPackage,
    /// `dest_root/Language/Topic/[package/]title.ext`
    ByCatalog { with_package: bool },
}

impl FromStr for Layout {
    type Err = DownloaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flat" => Ok(Layout::Flat),
            "by-package" | "package" => Ok(Layout::ByPackage),
            "by-catalog" | "catalog" => Ok(Layout::ByCatalog { with_package: false }),
            "by-catalog-package" => Ok(Layout::ByCatalog { with_package: true }),
            _ => Err(DownloaderError::UnknownLayout(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedDownload {
    pub record: CatalogRecord,
    pub url: String,
    pub output_path: PathBuf,
}

/// Terminal state of one planned item.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadStatus {
    Skipped,
    Completed { bytes: u64 },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedDownload {
    pub output_path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExecutionResult {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: Vec<FailedDownload>,
    pub bytes_downloaded: u64,
}

impl ExecutionResult {
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed.len()
    }

    /// Folds another run's counts into this one.
    pub fn merge(&mut self, other: ExecutionResult) {
        self.succeeded += other.succeeded;
        self.skipped += other.skipped;
        self.bytes_downloaded += other.bytes_downloaded;
        self.failed.extend(other.failed);
    }
}
