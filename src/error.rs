use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A transport failure reaching a remote URL, either a catalog or a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub url: String,
    pub status: Option<u16>,
    pub detail: String,
}

impl FetchError {
    pub fn status(url: &str, status: u16, reason: &str) -> Self {
        Self {
            url: url.to_string(),
            status: Some(status),
            detail: reason.to_string(),
        }
    }

    pub fn transport(url: &str, detail: impl fmt::Display) -> Self {
        Self {
            url: url.to_string(),
            status: None,
            detail: detail.to_string(),
        }
    }
}

/// Renders the "status-or-error" column of the download report.
impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) if self.detail.is_empty() => write!(f, "HTTP {}", code),
            Some(code) => write!(f, "HTTP {} {}", code, self.detail),
            None => write!(f, "{}", self.detail),
        }
    }
}

impl std::error::Error for FetchError {}

#[derive(Error, Debug)]
pub enum DownloaderError {
    #[error("Fetch failed for {}: {}", .0.url, .0)]
    Fetch(#[from] FetchError),

    #[error("Catalog has no recognized {0} column")]
    Schema(String),

    #[error("Catalog {identity} is not cached at {}; run refresh-catalog first", .path.display())]
    NotCached { identity: String, path: PathBuf },

    #[error("No catalog exists for language '{language}' and topic '{topic}'")]
    InvalidIdentity { language: String, topic: String },

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),

    #[error("Unknown layout: {0}")]
    UnknownLayout(String),

    #[error("Unable to determine config directory (set SPRINGER_CONFIG_DIR, XDG_CONFIG_HOME or HOME)")]
    ConfigDirUnavailable,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
