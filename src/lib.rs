//! Catalog cache and bulk download engine for the freely available
//! Springer textbook collections.
pub mod config;
pub mod defaults;
pub mod downloader;
pub mod error;
pub mod fetch;
pub mod fsutil;
pub mod identity;
pub mod parser;
pub mod report;
pub mod store;
pub mod types;

pub use config::AppConfig;
pub use defaults::DefaultCatalogSelector;
pub use downloader::{plan, Downloader};
pub use error::{DownloaderError, FetchError};
pub use fetch::{Fetcher, HttpFetcher};
pub use identity::{CatalogIdentity, Language, Topic};
pub use store::{filter, packages, CatalogStore};
pub use types::{Catalog, CatalogRecord, ExecutionResult, FileFormat, Layout, PlannedDownload};
