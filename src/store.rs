//! Cached catalogs: refresh from the remote source, load from disk, filter,
//! group by package and evict.
use crate::config::AppConfig;
use crate::error::DownloaderError;
use crate::fetch::Fetcher;
use crate::fsutil::write_atomic;
use crate::identity::CatalogIdentity;
use crate::parser::{parse_catalog, serialize_catalog};
use crate::types::{Catalog, CatalogRecord};
use chrono::{DateTime, Local};
use log::{info, warn};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;

pub struct CatalogStore {
    config: AppConfig,
    fetcher: Arc<dyn Fetcher>,
}

impl CatalogStore {
    pub fn new(config: AppConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { config, fetcher }
    }

    pub fn cache_path(&self, identity: CatalogIdentity) -> PathBuf {
        identity.cache_path(self.config.app_dir())
    }

    /// Fetches and parses the catalog for `identity`, then replaces its cache.
    ///
    /// `url_override` applies to this call only. On any failure the previous
    /// cache is left as it was.
    pub async fn refresh(
        &self,
        identity: CatalogIdentity,
        url_override: Option<&str>,
    ) -> Result<Catalog, DownloaderError> {
        let url = url_override
            .map(str::to_string)
            .unwrap_or_else(|| identity.default_url());
        info!("Refreshing catalog {} from {}", identity, url);

        let raw = self.fetcher.fetch(&url).await?;
        let records = parse_catalog(&raw, identity)?;

        let cache_path = self.cache_path(identity);
        write_atomic(&cache_path, &serialize_catalog(&records)?).await?;
        info!("Cached {} records at {}", records.len(), cache_path.display());

        Ok(Catalog {
            identity,
            records,
            fetched_at: modified_time(&cache_path).await,
            cache_path,
        })
    }

    pub async fn load(&self, identity: CatalogIdentity) -> Result<Catalog, DownloaderError> {
        let cache_path = self.cache_path(identity);
        let raw = match fs::read(&cache_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DownloaderError::NotCached {
                    identity: identity.to_string(),
                    path: cache_path,
                });
            }
            Err(e) => return Err(e.into()),
        };
        let records = parse_catalog(&raw, identity)?;
        info!("Loaded {} records for catalog {}", records.len(), identity);

        Ok(Catalog {
            identity,
            records,
            fetched_at: modified_time(&cache_path).await,
            cache_path,
        })
    }

    /// Deletes the cache file for `identity`. Returns whether a file was removed.
    pub async fn evict(&self, identity: CatalogIdentity) -> Result<bool, DownloaderError> {
        let cache_path = self.cache_path(identity);
        match fs::remove_file(&cache_path).await {
            Ok(()) => {
                info!("Evicted catalog {} ({})", identity, cache_path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => {
                warn!("Failed to evict {}: {}", cache_path.display(), e);
                Err(e.into())
            }
        }
    }

    pub async fn evict_all(&self) -> Result<usize, DownloaderError> {
        let mut removed = 0;
        for identity in CatalogIdentity::all() {
            if self.evict(identity).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

async fn modified_time(path: &std::path::Path) -> Option<DateTime<Local>> {
    let metadata = fs::metadata(path).await.ok()?;
    metadata.modified().ok().map(DateTime::<Local>::from)
}

/// Records whose title and package contain the given substrings, ignoring
/// case. A missing predicate matches everything. Input order is kept.
pub fn filter(
    records: &[CatalogRecord],
    title: Option<&str>,
    package: Option<&str>,
) -> Vec<CatalogRecord> {
    let title = title.map(str::to_lowercase);
    let package = package.map(str::to_lowercase);

    records
        .iter()
        .filter(|r| {
            title
                .as_deref()
                .map_or(true, |t| r.title.to_lowercase().contains(t))
        })
        .filter(|r| {
            package
                .as_deref()
                .map_or(true, |p| r.package.to_lowercase().contains(p))
        })
        .cloned()
        .collect()
}

/// Groups records by package name in order of first appearance.
pub fn packages(records: &[CatalogRecord]) -> Vec<(String, Vec<&CatalogRecord>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&CatalogRecord>)> = Vec::new();

    for record in records {
        let slot = *index.entry(record.package.as_str()).or_insert_with(|| {
            groups.push((record.package.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(record);
    }
    groups
}
