//! Location of the application directory holding cached catalogs and the
//! default catalog selection.
//!
//! Resolution order: an explicit directory, `SPRINGER_CONFIG_DIR`,
//! `$XDG_CONFIG_HOME/springer`, `$HOME/.config/springer`, `%APPDATA%/springer`.
use crate::error::DownloaderError;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "springer";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_dir: PathBuf,
}

impl AppConfig {
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self, DownloaderError> {
        let app_dir = match explicit.or_else(|| non_empty_env("SPRINGER_CONFIG_DIR")) {
            Some(dir) => dir,
            None => resolve_app_dir(
                non_empty_env("XDG_CONFIG_HOME"),
                non_empty_env("HOME"),
                non_empty_env("APPDATA"),
            )?,
        };
        Ok(Self { app_dir })
    }

    pub fn new(app_dir: impl Into<PathBuf>) -> Self {
        Self { app_dir: app_dir.into() }
    }

    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    pub fn default_selection_path(&self) -> PathBuf {
        self.app_dir.join("default-catalog.json")
    }
}

fn non_empty_env(key: &str) -> Option<PathBuf> {
    sanitize_env_path(env::var_os(key))
}

fn sanitize_env_path(value: Option<OsString>) -> Option<PathBuf> {
    let value = value?;
    if value.to_string_lossy().trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(value))
}

fn resolve_app_dir(
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
    app_data: Option<PathBuf>,
) -> Result<PathBuf, DownloaderError> {
    if let Some(xdg) = xdg_config_home {
        return Ok(xdg.join(APP_NAME));
    }
    if let Some(home) = home {
        return Ok(home.join(".config").join(APP_NAME));
    }
    if let Some(app_data) = app_data {
        return Ok(app_data.join(APP_NAME));
    }
    Err(DownloaderError::ConfigDirUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_dir_wins() {
        let config = AppConfig::resolve(Some(PathBuf::from("/tmp/explicit"))).unwrap();
        assert_eq!(config.app_dir(), Path::new("/tmp/explicit"));
        assert_eq!(
            config.default_selection_path(),
            PathBuf::from("/tmp/explicit/default-catalog.json")
        );
    }

    #[test]
    fn test_resolve_prefers_xdg_over_home() {
        let resolved = resolve_app_dir(
            Some(PathBuf::from("/tmp/xdg")),
            Some(PathBuf::from("/tmp/home")),
            None,
        )
        .unwrap();
        assert_eq!(resolved, PathBuf::from("/tmp/xdg/springer"));
    }

    #[test]
    fn test_resolve_falls_back_to_home_then_appdata() {
        let resolved = resolve_app_dir(None, Some(PathBuf::from("/tmp/home")), None).unwrap();
        assert_eq!(resolved, PathBuf::from("/tmp/home/.config/springer"));
        let resolved = resolve_app_dir(None, None, Some(PathBuf::from("/tmp/appdata"))).unwrap();
        assert_eq!(resolved, PathBuf::from("/tmp/appdata/springer"));
    }

    #[test]
    fn test_resolve_errors_when_nothing_is_set() {
        assert!(matches!(
            resolve_app_dir(None, None, None),
            Err(DownloaderError::ConfigDirUnavailable)
        ));
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        assert_eq!(sanitize_env_path(Some(OsString::from("  "))), None);
        assert_eq!(
            sanitize_env_path(Some(OsString::from("/x"))),
            Some(PathBuf::from("/x"))
        );
    }
}
