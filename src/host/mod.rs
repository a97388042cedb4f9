//! What the surrounding runtime can do for the popup.
//!
//! Picked once at startup: [`HostedCapabilities`] when a browser-side launcher
//! handed us the active tab, [`StandaloneCapabilities`] otherwise.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::AppError;

/// Result of asking the host for the active tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabQuery {
    Unsupported,
    NoActiveTab,
    Url(String),
}

#[async_trait]
pub trait HostCapabilities: Send + Sync {
    /// Human-readable name of the host
    fn name(&self) -> &'static str;

    fn active_tab_url(&self) -> TabQuery;

    /// Where a file called `filename` should be written.
    /// `Ok(None)` means the user backed out.
    async fn save_destination(&self, filename: &str) -> Result<Option<PathBuf>, AppError>;
}

/// Launched from the browser: knows the active tab and saves straight into
/// the downloads directory like a browser download manager.
pub struct HostedCapabilities {
    tab_url: Option<String>,
    download_dir: PathBuf,
}

impl HostedCapabilities {
    pub fn new(tab_url: Option<String>, download_dir: PathBuf) -> Self {
        Self {
            tab_url,
            download_dir,
        }
    }

    pub fn with_default_dir(tab_url: Option<String>) -> Self {
        let download_dir = dirs::download_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(tab_url, download_dir)
    }
}

#[async_trait]
impl HostCapabilities for HostedCapabilities {
    fn name(&self) -> &'static str {
        "hosted"
    }

    fn active_tab_url(&self) -> TabQuery {
        match &self.tab_url {
            Some(url) if !url.trim().is_empty() => TabQuery::Url(url.clone()),
            _ => TabQuery::NoActiveTab,
        }
    }

    async fn save_destination(&self, filename: &str) -> Result<Option<PathBuf>, AppError> {
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| AppError::Io(format!("Failed to create download directory: {}", e)))?;

        let path = unique_path(&self.download_dir, filename).await;
        info!("Saving download to {}", path.display());
        Ok(Some(path))
    }
}

/// Running on its own: no tab to read, asks where to save.
pub struct StandaloneCapabilities;

#[async_trait]
impl HostCapabilities for StandaloneCapabilities {
    fn name(&self) -> &'static str {
        "standalone"
    }

    fn active_tab_url(&self) -> TabQuery {
        TabQuery::Unsupported
    }

    async fn save_destination(&self, filename: &str) -> Result<Option<PathBuf>, AppError> {
        let path = rfd::AsyncFileDialog::new()
            .set_file_name(filename)
            .save_file()
            .await
            .map(|handle| handle.path().to_path_buf());

        debug!(chosen = ?path, "Save dialog closed");
        Ok(path)
    }
}

/// `dir/filename`, or `dir/stem (n).ext` when that already exists.
async fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
        return candidate;
    }

    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (filename, None),
    };

    let mut n = 1;
    loop {
        let name = match ext {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        };
        let candidate = dir.join(name);
        if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standalone_has_no_tab() {
        assert_eq!(StandaloneCapabilities.active_tab_url(), TabQuery::Unsupported);
    }

    #[test]
    fn test_hosted_reports_tab() {
        let host = HostedCapabilities::new(
            Some("https://youtu.be/abc123".to_string()),
            PathBuf::from("."),
        );
        assert_eq!(
            host.active_tab_url(),
            TabQuery::Url("https://youtu.be/abc123".to_string())
        );

        let host = HostedCapabilities::new(None, PathBuf::from("."));
        assert_eq!(host.active_tab_url(), TabQuery::NoActiveTab);
    }

    #[tokio::test]
    async fn test_hosted_destination_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let host = HostedCapabilities::new(None, dir.path().to_path_buf());

        let first = host.save_destination("clip.mp4").await.unwrap().unwrap();
        assert_eq!(first, dir.path().join("clip.mp4"));

        std::fs::write(&first, b"x").unwrap();
        let second = host.save_destination("clip.mp4").await.unwrap().unwrap();
        assert_eq!(second, dir.path().join("clip (1).mp4"));

        std::fs::write(&second, b"x").unwrap();
        let third = host.save_destination("clip.mp4").await.unwrap().unwrap();
        assert_eq!(third, dir.path().join("clip (2).mp4"));
    }

    #[tokio::test]
    async fn test_hosted_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested").join("downloads");
        let host = HostedCapabilities::new(None, nested.clone());

        let path = host.save_destination("a.webm").await.unwrap().unwrap();
        assert!(nested.is_dir());
        assert_eq!(path, nested.join("a.webm"));
    }
}
