//! Published snapshot shared between processes.
//!
//! A periodic job writes the snapshot to a file (or serves it over HTTP) so
//! that many readers can share one upstream fetch.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client as HttpClient, Url};

use super::CacheSnapshot;
use crate::error::CacheError;

/// Where the published snapshot lives
#[derive(Debug, Clone, PartialEq)]
pub enum PublishedSource {
    /// Local file, readable and writable
    File(PathBuf),
    /// Read-only HTTP location
    Url(Url),
}

impl PublishedSource {
    /// `http://` and `https://` locations are URLs; anything else is a path.
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            if let Ok(url) = Url::parse(location) {
                return PublishedSource::Url(url);
            }
        }
        PublishedSource::File(PathBuf::from(location))
    }
}

impl std::fmt::Display for PublishedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishedSource::File(path) => write!(f, "{}", path.display()),
            PublishedSource::Url(url) => write!(f, "{}", url),
        }
    }
}

/// Reader/writer for the published snapshot
#[derive(Debug, Clone)]
pub struct PublishedSnapshot {
    source: PublishedSource,
    http: HttpClient,
}

impl PublishedSnapshot {
    pub fn new(source: PublishedSource) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { source, http }
    }

    pub fn source(&self) -> &PublishedSource {
        &self.source
    }

    /// Read the published snapshot, fresh or not.
    ///
    /// `Ok(None)` when nothing has been published yet; an unreadable or
    /// malformed payload is an error the caller treats as a miss.
    pub async fn load(&self) -> Result<Option<CacheSnapshot>, CacheError> {
        match &self.source {
            PublishedSource::File(path) => match tokio::fs::read(path).await {
                Ok(bytes) => CacheSnapshot::from_json(&bytes).map(Some),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(CacheError::Io(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                ))),
            },
            PublishedSource::Url(url) => {
                let response = self
                    .http
                    .get(url.clone())
                    .header("Cache-Control", "no-cache")
                    .send()
                    .await
                    .map_err(|e| CacheError::Io(format!("Failed to fetch {}: {}", url, e)))?;

                if !response.status().is_success() {
                    log::debug!("Published snapshot {} returned {}", url, response.status());
                    return Ok(None);
                }

                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| CacheError::Io(format!("Failed to read {}: {}", url, e)))?;
                CacheSnapshot::from_json(&bytes).map(Some)
            }
        }
    }

    /// Replace the published snapshot.
    ///
    /// Returns `Ok(false)` for read-only (URL) sources. File writes go through
    /// a temporary file and a rename, so readers never see a partial payload.
    pub async fn publish(&self, snapshot: &CacheSnapshot) -> Result<bool, CacheError> {
        match &self.source {
            PublishedSource::File(path) => {
                write_atomically(path, snapshot).await?;
                Ok(true)
            }
            PublishedSource::Url(_) => Ok(false),
        }
    }
}

async fn write_atomically(path: &Path, snapshot: &CacheSnapshot) -> Result<(), CacheError> {
    let payload =
        serde_json::to_vec_pretty(snapshot).map_err(|e| CacheError::Corrupt(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CacheError::Io(format!("Failed to create {}: {}", parent.display(), e)))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, payload)
        .await
        .map_err(|e| CacheError::Io(format!("Failed to write {}: {}", tmp.display(), e)))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| CacheError::Io(format!("Failed to replace {}: {}", path.display(), e)))?;
    Ok(())
}
