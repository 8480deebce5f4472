#[cfg(test)]
mod tests;

use crate::catalog::{CatalogGateway, Credential};
use crate::error::CacheError;
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

/// Downloads product images once and serves them from local storage after.
///
/// Files land as `{images_dir}/{image_id}.{ext}` with the extension taken
/// from the remote URL path, never from the content-type. A per-image lock
/// plus a write-then-rename keeps concurrent callers from racing the same
/// download or observing a half-written file.
pub struct AssetCache {
    dir: PathBuf,
    gateway: Arc<CatalogGateway>,
    client: reqwest::Client,
    downloads: DashMap<String, Arc<Mutex<()>>>,
}

impl AssetCache {
    pub fn new(dir: impl Into<PathBuf>, gateway: Arc<CatalogGateway>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            gateway,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            downloads: DashMap::new(),
        })
    }

    /// Ensure a local copy of the image exists and return its path.
    ///
    /// A cache hit performs no remote calls at all. On a miss, the file
    /// metadata endpoint resolves the download URL, the bytes are written to
    /// a `.part` sibling and renamed into place.
    pub async fn ensure_local(
        &self,
        credential: &Credential,
        image_id: &str,
    ) -> Result<PathBuf, CacheError> {
        if let Some(path) = self.lookup(image_id)? {
            return Ok(path);
        }

        let lock = self
            .downloads
            .entry(image_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // A concurrent caller may have completed the download while we
        // waited for the lock.
        if let Some(path) = self.lookup(image_id)? {
            return Ok(path);
        }

        let href = self.gateway.image_url(credential, image_id).await?;
        let ext = extension_from_url(&href);
        let path = self.dir.join(format!("{image_id}.{ext}"));

        let resp = self.client.get(href.as_str()).send().await?;
        if !resp.status().is_success() {
            return Err(CacheError::Download(resp.status().as_u16()));
        }
        let bytes = resp.bytes().await?;

        let partial = self.dir.join(format!("{image_id}.part"));
        tokio::fs::write(&partial, &bytes).await?;
        tokio::fs::rename(&partial, &path).await?;

        tracing::debug!(image_id, path = %path.display(), "cached product image");
        Ok(path)
    }

    /// Find an already-cached file whose stem matches the image id.
    fn lookup(&self, image_id: &str) -> Result<Option<PathBuf>, CacheError> {
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "part") {
                continue;
            }
            if path.file_stem().and_then(|s| s.to_str()) == Some(image_id) {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }
}

/// Extension from the final URL path segment; `bin` when there is none.
fn extension_from_url(href: &str) -> String {
    Url::parse(href)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext.to_string()))
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string())
}
