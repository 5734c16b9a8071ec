//! Native implementation of the [`ImageLoader`](super::ImageLoader).

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use log::info;
use quick_cache::sync::Cache;

use crate::error::TileSourceError;
use crate::platform::ImageLoader;
use crate::tile_image::is_image;

/// Default capacity of the in-memory tile cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 2000;

/// Loads `http(s)://` urls with a `reqwest` client and `file://` urls from the file system.
///
/// Recently loaded tiles are kept in memory, so swapping the tile source back and forth does not
/// download the same tiles again. Only image data is cached: an error page returned with a success
/// status is handed to the caller but requested again next time.
pub struct NativeImageLoader {
    http_client: reqwest::Client,
    cache: Cache<String, Bytes>,
}

impl std::fmt::Debug for NativeImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeImageLoader")
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl NativeImageLoader {
    /// Creates a new loader.
    pub fn new(
        user_agent: &str,
        request_timeout: Duration,
        cache_capacity: usize,
    ) -> Result<Self, TileSourceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            http_client,
            cache: Cache::new(cache_capacity.max(1)),
        })
    }

    async fn load_from_web(&self, url: &str) -> Result<Bytes, TileSourceError> {
        info!("Loading {url}");
        let response = self.http_client.get(url).send().await?;
        if !response.status().is_success() {
            info!("Failed to load {url}: {}", response.status());
            return Err(TileSourceError::IO);
        }

        Ok(response.bytes().await?)
    }

    async fn load_from_file(&self, path: &str) -> Result<Bytes, TileSourceError> {
        match tokio::fs::read(path).await {
            Ok(data) => Ok(data.into()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(TileSourceError::NotFound),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl ImageLoader for NativeImageLoader {
    async fn load_bytes_from_url(&self, url: &str) -> Result<Bytes, TileSourceError> {
        if let Some(data) = self.cache.get(url) {
            return Ok(data);
        }

        let data = if let Some(path) = url.strip_prefix("file://") {
            self.load_from_file(path).await?
        } else if url.starts_with("http://") || url.starts_with("https://") {
            self.load_from_web(url).await?
        } else {
            return Err(TileSourceError::Generic(format!(
                "unsupported url scheme: {url}"
            )));
        };

        if is_image(&data) {
            self.cache.insert(url.to_string(), data.clone());
        }

        Ok(data)
    }
}
