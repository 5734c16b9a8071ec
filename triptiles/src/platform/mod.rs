//! Provides platform specific loading of tile images and the [`ImageLoader`] trait to access it.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TileSourceError;

pub mod native;

/// Default implementation of the [`ImageLoader`] for the current platform.
pub type ImageLoaderImpl = native::NativeImageLoader;

/// Loads encoded tile images by url.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    /// Loads a byte array from the given url.
    async fn load_bytes_from_url(&self, url: &str) -> Result<Bytes, TileSourceError>;
}
