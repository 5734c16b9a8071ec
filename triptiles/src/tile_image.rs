//! Loaded tile images and the placeholder used when nothing could be loaded.

use std::sync::LazyLock;

use base64::Engine;
use bytes::Bytes;
use image::ImageFormat;

/// 1x1 transparent PNG.
const PLACEHOLDER_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

static PLACEHOLDER: LazyLock<Bytes> = LazyLock::new(|| {
    match base64::engine::general_purpose::STANDARD.decode(PLACEHOLDER_PNG_BASE64) {
        Ok(bytes) => bytes.into(),
        Err(err) => {
            log::error!("Failed to decode embedded placeholder tile: {err}");
            Bytes::new()
        }
    }
});

/// How the image of a tile was obtained.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TileOrigin {
    /// Offline tile set of the trip.
    Offline,
    /// Templated online tile server.
    Online,
    /// Online tile server, after the offline tile set had no usable tile.
    OfflineMissFallback,
    /// Hardcoded public tile host.
    FallbackHost,
    /// Embedded transparent placeholder.
    Placeholder,
}

/// Encoded image of a single tile, ready to be handed to the renderer.
#[derive(Debug, Clone)]
pub struct TileImage {
    origin: TileOrigin,
    url: Option<String>,
    bytes: Bytes,
}

impl TileImage {
    /// Creates a tile image loaded from `url`.
    pub fn new(origin: TileOrigin, url: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            origin,
            url: Some(url.into()),
            bytes,
        }
    }

    /// The transparent 1x1 placeholder.
    pub fn placeholder() -> Self {
        Self {
            origin: TileOrigin::Placeholder,
            url: None,
            bytes: PLACEHOLDER.clone(),
        }
    }

    /// How the image was obtained.
    pub fn origin(&self) -> TileOrigin {
        self.origin
    }

    /// Url the image was loaded from. `None` for the placeholder.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Encoded image data.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Returns true if this is the placeholder image.
    pub fn is_placeholder(&self) -> bool {
        self.origin == TileOrigin::Placeholder
    }

    /// Image format guessed from the data.
    pub fn format(&self) -> Option<ImageFormat> {
        image::guess_format(&self.bytes).ok()
    }
}

/// Checks whether the data starts with the signature of a known image format.
pub fn is_image(data: &[u8]) -> bool {
    image::guess_format(data).is_ok()
}
