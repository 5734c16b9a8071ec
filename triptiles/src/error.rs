//! Error types used by the crate.

use std::time::Duration;

use thiserror::Error;

/// Error type of the fallible operations of the crate.
///
/// Tile requests themselves never fail: the render adapter absorbs every error and completes with
/// a placeholder image. This type is returned by the collaborators (offline stores, image loaders,
/// preference stores) and by the builder.
#[derive(Debug, Error)]
pub enum TileSourceError {
    /// I/O error (network or file)
    #[error("failed to load data")]
    IO,
    /// Item not found.
    #[error("item not found")]
    NotFound,
    /// Operation did not complete in time.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    /// Tile url template could not be substituted.
    #[error("invalid tile url template: {0}")]
    UrlTemplate(String),
    /// Loaded content is not an image.
    #[error("loaded content is not an image")]
    NotAnImage,
    /// Generic error - details are inside.
    #[error("{0}")]
    Generic(String),
    /// Error reading/writing data to the FS.
    #[error("failed to read file")]
    FsIo(#[from] std::io::Error),
    /// Error (de)serializing configuration or persisted values.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for TileSourceError {
    fn from(value: reqwest::Error) -> Self {
        log::debug!("Http request failed: {value}");
        Self::IO
    }
}

impl From<strfmt::FmtError> for TileSourceError {
    fn from(value: strfmt::FmtError) -> Self {
        Self::UrlTemplate(value.to_string())
    }
}
