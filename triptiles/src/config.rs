//! Configuration of the tile source.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TileSourceError;
use crate::url_source::{DEFAULT_SUBDOMAINS, DEFAULT_URL_TEMPLATE, FALLBACK_TILE_URL};

/// Tunable parameters of the tile source. Every field has a default, so a partial JSON document
/// is a valid configuration.
///
/// ```
/// use triptiles::config::TileSourceConfig;
///
/// let config = TileSourceConfig::from_json(r#"{ "offline_lookup_timeout_ms": 1000 }"#)?;
/// assert_eq!(config.offline_lookup_timeout().as_millis(), 1000);
/// # Ok::<(), triptiles::error::TileSourceError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileSourceConfig {
    /// Url template of the online tile server with `{s}`, `{z}`, `{x}` and `{y}` placeholders.
    pub url_template: String,
    /// Subdomains substituted for `{s}`.
    pub subdomains: Vec<String>,
    /// `{z}/{x}/{y}` pattern of the host used when the templated server fails.
    pub fallback_url: String,
    /// Time limit of offline availability probes and offline tile lookups.
    pub offline_lookup_timeout_ms: u64,
    /// Time limit of a single http request.
    pub request_timeout_ms: u64,
    /// For how long the "offline tiles available" notice stays visible.
    pub notice_duration_ms: u64,
    /// Number of non-image responses after which the placeholder warning is raised. `0` disables
    /// the warning.
    pub non_image_warning_threshold: usize,
    /// Number of tiles kept in memory by the image loader.
    pub image_cache_capacity: usize,
    /// User agent of http requests.
    pub user_agent: String,
}

impl Default for TileSourceConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            subdomains: DEFAULT_SUBDOMAINS.iter().map(|s| s.to_string()).collect(),
            fallback_url: FALLBACK_TILE_URL.to_string(),
            offline_lookup_timeout_ms: 2500,
            request_timeout_ms: 10_000,
            notice_duration_ms: 5000,
            non_image_warning_threshold: 3,
            image_cache_capacity: crate::platform::native::DEFAULT_CACHE_CAPACITY,
            user_agent: concat!("triptiles/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl TileSourceConfig {
    /// Parses a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, TileSourceError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TileSourceError> {
        let data = std::fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Time limit of offline lookups.
    pub fn offline_lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.offline_lookup_timeout_ms)
    }

    /// Time limit of http requests.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Visibility duration of the offline notice.
    pub fn notice_duration(&self) -> Duration {
        Duration::from_millis(self.notice_duration_ms)
    }
}
