//! Online tile urls: the templated tile server with subdomain load balancing and the hardcoded
//! fallback host.

use std::collections::HashMap;

use crate::error::TileSourceError;
use crate::tile_index::TileIndex;

/// Default url template of the online tile server.
pub const DEFAULT_URL_TEMPLATE: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Subdomains the requests are spread over by default.
pub const DEFAULT_SUBDOMAINS: [&str; 3] = ["a", "b", "c"];

/// Public tile host used when the templated url cannot be used.
pub const FALLBACK_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Source of online tile urls.
///
/// `attempt` is `0` for the first request of a tile and `1` for the retry, so that implementations
/// can direct the retry to a different host.
pub trait OnlineUrlSource: Send + Sync {
    /// Returns the url of the tile for the given attempt.
    fn tile_url(&self, index: TileIndex, attempt: u32) -> Result<String, TileSourceError>;
}

impl<T> OnlineUrlSource for T
where
    T: Fn(TileIndex, u32) -> Result<String, TileSourceError> + Send + Sync,
{
    fn tile_url(&self, index: TileIndex, attempt: u32) -> Result<String, TileSourceError> {
        self(index, attempt)
    }
}

/// Position of the subdomain to use for the tile in a list of `count` subdomains.
///
/// Deterministic for a given tile: `(x + y + attempt) % count`.
pub fn subdomain_position(index: TileIndex, attempt: u32, count: usize) -> usize {
    if count == 0 {
        return 0;
    }

    let sum = u64::from(index.x) + u64::from(index.y) + u64::from(attempt);
    (sum % count as u64) as usize
}

/// Url source that substitutes `{s}`, `{z}`, `{x}` and `{y}` placeholders of a template.
///
/// ```
/// use triptiles::url_source::{OnlineUrlSource, TemplateUrlSource};
/// use triptiles::TileIndex;
///
/// let source = TemplateUrlSource::osm();
/// let url = source.tile_url(TileIndex::new(1, 1, 3), 0)?;
/// assert_eq!(url, "https://c.tile.openstreetmap.org/3/1/1.png");
/// # Ok::<(), triptiles::error::TileSourceError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TemplateUrlSource {
    template: String,
    subdomains: Vec<String>,
}

impl TemplateUrlSource {
    /// Creates a new source.
    pub fn new(template: impl Into<String>, subdomains: Vec<String>) -> Self {
        Self {
            template: template.into(),
            subdomains,
        }
    }

    /// OpenStreetMap tile servers `a`, `b` and `c`.
    pub fn osm() -> Self {
        Self::new(
            DEFAULT_URL_TEMPLATE,
            DEFAULT_SUBDOMAINS.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Subdomain used for the given tile and attempt, if the source has any subdomains.
    pub fn subdomain(&self, index: TileIndex, attempt: u32) -> Option<&str> {
        let position = subdomain_position(index, attempt, self.subdomains.len());
        self.subdomains.get(position).map(String::as_str)
    }
}

impl Default for TemplateUrlSource {
    fn default() -> Self {
        Self::osm()
    }
}

impl OnlineUrlSource for TemplateUrlSource {
    fn tile_url(&self, index: TileIndex, attempt: u32) -> Result<String, TileSourceError> {
        let mut vars = HashMap::with_capacity(4);
        if let Some(subdomain) = self.subdomain(index, attempt) {
            vars.insert("s".to_string(), subdomain.to_string());
        }
        vars.insert("z".to_string(), index.z.to_string());
        vars.insert("x".to_string(), index.x.to_string());
        vars.insert("y".to_string(), index.y.to_string());

        Ok(strfmt::strfmt(&self.template, &vars)?)
    }
}

/// Substitutes the tile index into the fallback host pattern.
///
/// Plain text replacement, so that the fallback keeps working even if the templating of the
/// primary source is broken.
pub fn fallback_tile_url(pattern: &str, index: TileIndex) -> String {
    pattern
        .replace("{z}", &index.z.to_string())
        .replace("{x}", &index.x.to_string())
        .replace("{y}", &index.y.to_string())
}
