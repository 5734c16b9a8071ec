//! Per-tile resolution strategy.
//!
//! [`TileResolver`] knows nothing about the map library. It takes a [`TileIndex`] and produces a
//! [`TileImage`], trying the offline tile set of the trip, the templated online server, the
//! fallback host and finally the placeholder.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::async_runtime::run_guarded;
use crate::error::TileSourceError;
use crate::offline::OfflineTileStore;
use crate::platform::ImageLoader;
use crate::source::ResolvedSource;
use crate::tile_image::{is_image, TileImage, TileOrigin};
use crate::tile_index::TileIndex;
use crate::trip::TripId;
use crate::url_source::{fallback_tile_url, OnlineUrlSource, FALLBACK_TILE_URL};

/// Default time limit of a single offline tile lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_millis(2500);

/// Default number of non-image responses after which a warning is raised.
pub const DEFAULT_NON_IMAGE_THRESHOLD: usize = 3;

/// Number of requests to the templated online source before giving up on it.
const ONLINE_ATTEMPTS: u32 = 2;

/// Counts responses that turned out not to be images.
#[derive(Debug)]
pub struct TileDiagnostics {
    non_image_count: AtomicUsize,
    threshold: usize,
    warned: AtomicBool,
}

impl TileDiagnostics {
    fn new(threshold: usize) -> Self {
        Self {
            non_image_count: AtomicUsize::new(0),
            threshold,
            warned: AtomicBool::new(false),
        }
    }

    fn record_non_image(&self, url: &str) {
        let count = self.non_image_count.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!("Content of {url} is not an image");

        let reached = self.threshold > 0 && count >= self.threshold;
        if reached && !self.warned.swap(true, Ordering::SeqCst) {
            log::warn!(
                "Tile sources returned non-image content {count} times, tiles are rendered with \
                 placeholders. Check the tile server configuration."
            );
        }
    }

    /// Number of loaded responses that were not images.
    pub fn non_image_count(&self) -> usize {
        self.non_image_count.load(Ordering::SeqCst)
    }

    /// Returns true once non-image content was received repeatedly.
    pub fn placeholder_warning(&self) -> bool {
        self.threshold > 0 && self.non_image_count() >= self.threshold
    }
}

/// Strategy turning tile indices into tile images.
///
/// Cheap to clone. [`TileResolver::with_source`] produces a resolver for another source or trip
/// that shares collaborators and diagnostics with this one.
#[derive(Clone)]
pub struct TileResolver {
    source: ResolvedSource,
    trip: Option<TripId>,
    offline_store: Arc<dyn OfflineTileStore>,
    url_source: Arc<dyn OnlineUrlSource>,
    loader: Arc<dyn ImageLoader>,
    fallback_url: Arc<str>,
    lookup_timeout: Duration,
    diagnostics: Arc<TileDiagnostics>,
}

impl std::fmt::Debug for TileResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileResolver")
            .field("source", &self.source)
            .field("trip", &self.trip)
            .field("fallback_url", &self.fallback_url)
            .field("lookup_timeout", &self.lookup_timeout)
            .finish()
    }
}

impl TileResolver {
    /// Creates a resolver using the online source and no trip.
    pub fn new(
        offline_store: Arc<dyn OfflineTileStore>,
        url_source: Arc<dyn OnlineUrlSource>,
        loader: Arc<dyn ImageLoader>,
    ) -> Self {
        Self {
            source: ResolvedSource::Online,
            trip: None,
            offline_store,
            url_source,
            loader,
            fallback_url: FALLBACK_TILE_URL.into(),
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            diagnostics: Arc::new(TileDiagnostics::new(DEFAULT_NON_IMAGE_THRESHOLD)),
        }
    }

    /// Sets the `{z}/{x}/{y}` pattern of the fallback host.
    pub fn with_fallback_url(mut self, pattern: &str) -> Self {
        self.fallback_url = pattern.into();
        self
    }

    /// Sets the time limit of offline tile lookups.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Sets the number of non-image responses that triggers the placeholder warning. `0` disables
    /// the warning.
    pub fn with_non_image_threshold(mut self, threshold: usize) -> Self {
        self.diagnostics = Arc::new(TileDiagnostics::new(threshold));
        self
    }

    /// Returns a resolver for the given source and trip.
    pub fn with_source(&self, source: ResolvedSource, trip: Option<TripId>) -> Self {
        Self {
            source,
            trip,
            ..self.clone()
        }
    }

    /// Source the resolver uses.
    pub fn source(&self) -> ResolvedSource {
        self.source
    }

    /// Trip whose offline tile set is consulted.
    pub fn trip(&self) -> Option<&TripId> {
        self.trip.as_ref()
    }

    /// Non-image content statistics.
    pub fn diagnostics(&self) -> &TileDiagnostics {
        &self.diagnostics
    }

    /// Resolves and loads the image of the tile.
    ///
    /// Never fails: if no source yields an image, the placeholder is returned.
    pub async fn resolve(&self, index: TileIndex) -> TileImage {
        let mut online_origin = TileOrigin::Online;

        if self.source == ResolvedSource::Offline {
            if let Some(trip) = &self.trip {
                if let Some(image) = self.load_offline(trip, index).await {
                    return image;
                }

                online_origin = TileOrigin::OfflineMissFallback;
            }
        }

        if let Some(image) = self.load_online(index, online_origin).await {
            return image;
        }

        let url = fallback_tile_url(&self.fallback_url, index);
        match self.load(&url).await {
            Ok(bytes) => return TileImage::new(TileOrigin::FallbackHost, url, bytes),
            Err(err) => log::warn!("Failed to load tile {index} from fallback host: {err}"),
        }

        TileImage::placeholder()
    }

    async fn load_offline(&self, trip: &TripId, index: TileIndex) -> Option<TileImage> {
        let store = self.offline_store.clone();
        let owned_trip = trip.clone();
        let lookup = run_guarded(self.lookup_timeout, async move {
            store.tile_url(&owned_trip, index).await
        })
        .await;

        let url = match lookup {
            Ok(Some(url)) => url,
            Ok(None) => {
                log::debug!("Tile {index} is not in the offline set of trip {trip}");
                return None;
            }
            Err(err) => {
                log::warn!("Offline lookup of tile {index} for trip {trip} failed: {err}");
                return None;
            }
        };

        match self.load(&url).await {
            Ok(bytes) => Some(TileImage::new(TileOrigin::Offline, url, bytes)),
            Err(err) => {
                log::warn!("Failed to load offline tile {url}: {err}");
                None
            }
        }
    }

    async fn load_online(&self, index: TileIndex, origin: TileOrigin) -> Option<TileImage> {
        for attempt in 0..ONLINE_ATTEMPTS {
            let url = match self.url_source.tile_url(index, attempt) {
                Ok(url) => url,
                Err(err) => {
                    log::warn!("Failed to build online url for tile {index}: {err}");
                    return None;
                }
            };

            match self.load(&url).await {
                Ok(bytes) => return Some(TileImage::new(origin, url, bytes)),
                Err(err) => log::debug!("Failed to load {url} (attempt {attempt}): {err}"),
            }
        }

        None
    }

    async fn load(&self, url: &str) -> Result<Bytes, TileSourceError> {
        let bytes = self.loader.load_bytes_from_url(url).await?;
        if !is_image(&bytes) {
            self.diagnostics.record_non_image(url);
            return Err(TileSourceError::NotAnImage);
        }

        Ok(bytes)
    }
}
