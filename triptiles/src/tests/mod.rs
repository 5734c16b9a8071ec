use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::TileSourceError;
use crate::messenger::Messenger;
use crate::offline::OfflineTileStore;
use crate::platform::ImageLoader;
use crate::source::ResolvedSource;
use crate::tile_image::TileImage;
use crate::tile_index::TileIndex;
use crate::trip::TripId;

/// Creates an empty folder under the system temp dir, unique for the test and the process.
pub fn temp_folder(name: &str) -> PathBuf {
    let path = std::env::temp_dir()
        .join("triptiles-tests")
        .join(format!("{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&path);
    std::fs::create_dir_all(&path).expect("failed to create test folder");
    path
}

/// Valid PNG data.
pub fn png_bytes() -> Bytes {
    TileImage::placeholder().bytes().clone()
}

#[derive(Default)]
pub struct TestOfflineStore {
    trips: HashMap<TripId, (bool, Duration)>,
    tiles: HashMap<(TripId, TileIndex), String>,
    failing_trips: HashSet<TripId>,
    tile_delay: Duration,
    pub panic_on_tile_lookup: AtomicBool,
    pub availability_calls: AtomicUsize,
    pub tile_calls: AtomicUsize,
}

impl TestOfflineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trip(mut self, trip: impl Into<TripId>, available: bool, delay: Duration) -> Self {
        self.trips.insert(trip.into(), (available, delay));
        self
    }

    pub fn with_failing_trip(mut self, trip: impl Into<TripId>) -> Self {
        self.failing_trips.insert(trip.into());
        self
    }

    pub fn with_tile(mut self, trip: impl Into<TripId>, index: TileIndex, url: &str) -> Self {
        self.tiles.insert((trip.into(), index), url.to_string());
        self
    }

    /// Delays every offline tile lookup.
    pub fn with_tile_delay(mut self, delay: Duration) -> Self {
        self.tile_delay = delay;
        self
    }

    pub fn panicking(self) -> Self {
        self.panic_on_tile_lookup.store(true, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl OfflineTileStore for TestOfflineStore {
    async fn has_offline_map_for_trip(&self, trip: &TripId) -> Result<bool, TileSourceError> {
        self.availability_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_trips.contains(trip) {
            return Err(TileSourceError::IO);
        }

        let Some((available, delay)) = self.trips.get(trip).copied() else {
            return Ok(false);
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        Ok(available)
    }

    async fn tile_url(
        &self,
        trip: &TripId,
        index: TileIndex,
    ) -> Result<Option<String>, TileSourceError> {
        self.tile_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_tile_lookup.load(Ordering::SeqCst) {
            panic!("offline lookup failed for {trip} {index}");
        }
        if !self.tile_delay.is_zero() {
            tokio::time::sleep(self.tile_delay).await;
        }

        Ok(self.tiles.get(&(trip.clone(), index)).cloned())
    }
}

/// Image loader serving fixed responses. Urls without a response fail to load.
#[derive(Default)]
pub struct TestImageLoader {
    responses: HashMap<String, Bytes>,
    serve_everything: Option<Bytes>,
    failing_prefixes: Vec<String>,
    pub calls: Mutex<Vec<String>>,
}

impl TestImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader that returns a valid PNG for every url.
    pub fn serving_png() -> Self {
        Self {
            serve_everything: Some(png_bytes()),
            ..Default::default()
        }
    }

    pub fn with_response(mut self, url: &str, data: Bytes) -> Self {
        self.responses.insert(url.to_string(), data);
        self
    }

    pub fn failing(mut self, prefix: &str) -> Self {
        self.failing_prefixes.push(prefix.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ImageLoader for TestImageLoader {
    async fn load_bytes_from_url(&self, url: &str) -> Result<Bytes, TileSourceError> {
        self.calls.lock().push(url.to_string());
        if self
            .failing_prefixes
            .iter()
            .any(|prefix| url.starts_with(prefix))
        {
            return Err(TileSourceError::IO);
        }

        if let Some(data) = self.responses.get(url) {
            return Ok(data.clone());
        }

        self.serve_everything
            .clone()
            .ok_or(TileSourceError::NotFound)
    }
}

#[derive(Default)]
pub struct RecordingMessenger {
    pub redraws: AtomicUsize,
    pub sources: Mutex<Vec<ResolvedSource>>,
    pub announced: Mutex<Vec<TripId>>,
}

impl Messenger for RecordingMessenger {
    fn request_redraw(&self) {
        self.redraws.fetch_add(1, Ordering::SeqCst);
    }

    fn source_changed(&self, source: ResolvedSource) {
        self.sources.lock().push(source);
    }

    fn offline_tiles_available(&self, trip: &TripId) {
        self.announced.lock().push(trip.clone());
    }
}
