//! Integration point for map libraries.
//!
//! A map library asks for tiles by index and expects an image resource back immediately, which it
//! renders once it is populated. [`TileRenderAdapter::request_tile`] hands out a [`TileSlot`] right
//! away, resolves the tile in the background with the current [`TileResolver`] and calls the
//! completion callback exactly once.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;

use crate::messenger::Messenger;
use crate::resolver::TileResolver;
use crate::tile_image::TileImage;
use crate::tile_index::TileIndex;

#[derive(Debug)]
enum TileState {
    Loading,
    Ready(TileImage),
}

/// Image resource of a requested tile. Starts empty and is populated when the tile is resolved.
#[derive(Debug, Clone)]
pub struct TileSlot {
    index: TileIndex,
    state: Arc<Mutex<TileState>>,
}

impl TileSlot {
    fn loading(index: TileIndex) -> Self {
        Self {
            index,
            state: Arc::new(Mutex::new(TileState::Loading)),
        }
    }

    fn fill(&self, image: TileImage) {
        *self.state.lock() = TileState::Ready(image);
    }

    /// Index of the tile.
    pub fn index(&self) -> TileIndex {
        self.index
    }

    /// Returns true once the image is available.
    pub fn is_ready(&self) -> bool {
        matches!(*self.state.lock(), TileState::Ready(_))
    }

    /// Image of the tile, if already resolved.
    pub fn image(&self) -> Option<TileImage> {
        match &*self.state.lock() {
            TileState::Ready(image) => Some(image.clone()),
            TileState::Loading => None,
        }
    }
}

/// Serves tile requests of a map view with a swappable [`TileResolver`].
///
/// Changing the source or the trip replaces the resolver in place with
/// [`TileRenderAdapter::set_resolver`]. Requests that are already running finish with the resolver
/// they started with.
pub struct TileRenderAdapter {
    resolver: RwLock<Arc<TileResolver>>,
    messenger: Option<Arc<dyn Messenger>>,
    active: AtomicBool,
    in_flight: Arc<AtomicUsize>,
}

impl std::fmt::Debug for TileRenderAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileRenderAdapter")
            .field("resolver", &*self.resolver.read())
            .field("active", &self.active)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

impl TileRenderAdapter {
    /// Creates a new adapter.
    pub fn new(resolver: TileResolver, messenger: Option<Arc<dyn Messenger>>) -> Self {
        Self {
            resolver: RwLock::new(Arc::new(resolver)),
            messenger,
            active: AtomicBool::new(true),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Resolver used for new requests.
    pub fn resolver(&self) -> Arc<TileResolver> {
        self.resolver.read().clone()
    }

    /// Replaces the resolver used for new requests.
    pub fn set_resolver(&self, resolver: TileResolver) {
        log::debug!(
            "Switching tile resolver to {} source, trip {:?}",
            resolver.source(),
            resolver.trip()
        );
        *self.resolver.write() = Arc::new(resolver);
    }

    /// Requests the tile. Must be called inside a tokio runtime.
    ///
    /// Returns the slot of the tile immediately. `done` is called exactly once with the image the
    /// slot is populated with. If no source can provide the tile, or the resolution panics, the
    /// image is the transparent placeholder.
    pub fn request_tile<F>(&self, index: TileIndex, done: F) -> TileSlot
    where
        F: FnOnce(TileImage) + Send + 'static,
    {
        let slot = TileSlot::loading(index);

        if !self.is_active() {
            log::debug!("Tile {index} requested after shutdown");
            let image = TileImage::placeholder();
            slot.fill(image.clone());
            done(image);
            return slot;
        }

        let resolver = self.resolver();
        let messenger = self.messenger.clone();
        let in_flight = self.in_flight.clone();
        let tile_slot = slot.clone();

        in_flight.fetch_add(1, Ordering::SeqCst);
        crate::async_runtime::spawn(async move {
            let resolution = crate::async_runtime::spawn(async move {
                resolver.resolve(index).await
            });
            let image = match resolution.await {
                Ok(image) => image,
                Err(err) => {
                    log::error!("Resolution of tile {index} failed unexpectedly: {err}");
                    TileImage::placeholder()
                }
            };

            tile_slot.fill(image.clone());
            in_flight.fetch_sub(1, Ordering::SeqCst);
            if let Some(messenger) = messenger {
                messenger.request_redraw();
            }

            done(image);
        });

        slot
    }

    /// Requests the tile and waits for its image.
    pub async fn load_tile(&self, index: TileIndex) -> TileImage {
        let (sender, receiver) = oneshot::channel();
        self.request_tile(index, move |image| {
            let _ = sender.send(image);
        });

        receiver.await.unwrap_or_else(|_| TileImage::placeholder())
    }

    /// Stops serving new requests from tile sources. Requests made after this call complete with
    /// the placeholder immediately. Running requests are not aborted.
    pub fn shutdown(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Returns false after [`TileRenderAdapter::shutdown`].
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Number of requests that have not completed yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Returns true if tile sources repeatedly returned content that is not an image.
    pub fn placeholder_warning(&self) -> bool {
        self.resolver.read().diagnostics().placeholder_warning()
    }
}
