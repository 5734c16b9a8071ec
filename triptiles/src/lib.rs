//! Triptiles resolves map tiles for the review of recorded trips. A trip may come with a
//! pre-downloaded (offline) tile set; the map view then renders the trip either from that set or
//! from a public slippy-map tile server, depending on what the user prefers and on what is
//! actually available.
//!
//! # Quick start
//!
//! ```no_run
//! use triptiles::{MapSourcePreference, TileIndex, TileSourceBuilder};
//!
//! # tokio_test::block_on(async {
//! let controller = TileSourceBuilder::new_file_store("./offline_tiles").build()?;
//! controller.select_trip(Some("42".into())).await;
//!
//! let slot = controller.adapter().request_tile(TileIndex::new(8716, 5823, 14), |image| {
//!     println!("tile ready: {:?}", image.origin());
//! });
//! # Ok::<(), triptiles::error::TileSourceError>(())
//! # });
//! ```
//!
//! # Main components
//!
//! * [`resolve_source`] is the pure rule that turns a [`MapSourcePreference`] and the offline
//!   availability of the trip into the [`ResolvedSource`] in use.
//! * [`AvailabilityProber`](probe::AvailabilityProber) asks the
//!   [`OfflineTileStore`](offline::OfflineTileStore) whether a trip has offline tiles. Probes
//!   are numbered, so a late answer for a trip the user already left is discarded.
//! * [`TileResolver`](resolver::TileResolver) is the per-tile strategy: offline tile, templated
//!   online server with one retry on another subdomain, fallback host, transparent placeholder.
//! * [`TileRenderAdapter`](adapter::TileRenderAdapter) is what a map library talks to. It returns
//!   a tile slot immediately, resolves the tile in the background and calls the completion
//!   callback exactly once. Its resolver is swapped in place when the source changes.
//! * [`TileSourceController`](controller::TileSourceController) ties these together for a map
//!   view and persists the preference through a [`PreferenceStore`](preference::PreferenceStore).
//!
//! Tile requests never fail. The worst outcome of a request is a transparent tile.

pub mod adapter;
pub(crate) mod async_runtime;
mod builder;
pub mod config;
pub mod controller;
pub mod error;
mod messenger;
pub mod offline;
pub mod platform;
pub mod preference;
pub mod probe;
pub mod resolver;
mod source;
pub mod tile_image;
mod tile_index;
mod trip;
pub mod url_source;

#[cfg(test)]
mod tests;

pub use adapter::{TileRenderAdapter, TileSlot};
pub use builder::TileSourceBuilder;
pub use controller::TileSourceController;
pub use messenger::{DummyMessenger, Messenger};
pub use source::{resolve_source, MapSourcePreference, ResolvedSource};
pub use tile_image::{TileImage, TileOrigin};
pub use tile_index::TileIndex;
pub use trip::TripId;
