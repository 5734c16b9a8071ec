//! Offline tile sets of recorded trips.

use async_trait::async_trait;

use crate::error::TileSourceError;
use crate::tile_index::TileIndex;
use crate::trip::TripId;

mod file_store;
pub use file_store::FileOfflineStore;

/// Lookup of pre-downloaded tiles.
///
/// Every call is scoped by the trip explicitly, the store keeps no notion of a "current" trip.
#[async_trait]
pub trait OfflineTileStore: Send + Sync {
    /// Returns true if an offline tile set exists for the trip.
    async fn has_offline_map_for_trip(&self, trip: &TripId) -> Result<bool, TileSourceError>;

    /// Returns the url of the tile in the trip's offline tile set, or `None` if the set does not
    /// contain the tile.
    async fn tile_url(
        &self,
        trip: &TripId,
        index: TileIndex,
    ) -> Result<Option<String>, TileSourceError>;
}
