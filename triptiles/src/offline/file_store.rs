use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;

use super::OfflineTileStore;
use crate::error::TileSourceError;
use crate::tile_index::TileIndex;
use crate::trip::TripId;

/// Offline tile sets stored as files, one folder per trip: `<root>/<trip>/<z>/<x>/<y>.png`.
///
/// Tile urls are returned with the `file://` scheme.
#[derive(Debug, Clone)]
pub struct FileOfflineStore {
    folder_path: PathBuf,
}

impl FileOfflineStore {
    /// Creates a new store over the given folder. The folder does not have to exist, in which case
    /// no trip has offline tiles.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            folder_path: path.as_ref().into(),
        }
    }

    fn trip_folder(&self, trip: &TripId) -> Result<PathBuf, TileSourceError> {
        let name = trip.as_str();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(TileSourceError::Generic(format!(
                "trip id {name:?} cannot be used as a folder name"
            )));
        }

        Ok(self.folder_path.join(name))
    }

    fn tile_path(&self, trip: &TripId, index: TileIndex) -> Result<PathBuf, TileSourceError> {
        Ok(self
            .trip_folder(trip)?
            .join(index.z.to_string())
            .join(index.x.to_string())
            .join(format!("{}.png", index.y)))
    }
}

#[async_trait]
impl OfflineTileStore for FileOfflineStore {
    async fn has_offline_map_for_trip(&self, trip: &TripId) -> Result<bool, TileSourceError> {
        let folder = self.trip_folder(trip)?;
        let mut entries = match tokio::fs::read_dir(&folder).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("No offline tile folder for trip {trip} at {folder:?}");
                return Ok(false);
            }
            Err(err) => return Err(err.into()),
        };

        Ok(entries.next_entry().await?.is_some())
    }

    async fn tile_url(
        &self,
        trip: &TripId,
        index: TileIndex,
    ) -> Result<Option<String>, TileSourceError> {
        let path = self.tile_path(trip, index)?;
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }

        let path = tokio::fs::canonicalize(&path).await?;
        Ok(Some(format!("file://{}", path.display())))
    }
}
