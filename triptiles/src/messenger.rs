use crate::source::ResolvedSource;
use crate::trip::TripId;

/// Notifies the embedding map view about changes it should reflect.
pub trait Messenger: Send + Sync {
    /// A tile finished loading and the map should be redrawn.
    fn request_redraw(&self);

    /// The source in use changed. Used to update the on-screen source indicator.
    fn source_changed(&self, _source: ResolvedSource) {}

    /// Offline tiles became available for the trip for the first time.
    fn offline_tiles_available(&self, _trip: &TripId) {}
}

/// Messenger that ignores all notifications.
#[derive(Debug, Default, Copy, Clone)]
pub struct DummyMessenger;

impl Messenger for DummyMessenger {
    fn request_redraw(&self) {}
}
