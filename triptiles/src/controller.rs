//! Composition of prober, resolver and render adapter for a single map view.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use web_time::Instant;

use crate::adapter::TileRenderAdapter;
use crate::messenger::Messenger;
use crate::preference::{save_preference, PreferenceStore};
use crate::probe::{AvailabilityProber, ProbeOutcome};
use crate::source::{resolve_source, MapSourcePreference, ResolvedSource};
use crate::trip::TripId;

#[derive(Debug)]
struct OfflineNotice {
    trip: TripId,
    shown_at: Instant,
}

#[derive(Debug)]
struct ControllerState {
    preference: MapSourcePreference,
    trip: Option<TripId>,
    offline_available: bool,
    resolved: ResolvedSource,
    notice: Option<OfflineNotice>,
    /// Trips whose offline tiles were announced. Holds at most one entry per distinct trip that
    /// had offline tiles while this view was open, and is dropped with the controller.
    announced: HashSet<TripId>,
}

/// Tile source of a map view.
///
/// Holds the user preference, the selected trip and its offline availability, and keeps the
/// resolver of the [`TileRenderAdapter`] in line with them. Created with
/// [`TileSourceBuilder`](crate::TileSourceBuilder).
pub struct TileSourceController {
    prober: AvailabilityProber,
    adapter: Arc<TileRenderAdapter>,
    preferences: Arc<dyn PreferenceStore>,
    messenger: Option<Arc<dyn Messenger>>,
    notice_duration: Duration,
    state: Mutex<ControllerState>,
}

impl std::fmt::Debug for TileSourceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileSourceController")
            .field("prober", &self.prober)
            .field("adapter", &self.adapter)
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl TileSourceController {
    pub(crate) fn new(
        prober: AvailabilityProber,
        adapter: Arc<TileRenderAdapter>,
        preferences: Arc<dyn PreferenceStore>,
        messenger: Option<Arc<dyn Messenger>>,
        preference: MapSourcePreference,
        notice_duration: Duration,
    ) -> Self {
        Self {
            prober,
            adapter,
            preferences,
            messenger,
            notice_duration,
            state: Mutex::new(ControllerState {
                preference,
                trip: None,
                offline_available: false,
                resolved: ResolvedSource::Online,
                notice: None,
                announced: HashSet::new(),
            }),
        }
    }

    /// Adapter serving the tile requests of the map.
    pub fn adapter(&self) -> &Arc<TileRenderAdapter> {
        &self.adapter
    }

    /// Current map source preference.
    pub fn preference(&self) -> MapSourcePreference {
        self.state.lock().preference
    }

    /// Selected trip.
    pub fn current_trip(&self) -> Option<TripId> {
        self.state.lock().trip.clone()
    }

    /// Whether the selected trip has an offline tile set, as of the last completed probe.
    pub fn offline_available(&self) -> bool {
        self.state.lock().offline_available
    }

    /// Source currently used for tiles.
    pub fn resolved_source(&self) -> ResolvedSource {
        self.state.lock().resolved
    }

    /// Trip for which the "offline tiles available" notice is currently visible.
    pub fn offline_notice(&self) -> Option<TripId> {
        let state = self.state.lock();
        let notice = state.notice.as_ref()?;
        (notice.shown_at.elapsed() < self.notice_duration).then(|| notice.trip.clone())
    }

    /// Selects the trip and probes its offline availability.
    ///
    /// Until the probe completes, the trip is served from the online source. If another trip is
    /// selected before the probe completes, its result is discarded. Returns the source in use
    /// after the call.
    pub async fn select_trip(&self, trip: Option<TripId>) -> ResolvedSource {
        let changed = {
            let mut state = self.state.lock();
            if state.trip == trip {
                None
            } else {
                state.trip = trip;
                state.offline_available = false;
                state.notice = None;
                self.apply_source(&mut state)
            }
        };
        self.notify(changed, None);

        self.refresh().await
    }

    /// Changes and persists the map source preference, then probes availability again.
    ///
    /// Failing to persist the preference is logged and does not prevent the change.
    pub async fn set_preference(&self, preference: MapSourcePreference) -> ResolvedSource {
        if let Err(err) = save_preference(self.preferences.as_ref(), preference) {
            log::warn!("Failed to persist map source preference: {err}");
        }

        let changed = {
            let mut state = self.state.lock();
            state.preference = preference;
            self.apply_source(&mut state)
        };
        self.notify(changed, None);

        self.refresh().await
    }

    /// Probes the availability of the selected trip again and applies the result.
    pub async fn refresh(&self) -> ResolvedSource {
        let (ticket, trip) = {
            let state = self.state.lock();
            (self.prober.next_ticket(), state.trip.clone())
        };
        let outcome = self.prober.probe_with_ticket(ticket, trip.as_ref()).await;
        self.apply_probe(outcome)
    }

    /// Stops serving new tile requests.
    pub fn shutdown(&self) {
        self.adapter.shutdown();
    }

    fn apply_probe(&self, outcome: ProbeOutcome) -> ResolvedSource {
        let (resolved, changed, announced) = {
            let mut state = self.state.lock();
            if !self.prober.is_latest(outcome.ticket) || state.trip != outcome.trip {
                log::debug!(
                    "Discarding stale availability of trip {:?}: {}",
                    outcome.trip,
                    outcome.available
                );
                return state.resolved;
            }

            let became_available = outcome.available && !state.offline_available;
            state.offline_available = outcome.available;

            let announced = match outcome.trip {
                Some(trip) if became_available && state.announced.insert(trip.clone()) => {
                    log::info!("Offline tiles are available for trip {trip}");
                    state.notice = Some(OfflineNotice {
                        trip: trip.clone(),
                        shown_at: Instant::now(),
                    });
                    Some(trip)
                }
                _ => None,
            };

            let changed = self.apply_source(&mut state);
            (state.resolved, changed, announced)
        };

        self.notify(changed, announced.as_ref());
        resolved
    }

    /// Updates the resolver of the adapter. Returns the new source if it changed.
    fn apply_source(&self, state: &mut ControllerState) -> Option<ResolvedSource> {
        let resolved = resolve_source(state.preference, state.offline_available);
        let current = self.adapter.resolver();
        if current.source() != resolved || current.trip() != state.trip.as_ref() {
            self.adapter
                .set_resolver(current.with_source(resolved, state.trip.clone()));
        }

        if state.resolved == resolved {
            return None;
        }

        log::info!("Map source changed to {resolved}");
        state.resolved = resolved;
        Some(resolved)
    }

    fn notify(&self, changed: Option<ResolvedSource>, announced: Option<&TripId>) {
        let Some(messenger) = &self.messenger else {
            return;
        };

        if let Some(trip) = announced {
            messenger.offline_tiles_available(trip);
        }
        if let Some(source) = changed {
            messenger.source_changed(source);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::builder::TileSourceBuilder;
    use crate::config::TileSourceConfig;
    use crate::preference::{MemoryPreferenceStore, PREFERRED_MAP_SOURCE_KEY};
    use crate::tests::{RecordingMessenger, TestImageLoader, TestOfflineStore};
    use crate::tile_image::TileOrigin;
    use crate::tile_index::TileIndex;

    const OFFLINE_TILE: &str = "file:///tiles/with-tiles/3/1/1.png";

    struct Fixture {
        controller: TileSourceController,
        store: Arc<TestOfflineStore>,
        messenger: Arc<RecordingMessenger>,
        preferences: Arc<MemoryPreferenceStore>,
    }

    fn fixture(store: TestOfflineStore, preference: MapSourcePreference) -> Fixture {
        let store = Arc::new(store);
        let messenger = Arc::new(RecordingMessenger::default());
        let preferences = Arc::new(MemoryPreferenceStore::new());
        preferences
            .set(PREFERRED_MAP_SOURCE_KEY, preference.as_str())
            .expect("memory store never fails");

        let config = TileSourceConfig {
            notice_duration_ms: 200,
            offline_lookup_timeout_ms: 1000,
            ..Default::default()
        };
        let controller = TileSourceBuilder::new_shared(store.clone())
            .with_config(config)
            .with_image_loader(TestImageLoader::serving_png())
            .with_preference_store(preferences.clone())
            .with_messenger(messenger.clone())
            .build()
            .expect("controller should build");

        Fixture {
            controller,
            store,
            messenger,
            preferences,
        }
    }

    fn store_with_tiles() -> TestOfflineStore {
        TestOfflineStore::new()
            .with_trip("with-tiles", true, Duration::ZERO)
            .with_trip("without-tiles", false, Duration::ZERO)
            .with_tile("with-tiles", TileIndex::new(1, 1, 3), OFFLINE_TILE)
    }

    #[tokio::test]
    async fn starts_online_with_stored_preference() {
        let f = fixture(TestOfflineStore::new(), MapSourcePreference::Offline);
        assert_eq!(f.controller.preference(), MapSourcePreference::Offline);
        assert_eq!(f.controller.resolved_source(), ResolvedSource::Online);
        assert_eq!(f.controller.current_trip(), None);
    }

    #[tokio::test]
    async fn auto_with_offline_data_serves_offline_tiles() {
        let f = fixture(store_with_tiles(), MapSourcePreference::Auto);

        let resolved = f.controller.select_trip(Some("with-tiles".into())).await;
        assert_eq!(resolved, ResolvedSource::Offline);
        assert!(f.controller.offline_available());

        let adapter = f.controller.adapter();
        let hit = adapter.load_tile(TileIndex::new(1, 1, 3)).await;
        assert_eq!(hit.origin(), TileOrigin::Offline);
        assert_eq!(hit.url(), Some(OFFLINE_TILE));

        let miss = adapter.load_tile(TileIndex::new(2, 1, 3)).await;
        assert_eq!(miss.origin(), TileOrigin::OfflineMissFallback);
        assert_eq!(miss.url(), Some("https://a.tile.openstreetmap.org/3/2/1.png"));
    }

    #[tokio::test]
    async fn online_preference_never_looks_up_offline_tiles() {
        let f = fixture(store_with_tiles(), MapSourcePreference::Online);

        let resolved = f.controller.select_trip(Some("with-tiles".into())).await;
        assert_eq!(resolved, ResolvedSource::Online);
        assert!(f.controller.offline_available());

        let image = f.controller.adapter().load_tile(TileIndex::new(1, 1, 3)).await;
        assert_eq!(image.origin(), TileOrigin::Online);
        assert_eq!(f.store.tile_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn offline_preference_without_data_falls_back_to_online() {
        let f = fixture(store_with_tiles(), MapSourcePreference::Offline);

        let resolved = f.controller.select_trip(Some("without-tiles".into())).await;
        assert_eq!(resolved, ResolvedSource::Online);

        let image = f.controller.adapter().load_tile(TileIndex::new(1, 1, 3)).await;
        assert!(!image.bytes().is_empty());
        assert_eq!(image.origin(), TileOrigin::Online);
    }

    #[tokio::test]
    async fn probe_failure_is_unavailable() {
        let store = TestOfflineStore::new().with_failing_trip("broken");
        let f = fixture(store, MapSourcePreference::Auto);

        let resolved = f.controller.select_trip(Some("broken".into())).await;
        assert_eq!(resolved, ResolvedSource::Online);
        assert!(!f.controller.offline_available());
    }

    #[tokio::test]
    async fn stale_probe_does_not_overwrite_newer_trip() {
        let store = TestOfflineStore::new()
            .with_trip("slow-with-tiles", true, Duration::from_millis(300))
            .with_trip("fast-without-tiles", false, Duration::from_millis(10));
        let f = fixture(store, MapSourcePreference::Auto);

        let (first, second) = tokio::join!(
            f.controller.select_trip(Some("slow-with-tiles".into())),
            f.controller.select_trip(Some("fast-without-tiles".into())),
        );

        assert_eq!(second, ResolvedSource::Online);
        assert_eq!(first, ResolvedSource::Online);
        assert_eq!(f.controller.resolved_source(), ResolvedSource::Online);
        assert_eq!(
            f.controller.current_trip(),
            Some(TripId::from("fast-without-tiles"))
        );
        assert!(!f.controller.offline_available());
        assert_eq!(f.controller.adapter().resolver().source(), ResolvedSource::Online);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn parallel_trip_selection_settles_on_last_trip() {
        for _ in 0..20 {
            let f = fixture(store_with_tiles(), MapSourcePreference::Auto);
            let controller = Arc::new(f.controller);

            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let controller = controller.clone();
                    let trip = if i % 2 == 0 { "with-tiles" } else { "without-tiles" };
                    tokio::spawn(async move { controller.select_trip(Some(trip.into())).await })
                })
                .collect();
            for handle in handles {
                handle.await.expect("selection task panicked");
            }

            let has_tiles = controller.current_trip() == Some(TripId::from("with-tiles"));
            assert_eq!(controller.offline_available(), has_tiles);
            let expected = if has_tiles {
                ResolvedSource::Offline
            } else {
                ResolvedSource::Online
            };
            assert_eq!(controller.resolved_source(), expected);
            assert_eq!(controller.adapter().resolver().source(), expected);
        }
    }

    #[tokio::test]
    async fn switching_to_trip_without_tiles_leaves_offline_source() {
        let f = fixture(store_with_tiles(), MapSourcePreference::Auto);

        f.controller.select_trip(Some("with-tiles".into())).await;
        assert_eq!(f.controller.resolved_source(), ResolvedSource::Offline);

        f.controller.select_trip(Some("without-tiles".into())).await;
        assert_eq!(f.controller.resolved_source(), ResolvedSource::Online);
        assert_eq!(
            f.controller.adapter().resolver().trip(),
            Some(&TripId::from("without-tiles"))
        );
        assert_eq!(
            *f.messenger.sources.lock(),
            vec![ResolvedSource::Offline, ResolvedSource::Online]
        );
    }

    #[tokio::test]
    async fn deselecting_trip_goes_online_without_lookup() {
        let f = fixture(store_with_tiles(), MapSourcePreference::Auto);
        f.controller.select_trip(Some("with-tiles".into())).await;
        let calls = f.store.availability_calls.load(Ordering::SeqCst);

        let resolved = f.controller.select_trip(None).await;
        assert_eq!(resolved, ResolvedSource::Online);
        assert_eq!(f.store.availability_calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn preference_change_is_persisted_and_applied() {
        let f = fixture(store_with_tiles(), MapSourcePreference::Auto);
        f.controller.select_trip(Some("with-tiles".into())).await;
        assert_eq!(f.controller.resolved_source(), ResolvedSource::Offline);

        let resolved = f.controller.set_preference(MapSourcePreference::Online).await;
        assert_eq!(resolved, ResolvedSource::Online);
        assert_eq!(
            f.preferences.get(PREFERRED_MAP_SOURCE_KEY).as_deref(),
            Some("online")
        );

        let resolved = f.controller.set_preference(MapSourcePreference::Offline).await;
        assert_eq!(resolved, ResolvedSource::Offline);
    }

    #[tokio::test]
    async fn offline_notice_is_shown_once_per_trip_for_a_while() {
        let f = fixture(store_with_tiles(), MapSourcePreference::Auto);

        f.controller.select_trip(Some("with-tiles".into())).await;
        assert_eq!(
            f.controller.offline_notice(),
            Some(TripId::from("with-tiles"))
        );
        assert_eq!(*f.messenger.announced.lock(), vec![TripId::from("with-tiles")]);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(f.controller.offline_notice(), None);

        f.controller.refresh().await;
        f.controller.select_trip(Some("without-tiles".into())).await;
        f.controller.select_trip(Some("with-tiles".into())).await;
        assert_eq!(f.controller.offline_notice(), None);
        assert_eq!(f.messenger.announced.lock().len(), 1);
    }
}
