//! Asynchronous check whether a trip has an offline tile set.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::async_runtime::run_guarded;
use crate::offline::OfflineTileStore;
use crate::trip::TripId;

/// Sequence number of a probe request. Later requests have larger tickets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProbeTicket(u64);

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Ticket the probe was issued with.
    pub ticket: ProbeTicket,
    /// Probed trip.
    pub trip: Option<TripId>,
    /// Whether an offline tile set exists for the trip.
    pub available: bool,
}

/// Determines offline availability of trips.
///
/// Probing never fails: store errors, panics and timeouts are logged and reported as "not
/// available". Each call takes a new [`ProbeTicket`], and [`AvailabilityProber::is_latest`] tells
/// whether an outcome is still the most recent one, so that a slow probe for a previous trip can be
/// discarded.
pub struct AvailabilityProber {
    store: Arc<dyn OfflineTileStore>,
    timeout: Duration,
    latest: AtomicU64,
}

impl std::fmt::Debug for AvailabilityProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailabilityProber")
            .field("timeout", &self.timeout)
            .field("latest", &self.latest)
            .finish()
    }
}

impl AvailabilityProber {
    /// Creates a new prober.
    pub fn new(store: Arc<dyn OfflineTileStore>, timeout: Duration) -> Self {
        Self {
            store,
            timeout,
            latest: AtomicU64::new(0),
        }
    }

    /// Checks whether the trip has offline tiles. `None` resolves to `false` without querying the
    /// store.
    pub async fn probe(&self, trip: Option<&TripId>) -> ProbeOutcome {
        let ticket = self.next_ticket();
        self.probe_with_ticket(ticket, trip).await
    }

    /// Takes a new ticket, superseding every earlier one.
    ///
    /// Callers that choose the trip under their own lock take the ticket under the same lock, so
    /// that the order of tickets follows the order of trip selection.
    pub fn next_ticket(&self) -> ProbeTicket {
        ProbeTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Same as [`AvailabilityProber::probe`] with a ticket taken beforehand with
    /// [`AvailabilityProber::next_ticket`].
    pub async fn probe_with_ticket(
        &self,
        ticket: ProbeTicket,
        trip: Option<&TripId>,
    ) -> ProbeOutcome {
        let available = match trip {
            Some(trip) => self.lookup(trip).await,
            None => false,
        };

        ProbeOutcome {
            ticket,
            trip: trip.cloned(),
            available,
        }
    }

    /// Returns true if no probe was started after the one with the given ticket.
    pub fn is_latest(&self, ticket: ProbeTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    async fn lookup(&self, trip: &TripId) -> bool {
        let store = self.store.clone();
        let owned_trip = trip.clone();
        let result = run_guarded(self.timeout, async move {
            store.has_offline_map_for_trip(&owned_trip).await
        })
        .await;

        match result {
            Ok(available) => {
                log::debug!("Offline tiles for trip {trip}: {available}");
                available
            }
            Err(err) => {
                log::warn!("Failed to check offline tiles for trip {trip}: {err}");
                false
            }
        }
    }
}
