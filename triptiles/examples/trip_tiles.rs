//! This example resolves the tiles around a point for a trip and prints where each tile came from.
//!
//! ```text
//! cargo run --example trip_tiles -- <offline tiles folder> <trip id> [online|offline|auto]
//! ```

use std::sync::Arc;

use triptiles::preference::JsonFilePreferenceStore;
use triptiles::{
    MapSourcePreference, Messenger, ResolvedSource, TileIndex, TileSourceBuilder, TripId,
};

struct LogMessenger;

impl Messenger for LogMessenger {
    fn request_redraw(&self) {}

    fn source_changed(&self, source: ResolvedSource) {
        log::info!("Source indicator: {source}");
    }

    fn offline_tiles_available(&self, trip: &TripId) {
        log::info!("Offline tiles available for trip {trip}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let folder = args.next().unwrap_or_else(|| "offline_tiles".to_string());
    let trip = args.next().map(TripId::from);
    let preference = args
        .next()
        .map(|value| value.parse::<MapSourcePreference>())
        .transpose()?;

    let preferences = Arc::new(JsonFilePreferenceStore::open(".triptiles/preferences.json")?);
    let controller = TileSourceBuilder::new_file_store(&folder)
        .with_preference_store(preferences)
        .with_messenger(Arc::new(LogMessenger))
        .build()?;

    if let Some(preference) = preference {
        controller.set_preference(preference).await;
    }
    let source = controller.select_trip(trip).await;
    println!(
        "preference: {}, resolved source: {source}",
        controller.preference()
    );

    let center = TileIndex::new(8716, 5823, 14);
    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
    for dx in 0..3 {
        for dy in 0..3 {
            let index = TileIndex::new(center.x + dx - 1, center.y + dy - 1, center.z);
            let sender = sender.clone();
            controller.adapter().request_tile(index, move |image| {
                let _ = sender.send((index, image));
            });
        }
    }
    drop(sender);

    while let Some((index, image)) = receiver.recv().await {
        println!(
            "{index}: {:?} {} ({} bytes)",
            image.origin(),
            image.url().unwrap_or("<placeholder>"),
            image.bytes().len()
        );
    }

    if controller.adapter().placeholder_warning() {
        eprintln!("warning: tile sources keep returning non-image content");
    }

    if let Some(trip) = controller.offline_notice() {
        println!("offline tiles are available for trip {trip}");
    }

    Ok(())
}
