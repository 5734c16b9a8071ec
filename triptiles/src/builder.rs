use std::path::Path;
use std::sync::Arc;

use crate::adapter::TileRenderAdapter;
use crate::config::TileSourceConfig;
use crate::controller::TileSourceController;
use crate::error::TileSourceError;
use crate::messenger::Messenger;
use crate::offline::{FileOfflineStore, OfflineTileStore};
use crate::platform::{ImageLoader, ImageLoaderImpl};
use crate::preference::{load_preference, MemoryPreferenceStore, PreferenceStore};
use crate::probe::AvailabilityProber;
use crate::resolver::TileResolver;
use crate::url_source::{OnlineUrlSource, TemplateUrlSource};

/// Constructor for a [`TileSourceController`].
///
/// ```no_run
/// use triptiles::{MapSourcePreference, TileIndex, TileSourceBuilder};
///
/// # tokio_test::block_on(async {
/// let controller = TileSourceBuilder::new_file_store("./offline_tiles").build()?;
/// controller.set_preference(MapSourcePreference::Auto).await;
/// controller.select_trip(Some("2024-05-01-commute".into())).await;
///
/// let tile = controller.adapter().load_tile(TileIndex::new(8716, 5823, 14)).await;
/// println!("{:?} tile from {:?}", tile.origin(), tile.url());
/// # Ok::<(), triptiles::error::TileSourceError>(())
/// # });
/// ```
pub struct TileSourceBuilder {
    config: TileSourceConfig,
    offline_store: Arc<dyn OfflineTileStore>,
    url_source: Option<Arc<dyn OnlineUrlSource>>,
    image_loader: Option<Arc<dyn ImageLoader>>,
    preferences: Option<Arc<dyn PreferenceStore>>,
    messenger: Option<Arc<dyn Messenger>>,
}

impl TileSourceBuilder {
    /// Initializes a builder with the given offline tile store.
    pub fn new(offline_store: impl OfflineTileStore + 'static) -> Self {
        Self::new_shared(Arc::new(offline_store))
    }

    /// Initializes a builder with an offline tile store shared with other users.
    pub fn new_shared(offline_store: Arc<dyn OfflineTileStore>) -> Self {
        Self {
            config: TileSourceConfig::default(),
            offline_store,
            url_source: None,
            image_loader: None,
            preferences: None,
            messenger: None,
        }
    }

    /// Initializes a builder with offline tile sets stored in the given folder. See
    /// [`FileOfflineStore`] for the folder layout.
    pub fn new_file_store(path: impl AsRef<Path>) -> Self {
        Self::new(FileOfflineStore::new(path))
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: TileSourceConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the url template and subdomains of the online tile server.
    pub fn with_url_template(mut self, template: impl Into<String>, subdomains: &[&str]) -> Self {
        self.config.url_template = template.into();
        self.config.subdomains = subdomains.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Sets a custom source of online tile urls. Takes precedence over the url template of the
    /// configuration.
    pub fn with_url_source(mut self, url_source: impl OnlineUrlSource + 'static) -> Self {
        self.url_source = Some(Arc::new(url_source));
        self
    }

    /// Sets the loader of tile images. By default a
    /// [`NativeImageLoader`](crate::platform::native::NativeImageLoader) set up from the
    /// configuration is used.
    pub fn with_image_loader(mut self, image_loader: impl ImageLoader + 'static) -> Self {
        self.image_loader = Some(Arc::new(image_loader));
        self
    }

    /// Sets the store the map source preference is read from and written to. By default the
    /// preference is only kept in memory.
    pub fn with_preference_store(mut self, preferences: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = Some(preferences);
        self
    }

    /// Sets the messenger notified about redraws, source changes and offline availability.
    pub fn with_messenger(mut self, messenger: Arc<dyn Messenger>) -> Self {
        self.messenger = Some(messenger);
        self
    }

    /// Sets the time limit of offline lookups.
    pub fn with_offline_lookup_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.offline_lookup_timeout_ms =
            u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Consumes the builder and constructs the controller.
    ///
    /// Returns an error if the default image loader cannot be created.
    pub fn build(self) -> Result<TileSourceController, TileSourceError> {
        let Self {
            config,
            offline_store,
            url_source,
            image_loader,
            preferences,
            messenger,
        } = self;

        let image_loader: Arc<dyn ImageLoader> = match image_loader {
            Some(loader) => loader,
            None => Arc::new(ImageLoaderImpl::new(
                &config.user_agent,
                config.request_timeout(),
                config.image_cache_capacity,
            )?),
        };

        let url_source: Arc<dyn OnlineUrlSource> = match url_source {
            Some(source) => source,
            None => Arc::new(TemplateUrlSource::new(
                config.url_template.clone(),
                config.subdomains.clone(),
            )),
        };

        let preferences: Arc<dyn PreferenceStore> =
            preferences.unwrap_or_else(|| Arc::new(MemoryPreferenceStore::new()));
        let preference = load_preference(preferences.as_ref());
        log::debug!("Starting with map source preference {preference}");

        let resolver = TileResolver::new(offline_store.clone(), url_source, image_loader)
            .with_fallback_url(&config.fallback_url)
            .with_lookup_timeout(config.offline_lookup_timeout())
            .with_non_image_threshold(config.non_image_warning_threshold);
        let adapter = Arc::new(TileRenderAdapter::new(resolver, messenger.clone()));
        let prober = AvailabilityProber::new(offline_store, config.offline_lookup_timeout());

        Ok(TileSourceController::new(
            prober,
            adapter,
            preferences,
            messenger,
            preference,
            config.notice_duration(),
        ))
    }
}
