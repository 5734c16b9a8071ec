//! Persistence of the user's map source preference.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::TileSourceError;
use crate::source::MapSourcePreference;

/// Key under which the map source preference is stored.
pub const PREFERRED_MAP_SOURCE_KEY: &str = "preferredMapSource";

/// Persistent string key-value storage.
pub trait PreferenceStore: Send + Sync {
    /// Returns the stored value.
    fn get(&self, key: &str) -> Option<String>;
    /// Stores the value.
    fn set(&self, key: &str, value: &str) -> Result<(), TileSourceError>;
}

/// Reads the stored map source preference. Missing or unknown values give the default preference.
pub fn load_preference(store: &dyn PreferenceStore) -> MapSourcePreference {
    let Some(value) = store.get(PREFERRED_MAP_SOURCE_KEY) else {
        return MapSourcePreference::default();
    };

    match value.parse() {
        Ok(preference) => preference,
        Err(err) => {
            log::warn!("Ignoring stored map source preference: {err}");
            MapSourcePreference::default()
        }
    }
}

/// Stores the map source preference.
pub fn save_preference(
    store: &dyn PreferenceStore,
    preference: MapSourcePreference,
) -> Result<(), TileSourceError> {
    store.set(PREFERRED_MAP_SOURCE_KEY, preference.as_str())
}

/// Keeps the values in memory only.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPreferenceStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TileSourceError> {
        self.values.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Stores all values as a single JSON object in a file. The file is rewritten on every change.
#[derive(Debug)]
pub struct JsonFilePreferenceStore {
    file_path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl JsonFilePreferenceStore {
    /// Opens the store. A missing file is treated as an empty store and is created on the first
    /// write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TileSourceError> {
        let file_path = path.as_ref().to_path_buf();
        let values = match std::fs::read(&file_path) {
            Ok(data) => serde_json::from_slice(&data)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            file_path,
            values: Mutex::new(values),
        })
    }

    fn write(&self, values: &HashMap<String, String>) -> Result<(), TileSourceError> {
        if let Some(folder) = self.file_path.parent() {
            std::fs::create_dir_all(folder)?;
        }

        let data = serde_json::to_vec_pretty(values)?;
        std::fs::write(&self.file_path, data)?;
        log::debug!("Preferences saved to {:?}", self.file_path);
        Ok(())
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TileSourceError> {
        let mut values = self.values.lock();
        values.insert(key.to_owned(), value.to_owned());
        self.write(&values)
    }
}
