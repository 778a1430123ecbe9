//! Durable storage for the most recent successful query.
//!
//! Two string slots are kept: the serialized current conditions of the last
//! successful search, and the place name that produced them. Both are
//! overwritten together and never deleted.

use std::{
    collections::HashMap,
    fmt::Debug,
    fs, io,
    path::PathBuf,
    sync::Mutex,
};

use tracing::{debug, warn};

use crate::model::{CurrentConditions, PlaceQuery};

pub const SNAPSHOT_KEY: &str = "weather_data";
pub const LAST_PLACE_KEY: &str = "last_search";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Scalar string slots addressed by key.
pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// One file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.slot_path(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.slot_path(key);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io { path, source })
    }
}

/// In-process slots; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Sole reader and writer of the persisted last query.
#[derive(Debug)]
pub struct LastQuery {
    store: Box<dyn KeyValueStore>,
}

impl LastQuery {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self { store: Box::new(store) }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::default())
    }

    /// Overwrite the stored snapshot and place. Failures are logged, not returned.
    pub fn save(&self, place: &PlaceQuery, conditions: &CurrentConditions) {
        if let Err(e) = self.try_save(place, conditions) {
            warn!(error = %e, place = %place, "failed to persist last query");
        }
    }

    fn try_save(
        &self,
        place: &PlaceQuery,
        conditions: &CurrentConditions,
    ) -> Result<(), StoreError> {
        let snapshot = serde_json::to_string(conditions)?;
        self.store.set(SNAPSHOT_KEY, &snapshot)?;
        self.store.set(LAST_PLACE_KEY, place.as_str())?;
        debug!(place = %place, "persisted last query");
        Ok(())
    }

    pub fn load_last_place(&self) -> Option<PlaceQuery> {
        let raw = self.read(LAST_PLACE_KEY)?;
        PlaceQuery::parse(&raw).ok()
    }

    pub fn load_snapshot(&self) -> Option<CurrentConditions> {
        let raw = self.read(SNAPSHOT_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable weather snapshot");
                None
            }
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, key, "failed to read stored slot");
                None
            }
        }
    }
}
