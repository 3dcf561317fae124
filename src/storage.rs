// Durable client-side key-value storage, the terminal equivalent of the
// browser's localStorage. Values are opaque strings; callers pick the encoding.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::catalog::Product;
use crate::constants::{DIRECTION_STORAGE_KEY, SELECTION_STORAGE_KEY};
use crate::error::StorageError;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// All keys live in one JSON object on disk. Every `set` rewrites the file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        // A corrupt file is replaced rather than blocking every future write.
        let mut values = self.read_all().unwrap_or_else(|e| {
            warn!("Discarding unreadable storage file {:?}: {}", self.path, e);
            BTreeMap::new()
        });
        values.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&values)?)?;
        Ok(())
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum StoredSelection {
    Ordered(Vec<Product>),
    // Older snapshots keyed products by name.
    Keyed(BTreeMap<String, Product>),
}

/// Restores the persisted selection. Missing, unreadable or corrupt data all
/// come back as an empty list.
pub fn load_selection(store: &dyn KeyValueStore) -> Vec<Product> {
    let raw = match store.get(SELECTION_STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!("Could not read saved selection: {}", e);
            return Vec::new();
        }
    };
    match serde_json::from_str::<StoredSelection>(&raw) {
        Ok(StoredSelection::Ordered(products)) => products,
        Ok(StoredSelection::Keyed(products)) => products.into_values().collect(),
        Err(e) => {
            warn!("Ignoring corrupt saved selection: {}", e);
            Vec::new()
        }
    }
}

/// Best effort: failures are logged and otherwise ignored.
pub fn save_selection(store: &mut dyn KeyValueStore, products: &[Product]) {
    let result = serde_json::to_string(products)
        .map_err(StorageError::from)
        .and_then(|json| store.set(SELECTION_STORAGE_KEY, &json));
    match result {
        Ok(()) => debug!("Saved {} selected products", products.len()),
        Err(e) => warn!("Could not save selection: {}", e),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Direction::Ltr => Direction::Rtl,
            Direction::Rtl => Direction::Ltr,
        }
    }
}

pub fn load_direction(store: &dyn KeyValueStore) -> Direction {
    match store.get(DIRECTION_STORAGE_KEY) {
        Ok(Some(value)) if value == "rtl" => Direction::Rtl,
        Ok(_) => Direction::Ltr,
        Err(e) => {
            warn!("Could not read direction preference: {}", e);
            Direction::Ltr
        }
    }
}

pub fn save_direction(store: &mut dyn KeyValueStore, direction: Direction) {
    if let Err(e) = store.set(DIRECTION_STORAGE_KEY, direction.as_str()) {
        warn!("Could not save direction preference: {}", e);
    }
}
