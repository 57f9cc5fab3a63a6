use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};
use std::{fs, path::PathBuf, sync::RwLock};

/// Persistent key/value storage backed by one JSON object on disk. This is the
/// "local storage" a hard reload wipes.
pub struct KeyValueStore {
    path: PathBuf,
    data: RwLock<Map<String, Value>>,
}

impl KeyValueStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read storage from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            Map::new()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.read().ok()?.get(key).cloned()
    }

    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("storage lock poisoned"))?;
        guard.insert(key.to_string(), value);
        self.persist(&guard)
    }

    pub fn len(&self) -> usize {
        self.data.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("storage lock poisoned"))?;
        guard.clear();
        self.persist(&guard)
    }

    fn persist(&self, data: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write storage to {}", self.path.display()))
    }
}
