use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
    sync::RwLock,
};

use anyhow::{anyhow, Context, Result};
use log::info;
use tokio::sync::watch;

use super::{ClientHost, KeyValueStore};

pub type ReloadSignal = watch::Receiver<u64>;

/// Filesystem-backed host used by the CLI watcher.
///
/// Cache storage is every subdirectory of `cache_root`. A reload bumps a
/// counter on a watch channel; the session loop owning the watcher reacts by
/// remounting it.
pub struct StorageHost {
    cache_root: PathBuf,
    local: KeyValueStore,
    session: RwLock<HashMap<String, String>>,
    reload_tx: watch::Sender<u64>,
}

impl StorageHost {
    pub fn new(cache_root: PathBuf, local_storage_path: PathBuf) -> Result<(Self, ReloadSignal)> {
        fs::create_dir_all(&cache_root)
            .with_context(|| format!("Failed to create cache root {}", cache_root.display()))?;
        let local = KeyValueStore::new(local_storage_path)?;
        let (reload_tx, reload_rx) = watch::channel(0);

        Ok((
            Self {
                cache_root,
                local,
                session: RwLock::new(HashMap::new()),
                reload_tx,
            },
            reload_rx,
        ))
    }

    pub fn local_storage(&self) -> &KeyValueStore {
        &self.local
    }

    pub fn session_set(&self, key: &str, value: &str) {
        if let Ok(mut guard) = self.session.write() {
            guard.insert(key.to_string(), value.to_string());
        }
    }

    pub fn session_len(&self) -> usize {
        self.session.read().map(|guard| guard.len()).unwrap_or(0)
    }
}

impl ClientHost for StorageHost {
    fn cache_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.cache_root)
            .with_context(|| format!("Failed to list {}", self.cache_root.display()))?
        {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete_cache(&self, name: &str) -> Result<()> {
        if name.contains('/') || name.contains('\\') || name == ".." {
            return Err(anyhow!("invalid cache name '{name}'"));
        }
        let dir = self.cache_root.join(name);
        fs::remove_dir_all(&dir).with_context(|| format!("Failed to remove {}", dir.display()))
    }

    fn clear_local_storage(&self) -> Result<()> {
        self.local.clear()
    }

    fn clear_session_storage(&self) -> Result<()> {
        self.session
            .write()
            .map_err(|_| anyhow!("session storage lock poisoned"))?
            .clear();
        Ok(())
    }

    fn reload(&self) {
        info!("Reload requested");
        self.reload_tx.send_modify(|count| *count += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::hard_reload;
    use serde_json::json;

    fn host(dir: &std::path::Path) -> (StorageHost, ReloadSignal) {
        StorageHost::new(dir.join("caches"), dir.join("local-storage.json")).unwrap()
    }

    #[test]
    fn lists_cache_directories_only() {
        let dir = tempfile::tempdir().unwrap();
        let (host, _) = host(dir.path());
        fs::create_dir_all(dir.path().join("caches/b-assets")).unwrap();
        fs::create_dir_all(dir.path().join("caches/a-assets")).unwrap();
        fs::write(dir.path().join("caches/stray.txt"), "x").unwrap();

        assert_eq!(host.cache_names().unwrap(), vec!["a-assets", "b-assets"]);
    }

    #[test]
    fn rejects_path_like_cache_names() {
        let dir = tempfile::tempdir().unwrap();
        let (host, _) = host(dir.path());
        assert!(host.delete_cache("../etc").is_err());
    }

    #[tokio::test]
    async fn hard_reload_wipes_storage_and_signals() {
        let dir = tempfile::tempdir().unwrap();
        let (host, mut reload_rx) = host(dir.path());
        fs::create_dir_all(dir.path().join("caches/assets-v1/js")).unwrap();
        host.local_storage().set("token", json!("abc")).unwrap();
        host.session_set("draft", "hello");

        hard_reload(&host);

        assert!(host.cache_names().unwrap().is_empty());
        assert!(host.local_storage().is_empty());
        assert_eq!(host.session_len(), 0);
        assert!(reload_rx.has_changed().unwrap());
        assert_eq!(*reload_rx.borrow_and_update(), 1);
    }
}
