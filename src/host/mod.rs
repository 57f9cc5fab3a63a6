//! Capabilities the watcher needs from whatever is hosting the client:
//! named cache storage, persisted key/value storage, per-session storage
//! and a way to reload.

pub mod kv_store;
pub mod storage;

use anyhow::Result;
use log::{info, warn};

pub use kv_store::KeyValueStore;
pub use storage::{ReloadSignal, StorageHost};

pub trait ClientHost: Send + Sync {
    fn cache_names(&self) -> Result<Vec<String>>;
    fn delete_cache(&self, name: &str) -> Result<()>;
    fn clear_local_storage(&self) -> Result<()>;
    fn clear_session_storage(&self) -> Result<()>;
    /// Restarts the client. The running watcher is expected to be torn down.
    fn reload(&self);
}

/// Clears every cache and storage area the host exposes, then reloads.
///
/// Clearing is best-effort: each step runs even if an earlier one failed, and
/// the reload always happens.
pub fn hard_reload(host: &dyn ClientHost) {
    match host.cache_names() {
        Ok(names) => {
            for name in names {
                if let Err(err) = host.delete_cache(&name) {
                    warn!("Failed to delete cache {name}: {err:#}");
                }
            }
        }
        Err(err) => warn!("Failed to list caches: {err:#}"),
    }

    if let Err(err) = host.clear_local_storage() {
        warn!("Failed to clear local storage: {err:#}");
    }

    if let Err(err) = host.clear_session_storage() {
        warn!("Failed to clear session storage: {err:#}");
    }

    info!("Caches cleared, reloading");
    host.reload();
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingHost;
    use super::*;

    #[test]
    fn clears_everything_then_reloads() {
        let host = RecordingHost::default();
        hard_reload(&host);
        assert_eq!(
            host.calls(),
            vec![
                "cache_names",
                "delete_cache:assets-v1",
                "delete_cache:assets-v2",
                "clear_local",
                "clear_session",
                "reload",
            ]
        );
    }

    #[test]
    fn reloads_even_when_every_step_fails() {
        let host = RecordingHost {
            fail_delete: true,
            fail_local: true,
            fail_session: true,
            ..Default::default()
        };
        hard_reload(&host);

        let calls = host.calls();
        assert!(calls.contains(&"delete_cache:assets-v2".to_string()));
        assert!(calls.contains(&"clear_session".to_string()));
        assert_eq!(calls.last().map(String::as_str), Some("reload"));
    }

    #[test]
    fn listing_failure_still_clears_storage() {
        let host = RecordingHost {
            fail_listing: true,
            ..Default::default()
        };
        hard_reload(&host);
        assert_eq!(
            host.calls(),
            vec!["cache_names", "clear_local", "clear_session", "reload"]
        );
    }
}
