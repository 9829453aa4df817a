//! In-memory mirror of per-device configuration.
//!
//! The cache is keyed by raw address and rebuilt from scratch each session;
//! the backend is keyed by the normalized config id and is the only durable
//! copy. Saves follow a save-then-commit protocol: the cache changes only
//! after the backend acknowledges the write.

use deck_core::config::{config_id_for_address, ConfigUpdate, DeviceConfig};
use deck_storage::{ConfigBackend, StorageError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

pub struct ConfigCache {
    backend: Arc<dyn ConfigBackend>,
    configs: RwLock<HashMap<String, DeviceConfig>>,
    // One guard per address: load and save for the same device must not
    // race, or a stale read could overwrite a fresher write in the cache.
    // Different addresses proceed independently.
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConfigCache {
    pub fn new(backend: Arc<dyn ConfigBackend>) -> Self {
        Self {
            backend,
            configs: RwLock::new(HashMap::new()),
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn key_lock(&self, address: &str) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        locks
            .entry(address.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn cached(&self, address: &str) -> Option<DeviceConfig> {
        self.configs.read().await.get(address).cloned()
    }

    /// Reads the config from the backend and caches it. A failed load leaves
    /// the cache untouched; nothing partial is ever cached as if real.
    pub async fn load(&self, address: &str) -> Result<DeviceConfig, StorageError> {
        let lock = self.key_lock(address).await;
        let _guard = lock.lock().await;

        let id = config_id_for_address(address);
        let config = self.backend.load(&id).await?;
        self.configs
            .write()
            .await
            .insert(address.to_string(), config.clone());
        debug!(event = "config_loaded", address, id);
        Ok(config)
    }

    /// Returns the cached config, loading it on first access.
    pub async fn ensure_loaded(&self, address: &str) -> Result<DeviceConfig, StorageError> {
        if let Some(config) = self.cached(address).await {
            return Ok(config);
        }
        self.load(address).await
    }

    /// Merges a partial update onto the cached config (or a fresh default),
    /// writes the full document, and commits to the cache only on a
    /// successful acknowledgment. On failure the cache keeps its pre-save
    /// value and the error surfaces to the caller.
    pub async fn save(
        &self,
        address: &str,
        update: ConfigUpdate,
    ) -> Result<DeviceConfig, StorageError> {
        let lock = self.key_lock(address).await;
        let _guard = lock.lock().await;

        let base = {
            let configs = self.configs.read().await;
            configs
                .get(address)
                .cloned()
                .unwrap_or_else(|| DeviceConfig::default_for_address(address))
        };
        let merged = base.merged(update);

        let id = config_id_for_address(address);
        self.backend.save(&id, &merged).await?;
        self.configs
            .write()
            .await
            .insert(address.to_string(), merged.clone());
        debug!(event = "config_saved", address, id);
        Ok(merged)
    }
}
