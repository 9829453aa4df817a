//! Config persistence backend.
//!
//! The backend durably stores one JSON document per normalized config id.
//! Callers never hand it a raw device address; the id transformation lives in
//! `deck_core::config::config_id_for_address` and every caller applies it.

use async_trait::async_trait;
use deck_core::config::DeviceConfig;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("config serialization error: {0}")]
    Serialization(String),
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Unavailable(err.to_string())
    }
}

/// Request/response boundary to the durable store. Load and save suspend the
/// caller until the backend acknowledges or fails; there are no retries.
#[async_trait]
pub trait ConfigBackend: Send + Sync {
    async fn load(&self, id: &str) -> Result<DeviceConfig, StorageError>;
    async fn save(&self, id: &str, config: &DeviceConfig) -> Result<(), StorageError>;
}

/// File-backed store: `<dir>/<id>.json`, pretty-printed.
///
/// First load for an id materializes the default document on disk. Documents
/// written by older revisions may miss top-level fields; those are filled
/// from the default on read, and unreadable content falls back to the
/// default rather than failing the load.
pub struct FileConfigStore {
    dir: PathBuf,
}

impl FileConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn write_document(&self, id: &str, config: &DeviceConfig) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let body = serde_json::to_vec_pretty(config)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        tokio::fs::write(self.document_path(id), body).await?;
        Ok(())
    }
}

#[async_trait]
impl ConfigBackend for FileConfigStore {
    async fn load(&self, id: &str) -> Result<DeviceConfig, StorageError> {
        let path = self.document_path(id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(parse_document(id, &bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let config = DeviceConfig::default_for_address(id);
                self.write_document(id, &config).await?;
                debug!(event = "config_default_created", id, path = %path.display());
                Ok(config)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, id: &str, config: &DeviceConfig) -> Result<(), StorageError> {
        self.write_document(id, config).await?;
        debug!(event = "config_saved", id);
        Ok(())
    }
}

/// Decodes a stored document, filling missing top-level fields from the
/// default and falling back to the default document wholesale when the
/// content is not usable.
fn parse_document(id: &str, bytes: &[u8]) -> DeviceConfig {
    let default = DeviceConfig::default_for_address(id);
    let mut stored: Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(err) => {
            warn!(event = "config_unreadable", id, error = %err);
            return default;
        }
    };

    if let (Some(object), Ok(defaults)) = (stored.as_object_mut(), serde_json::to_value(&default))
    {
        if let Some(default_fields) = defaults.as_object() {
            for (key, value) in default_fields {
                object.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
    }

    match serde_json::from_value(stored) {
        Ok(config) => config,
        Err(err) => {
            warn!(event = "config_unreadable", id, error = %err);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::action::{ActionKind, GpioAction};
    use tempfile::TempDir;

    const ID: &str = "aa-bb-cc-dd-ee-01";

    fn store() -> (TempDir, FileConfigStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = FileConfigStore::new(dir.path().join("configs"));
        (dir, store)
    }

    #[tokio::test]
    async fn first_load_materializes_default_document() {
        let (_dir, store) = store();
        let config = store.load(ID).await.expect("load");
        assert_eq!(config.id, ID);
        assert!(config.gpios.is_empty());
        assert!(store.document_path(ID).exists());

        let again = store.load(ID).await.expect("reload");
        assert_eq!(again, config);
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let (_dir, store) = store();
        let mut config = DeviceConfig::default_for_address(ID);
        config.gpios.insert(
            "d2".to_string(),
            GpioAction {
                kind: ActionKind::Hotkey,
                action: "ctrl + c".to_string(),
                hold_duration: Some(0.25),
                label: Some("Copy".to_string()),
            },
        );

        store.save(ID, &config).await.expect("save");
        let loaded = store.load(ID).await.expect("load");
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn load_fills_missing_top_level_fields() {
        let (_dir, store) = store();
        tokio::fs::create_dir_all(store.dir()).await.expect("mkdir");
        tokio::fs::write(
            store.document_path(ID),
            r#"{"id":"aa-bb-cc-dd-ee-01","gpios":{"d2":{"type":"key","action":"a"}}}"#,
        )
        .await
        .expect("write");

        let loaded = store.load(ID).await.expect("load");
        assert_eq!(loaded.gpios["d2"].action, "a");
        assert_eq!(loaded.volume_gpio, "d15");
        assert_eq!(loaded.name, DeviceConfig::default_for_address(ID).name);
    }

    #[tokio::test]
    async fn unreadable_document_falls_back_to_default() {
        let (_dir, store) = store();
        tokio::fs::create_dir_all(store.dir()).await.expect("mkdir");
        tokio::fs::write(store.document_path(ID), b"{not json")
            .await
            .expect("write");

        let loaded = store.load(ID).await.expect("load");
        assert_eq!(loaded, DeviceConfig::default_for_address(ID));
    }

    #[tokio::test]
    async fn io_failure_surfaces_as_unavailable() {
        let dir = TempDir::new().expect("tempdir");
        let blocker = dir.path().join("configs");
        tokio::fs::write(&blocker, b"not a directory")
            .await
            .expect("write");

        let store = FileConfigStore::new(&blocker);
        let err = store.load(ID).await.expect_err("load must fail");
        assert!(matches!(err, StorageError::Unavailable(_)));
    }
}
