//! Local deployment mode: the document lives in a key/value tier under a
//! fixed key, with no server round trip.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use starlane_core::{parse, serialize, ConfigModel};
use tracing::{info, warn};

use crate::application::sync::{ConfigStore, LoadError, SaveError};
use crate::infrastructure::kv::{KeyValueStore, StorageError};

/// Key holding the serialised document.
pub const CONFIG_STORAGE_KEY: &str = "starlaneConfig";

/// [`ConfigStore`] over a [`KeyValueStore`].
pub struct LocalStore {
    kv: Arc<dyn KeyValueStore>,
    seed_file: Option<PathBuf>,
}

impl LocalStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv, seed_file: None }
    }

    /// Seeds the store from `path` the first time it is loaded empty.
    pub fn with_seed_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.seed_file = Some(path.into());
        self
    }

    fn seed(&self) -> Result<ConfigModel, LoadError> {
        let Some(path) = &self.seed_file else {
            info!("local store empty; starting from an empty configuration");
            return Ok(ConfigModel::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;
        let model = parse(&text)?;
        match serialize(&model) {
            Ok(normalised) => {
                if let Err(e) = self.kv.set(CONFIG_STORAGE_KEY, &normalised) {
                    warn!(error = %e, "could not persist seeded configuration");
                }
            }
            Err(e) => warn!(error = %e, "could not serialise seeded configuration"),
        }
        info!(seed = %path.display(), "local store seeded");
        Ok(model)
    }
}

#[async_trait]
impl ConfigStore for LocalStore {
    async fn load(&self) -> Result<ConfigModel, LoadError> {
        match self.kv.get(CONFIG_STORAGE_KEY)? {
            Some(text) => Ok(parse(&text)?),
            None => self.seed(),
        }
    }

    async fn save(&self, model: &ConfigModel, _token: Option<&str>) -> Result<(), SaveError> {
        let text = serialize(model)?;
        self.kv.set(CONFIG_STORAGE_KEY, &text)?;
        info!(tier = self.kv.name(), "configuration saved locally");
        Ok(())
    }

    fn requires_token(&self) -> bool {
        false
    }

    fn describe(&self) -> String {
        format!("{} storage ({CONFIG_STORAGE_KEY})", self.kv.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::kv::MemoryStore;
    use starlane_core::Group;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_empty_store_without_seed_loads_default() {
        let store = LocalStore::new(Arc::new(MemoryStore::new("local")));

        let model = store.load().await.unwrap();

        assert_eq!(model, ConfigModel::default());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let store = LocalStore::new(Arc::new(MemoryStore::new("local")));
        let model = ConfigModel {
            groups: vec![Group::new("Media")],
            ..ConfigModel::default()
        };

        store.save(&model, None).await.unwrap();

        assert_eq!(store.load().await.unwrap(), model);
        assert!(!store.requires_token());
    }

    #[tokio::test]
    async fn test_save_over_quota_is_storage_error() {
        let store = LocalStore::new(Arc::new(MemoryStore::new("local").with_quota(16)));
        let model = ConfigModel {
            groups: vec![Group::new("A group with a long name")],
            ..ConfigModel::default()
        };

        let result = store.save(&model, None).await;

        assert!(matches!(
            result,
            Err(SaveError::Storage(StorageError::QuotaExceeded { .. }))
        ));
    }

    #[tokio::test]
    async fn test_seed_file_used_once_then_stored_copy_wins() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("starlane_seed_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let seed = dir.join("config.json");
        std::fs::write(&seed, r#"{"groups":[{"name":"Seeded","items":[]}]}"#).unwrap();
        let kv = Arc::new(MemoryStore::new("local"));
        let store = LocalStore::new(kv.clone()).with_seed_file(&seed);

        // Act
        let first = store.load().await.unwrap();
        std::fs::write(&seed, r#"{"groups":[{"name":"Changed","items":[]}]}"#).unwrap();
        let second = store.load().await.unwrap();

        // Assert
        assert_eq!(first.group_names(), vec!["Seeded"]);
        assert_eq!(second.group_names(), vec!["Seeded"]);
        assert!(kv.get(CONFIG_STORAGE_KEY).unwrap().is_some());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_missing_seed_file_is_storage_error() {
        let store = LocalStore::new(Arc::new(MemoryStore::new("local")))
            .with_seed_file("/nonexistent/starlane/config.json");

        let result = store.load().await;

        assert!(matches!(result, Err(LoadError::Storage(StorageError::Io { .. }))));
    }

    #[tokio::test]
    async fn test_corrupt_stored_document_is_format_error() {
        let kv = Arc::new(MemoryStore::new("local"));
        kv.set(CONFIG_STORAGE_KEY, "{ broken").unwrap();
        let store = LocalStore::new(kv);

        assert!(matches!(store.load().await, Err(LoadError::Format(_))));
    }
}
