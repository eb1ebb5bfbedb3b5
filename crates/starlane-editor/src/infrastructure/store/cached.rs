//! Last-known-good cache in front of another store.
//!
//! Every successful load is copied into a key/value tier.  When the primary
//! store later fails and the offline fallback is enabled, the cached copy is
//! served with a warning.  With the fallback disabled the cache is still kept
//! up to date but load failures propagate unchanged.
//!
//! An accepted save also replaces the cached copy, so a reload that falls
//! back right after a save never resurrects the document it overwrote.

use std::sync::Arc;

use async_trait::async_trait;
use starlane_core::{parse, serialize, ConfigModel};
use tracing::{debug, warn};

use crate::application::sync::{ConfigStore, LoadError, SaveError};
use crate::infrastructure::kv::KeyValueStore;

/// Key holding the last successfully loaded document.
pub const CACHE_STORAGE_KEY: &str = "starlaneConfigCache";

pub struct CachedStore {
    primary: Arc<dyn ConfigStore>,
    cache: Arc<dyn KeyValueStore>,
    offline_fallback: bool,
}

impl CachedStore {
    pub fn new(
        primary: Arc<dyn ConfigStore>,
        cache: Arc<dyn KeyValueStore>,
        offline_fallback: bool,
    ) -> Self {
        Self {
            primary,
            cache,
            offline_fallback,
        }
    }

    fn remember(&self, model: &ConfigModel) {
        let written = serialize(model)
            .map_err(|e| e.to_string())
            .and_then(|text| {
                self.cache
                    .set(CACHE_STORAGE_KEY, &text)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = written {
            debug!(error = %e, "could not refresh configuration cache");
        }
    }

    fn cached(&self) -> Option<ConfigModel> {
        let text = self.cache.get(CACHE_STORAGE_KEY).ok().flatten()?;
        parse(&text).ok()
    }
}

#[async_trait]
impl ConfigStore for CachedStore {
    async fn load(&self) -> Result<ConfigModel, LoadError> {
        match self.primary.load().await {
            Ok(model) => {
                self.remember(&model);
                Ok(model)
            }
            Err(e) if self.offline_fallback => match self.cached() {
                Some(model) => {
                    warn!(
                        store = %self.primary.describe(),
                        error = %e,
                        "load failed; showing last cached configuration"
                    );
                    Ok(model)
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    async fn save(&self, model: &ConfigModel, token: Option<&str>) -> Result<(), SaveError> {
        self.primary.save(model, token).await?;
        self.remember(model);
        Ok(())
    }

    fn requires_token(&self) -> bool {
        self.primary.requires_token()
    }

    fn describe(&self) -> String {
        format!("{} (cached)", self.primary.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::kv::MemoryStore;
    use starlane_core::Group;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Primary store that can be switched offline and can reject saves.
    struct Flaky {
        online: AtomicBool,
        accept_saves: AtomicBool,
        model: ConfigModel,
    }

    #[async_trait]
    impl ConfigStore for Flaky {
        async fn load(&self) -> Result<ConfigModel, LoadError> {
            if self.online.load(Ordering::SeqCst) {
                Ok(self.model.clone())
            } else {
                Err(LoadError::Network {
                    url: "http://nas.local/data/config.json".into(),
                    message: "connection refused".into(),
                })
            }
        }

        async fn save(&self, _model: &ConfigModel, _token: Option<&str>) -> Result<(), SaveError> {
            if self.accept_saves.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(SaveError::Rejected {
                    status: 500,
                    body: "disk full".into(),
                })
            }
        }

        fn requires_token(&self) -> bool {
            true
        }

        fn describe(&self) -> String {
            "flaky".into()
        }
    }

    fn setup(fallback: bool) -> (Arc<Flaky>, CachedStore) {
        let primary = Arc::new(Flaky {
            online: AtomicBool::new(true),
            accept_saves: AtomicBool::new(true),
            model: ConfigModel {
                groups: vec![Group::new("Media")],
                ..ConfigModel::default()
            },
        });
        let store = CachedStore::new(
            primary.clone(),
            Arc::new(MemoryStore::new("cache")),
            fallback,
        );
        (primary, store)
    }

    #[tokio::test]
    async fn test_fallback_serves_last_good_copy_when_offline() {
        let (primary, store) = setup(true);
        let online = store.load().await.unwrap();
        primary.online.store(false, Ordering::SeqCst);

        let offline = store.load().await.unwrap();

        assert_eq!(offline, online);
    }

    fn docs() -> ConfigModel {
        ConfigModel {
            groups: vec![Group::new("Docs")],
            ..ConfigModel::default()
        }
    }

    #[tokio::test]
    async fn test_accepted_save_refreshes_cache_before_offline_reload() {
        // Arrange: "Media" cached by a first load
        let (primary, store) = setup(true);
        store.load().await.unwrap();

        // Act: server accepts "Docs", then the reload cannot reach it
        store.save(&docs(), Some("tok")).await.unwrap();
        primary.online.store(false, Ordering::SeqCst);
        let reloaded = store.load().await.unwrap();

        // Assert
        assert_eq!(reloaded, docs());
    }

    #[tokio::test]
    async fn test_rejected_save_keeps_cached_copy() {
        let (primary, store) = setup(true);
        let loaded = store.load().await.unwrap();
        primary.accept_saves.store(false, Ordering::SeqCst);

        let result = store.save(&docs(), Some("tok")).await;
        primary.online.store(false, Ordering::SeqCst);

        assert!(matches!(result, Err(SaveError::Rejected { .. })));
        assert_eq!(store.load().await.unwrap(), loaded);
    }

    #[tokio::test]
    async fn test_without_fallback_errors_propagate() {
        let (primary, store) = setup(false);
        store.load().await.unwrap();
        primary.online.store(false, Ordering::SeqCst);

        let result = store.load().await;

        assert!(matches!(result, Err(LoadError::Network { .. })));
    }

    #[tokio::test]
    async fn test_fallback_with_empty_cache_propagates_error() {
        let (primary, store) = setup(true);
        primary.online.store(false, Ordering::SeqCst);

        assert!(store.load().await.is_err());
    }

    #[tokio::test]
    async fn test_delegates_token_requirement_and_description() {
        let (_, store) = setup(true);

        assert!(store.requires_token());
        assert_eq!(store.describe(), "flaky (cached)");
    }
}
