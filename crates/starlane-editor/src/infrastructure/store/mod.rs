//! Configuration stores: where the dashboard document is loaded from and
//! saved to.
//!
//! - [`RemoteStore`] – the HTTP read/write endpoints.
//! - [`LocalStore`] – a key/value tier under a fixed key (local mode).
//! - [`CachedStore`] – last-known-good copy in front of another store.
//!
//! [`open_store`] picks and wires them from [`AppSettings`].

pub mod cached;
pub mod local;
pub mod remote;

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

pub use self::cached::CachedStore;
pub use self::local::{LocalStore, CONFIG_STORAGE_KEY};
pub use self::remote::{RemoteStore, RemoteStoreError};
pub use crate::application::sync::ConfigStore;

use super::kv::FileStore;
use super::settings::{AppSettings, SettingsError, StorageMode};

/// Errors wiring a store from settings.
#[derive(Debug, Error)]
pub enum StoreSetupError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Remote(#[from] RemoteStoreError),
}

/// Builds the store selected by `settings.storage.mode`.
///
/// # Errors
///
/// An unresolvable data directory or invalid remote settings.
pub fn open_store(settings: &AppSettings) -> Result<Arc<dyn ConfigStore>, StoreSetupError> {
    let data_dir = settings.storage.resolved_data_dir()?;
    let store: Arc<dyn ConfigStore> = match settings.storage.mode {
        StorageMode::Local => {
            let mut local = LocalStore::new(Arc::new(FileStore::new(&data_dir)));
            if let Some(seed) = &settings.storage.seed_file {
                local = local.with_seed_file(seed);
            }
            Arc::new(local)
        }
        StorageMode::Remote => {
            let remote: Arc<dyn ConfigStore> = Arc::new(RemoteStore::new(&settings.remote)?);
            if settings.storage.offline_fallback {
                Arc::new(CachedStore::new(
                    remote,
                    Arc::new(FileStore::new(&data_dir)),
                    true,
                ))
            } else {
                remote
            }
        }
    };
    info!(store = %store.describe(), data_dir = %data_dir.display(), "store ready");
    Ok(store)
}
