//! Save-token cache over an ordered chain of key/value tiers.
//!
//! The token is written to the first tier that accepts it (normally the
//! persistent file tier, then the in-memory session tier).  Reads take the
//! first tier that has it.  A tier that errors is skipped with a warning, so
//! losing every tier only means the user is prompted on every save.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use super::kv::{FileStore, KeyValueStore, MemoryStore, StorageError};
use crate::application::sync::TokenStore;

/// Key under which the save token is stored in every tier.
pub const SAVE_TOKEN_KEY: &str = "starlane_save_token";

/// Token cache trying each tier in order.
pub struct TokenCache {
    tiers: Vec<Arc<dyn KeyValueStore>>,
}

impl TokenCache {
    pub fn new(tiers: Vec<Arc<dyn KeyValueStore>>) -> Self {
        Self { tiers }
    }

    /// The usual chain: a file under `data_dir`, then process memory.
    pub fn standard(data_dir: impl Into<PathBuf>) -> Self {
        let persistent: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(data_dir));
        let session: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new("session"));
        Self::new(vec![persistent, session])
    }

    pub fn tier_names(&self) -> Vec<&str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }
}

impl TokenStore for TokenCache {
    fn get(&self) -> Option<String> {
        for tier in &self.tiers {
            match tier.get(SAVE_TOKEN_KEY) {
                Ok(Some(token)) if !token.trim().is_empty() => {
                    debug!(tier = tier.name(), "save token found");
                    return Some(token.trim().to_string());
                }
                Ok(_) => {}
                Err(e) => warn!(tier = tier.name(), error = %e, "token tier unreadable; trying next"),
            }
        }
        None
    }

    fn remember(&self, token: &str) -> Result<(), StorageError> {
        let mut last_error = StorageError::Unavailable("token cache".to_string());
        for tier in &self.tiers {
            match tier.set(SAVE_TOKEN_KEY, token) {
                Ok(()) => {
                    debug!(tier = tier.name(), "save token cached");
                    return Ok(());
                }
                Err(e) => {
                    warn!(tier = tier.name(), error = %e, "token tier unwritable; falling back");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    fn forget(&self) {
        for tier in &self.tiers {
            if let Err(e) = tier.remove(SAVE_TOKEN_KEY) {
                warn!(tier = tier.name(), error = %e, "could not purge save token");
            }
        }
    }
}

/// A token given explicitly (command line or environment).  It bypasses the
/// cache and the prompt; a 401 clears it for the rest of the process.
#[derive(Debug)]
pub struct OverrideToken {
    token: Mutex<Option<String>>,
}

impl OverrideToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for OverrideToken {
    fn get(&self) -> Option<String> {
        self.token.lock().ok().and_then(|t| t.clone())
    }

    fn remember(&self, _token: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn forget(&self) {
        if let Ok(mut token) = self.token.lock() {
            *token = None;
        }
    }
}
