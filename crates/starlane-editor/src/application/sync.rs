//! Moving the configuration across the trust boundary: load, save-with-token
//! and reload-after-save.
//!
//! # The save protocol
//!
//! ```text
//! save_session
//!   ├─ save control already in flight?  ──► SaveError::InFlight
//!   ├─ token = cache.get() or prompt()  ──► SaveError::Cancelled if dismissed
//!   ├─ store.save(snapshot, token)
//!   │     ├─ 2xx  ──► reload from store, replace working copy
//!   │     ├─ 401  ──► purge cached token, SaveError::Unauthorized
//!   │     └─ else ──► SaveError::Rejected { body } (server text verbatim)
//!   └─ working copy untouched on every failure
//! ```
//!
//! The server is authoritative after a successful save, which is why the
//! session is replaced by a fresh load instead of trusting the local copy.

use async_trait::async_trait;
use starlane_core::{ConfigModel, DashboardPage, FormatError};
use thiserror::Error;
use tracing::{info, warn};

use super::session::EditorSession;
use super::prompt::TokenPrompt;
use crate::infrastructure::kv::StorageError;

/// Failure to fetch the configuration.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not reach {url}: {message}")]
    Network { url: String, message: String },

    #[error("loading {url} failed with HTTP {status} {reason}")]
    Status {
        url: String,
        status: u16,
        reason: String,
    },

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("local storage: {0}")]
    Storage(#[from] StorageError),
}

/// Failure to persist the working copy.
#[derive(Debug, Error)]
pub enum SaveError {
    /// Another save from this session has not finished yet.
    #[error("a save is already in progress")]
    InFlight,

    /// The token prompt was dismissed; nothing was sent.
    #[error("save cancelled: no save token provided")]
    Cancelled,

    /// The server rejected the token (HTTP 401).  The cached token is purged.
    #[error("invalid save token; you will be asked for a new one on the next save")]
    Unauthorized,

    /// Any other non-success response.  Displays the server's text as-is.
    #[error("{body}")]
    Rejected { status: u16, body: String },

    #[error("could not reach the save endpoint: {0}")]
    Network(String),

    #[error("local storage: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Format(#[from] FormatError),

    /// The save was accepted but the follow-up load failed.
    #[error("saved, but reloading the configuration failed: {0}")]
    Reload(#[source] LoadError),
}

/// A source and sink for the configuration document.
///
/// Infrastructure implementations talk HTTP or a local key/value tier; tests
/// use recording doubles.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Fetches and normalises the current document.
    async fn load(&self) -> Result<ConfigModel, LoadError>;

    /// Persists `model`.  `token` is `None` for stores that do not need one.
    async fn save(&self, model: &ConfigModel, token: Option<&str>) -> Result<(), SaveError>;

    /// Whether [`save`](Self::save) needs a save token.
    fn requires_token(&self) -> bool;

    /// Human-readable location, for log messages.
    fn describe(&self) -> String;
}

/// Cache for the opaque save token.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;

    /// Caches `token`.  An error means it will be asked for again next time.
    fn remember(&self, token: &str) -> Result<(), StorageError>;

    /// Purges the token from every place it may be cached.
    fn forget(&self);
}

/// Summary of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    /// Group count of the reloaded document.
    pub groups: usize,
    /// Item count of the reloaded document.
    pub items: usize,
    /// Whether the token came from the interactive prompt.
    pub prompted: bool,
}

/// Loads the document for the read-only dashboard.
///
/// A load failure becomes the full-page error state rather than an empty page.
pub async fn load_dashboard(store: &dyn ConfigStore) -> DashboardPage {
    match store.load().await {
        Ok(model) => DashboardPage::from_model(&model),
        Err(e) => {
            warn!(store = %store.describe(), error = %e, "dashboard load failed");
            DashboardPage::error(format!("Failed to load configuration: {e}"))
        }
    }
}

/// Saves the session's working copy and reloads it from the store.
///
/// # Errors
///
/// See the module docs.  On every error the working copy is left as it was.
pub async fn save_session(
    session: &mut EditorSession,
    store: &dyn ConfigStore,
    tokens: &dyn TokenStore,
    prompt: &dyn TokenPrompt,
) -> Result<SaveReport, SaveError> {
    let control = session.save_control();
    let _guard = control.try_begin().ok_or(SaveError::InFlight)?;

    let snapshot = session.snapshot();

    let mut prompted = false;
    let token = if store.requires_token() {
        let token = match tokens.get() {
            Some(cached) => cached,
            None => {
                prompted = true;
                let entered = prompt
                    .prompt_token()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .ok_or(SaveError::Cancelled)?;
                if let Err(e) = tokens.remember(&entered) {
                    warn!(error = %e, "could not cache save token; will prompt again next time");
                }
                entered
            }
        };
        Some(token)
    } else {
        None
    };

    match store.save(&snapshot, token.as_deref()).await {
        Ok(()) => {}
        Err(SaveError::Unauthorized) => {
            warn!(store = %store.describe(), "save token rejected; purging cached token");
            tokens.forget();
            return Err(SaveError::Unauthorized);
        }
        Err(e) => {
            warn!(store = %store.describe(), error = %e, "save failed; edits kept");
            return Err(e);
        }
    }

    let reloaded = store.load().await.map_err(SaveError::Reload)?;
    let report = SaveReport {
        groups: reloaded.groups.len(),
        items: reloaded.item_count(),
        prompted,
    };
    session.replace(&reloaded);
    info!(
        store = %store.describe(),
        groups = report.groups,
        items = report.items,
        "configuration saved and reloaded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::prompt::ScriptedTokenPrompt;
    use starlane_core::{Group, Item};
    use std::sync::Mutex;

    // ── Test doubles ──────────────────────────────────────────────────────────

    /// Store whose save outcome is scripted per call and whose load returns
    /// whatever was last saved.
    #[derive(Default)]
    struct ScriptedStore {
        stored: Mutex<ConfigModel>,
        save_results: Mutex<Vec<Result<(), SaveError>>>,
        tokens_seen: Mutex<Vec<Option<String>>>,
        fail_load: bool,
        tokenless: bool,
    }

    impl ScriptedStore {
        fn with_results(results: Vec<Result<(), SaveError>>) -> Self {
            Self {
                save_results: Mutex::new(results),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl ConfigStore for ScriptedStore {
        async fn load(&self) -> Result<ConfigModel, LoadError> {
            if self.fail_load {
                return Err(LoadError::Network {
                    url: "mem://".into(),
                    message: "down".into(),
                });
            }
            Ok(self.stored.lock().unwrap().clone())
        }

        async fn save(&self, model: &ConfigModel, token: Option<&str>) -> Result<(), SaveError> {
            self.tokens_seen
                .lock()
                .unwrap()
                .push(token.map(str::to_string));
            let mut results = self.save_results.lock().unwrap();
            let result = if results.is_empty() {
                Ok(())
            } else {
                results.remove(0)
            };
            if result.is_ok() {
                *self.stored.lock().unwrap() = model.clone();
            }
            result
        }

        fn requires_token(&self) -> bool {
            !self.tokenless
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    #[derive(Default)]
    struct RecordingTokens {
        token: Mutex<Option<String>>,
        forgets: Mutex<usize>,
    }

    impl TokenStore for RecordingTokens {
        fn get(&self) -> Option<String> {
            self.token.lock().unwrap().clone()
        }

        fn remember(&self, token: &str) -> Result<(), StorageError> {
            *self.token.lock().unwrap() = Some(token.to_string());
            Ok(())
        }

        fn forget(&self) {
            *self.forgets.lock().unwrap() += 1;
            *self.token.lock().unwrap() = None;
        }
    }

    fn media_model() -> ConfigModel {
        ConfigModel {
            groups: vec![Group {
                name: "Media".into(),
                items: vec![Item {
                    name: "Jellyfin".into(),
                    url: "https://x.test".into(),
                    icon: String::new(),
                }],
            }],
            ..ConfigModel::default()
        }
    }

    // ── save ──────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_save_prompts_once_then_uses_cached_token() {
        let store = ScriptedStore::default();
        let tokens = RecordingTokens::default();
        let prompt = ScriptedTokenPrompt::new([Some("tok")]);
        let mut session = EditorSession::new(&media_model());

        let first = save_session(&mut session, &store, &tokens, &prompt).await.unwrap();
        let second = save_session(&mut session, &store, &tokens, &prompt).await.unwrap();

        assert!(first.prompted);
        assert!(!second.prompted);
        assert_eq!(prompt.times_asked(), 1);
        assert_eq!(
            *store.tokens_seen.lock().unwrap(),
            vec![Some("tok".to_string()), Some("tok".to_string())]
        );
    }

    #[tokio::test]
    async fn test_save_401_purges_token_and_reprompts_next_time() {
        // Arrange
        let store = ScriptedStore::with_results(vec![Err(SaveError::Unauthorized), Ok(())]);
        let tokens = RecordingTokens::default();
        *tokens.token.lock().unwrap() = Some("stale".into());
        let prompt = ScriptedTokenPrompt::new([Some("fresh")]);
        let mut session = EditorSession::new(&media_model());
        session.groups().rename_group("Media", "Home").unwrap();

        // Act
        let rejected = save_session(&mut session, &store, &tokens, &prompt).await;

        // Assert: purged, edits preserved, no prompt yet
        assert!(matches!(rejected, Err(SaveError::Unauthorized)));
        assert_eq!(*tokens.forgets.lock().unwrap(), 1);
        assert_eq!(tokens.get(), None);
        assert_eq!(session.working_copy().group_names(), vec!["Home"]);
        assert_eq!(prompt.times_asked(), 0);

        // Act: next attempt asks again and uses the new token
        let report = save_session(&mut session, &store, &tokens, &prompt).await.unwrap();

        assert!(report.prompted);
        assert_eq!(
            store.tokens_seen.lock().unwrap().last().cloned().flatten().as_deref(),
            Some("fresh")
        );
    }

    #[tokio::test]
    async fn test_save_cancelled_prompt_sends_nothing() {
        let store = ScriptedStore::default();
        let tokens = RecordingTokens::default();
        let prompt = ScriptedTokenPrompt::new([None::<String>]);
        let mut session = EditorSession::new(&media_model());

        let result = save_session(&mut session, &store, &tokens, &prompt).await;

        assert!(matches!(result, Err(SaveError::Cancelled)));
        assert!(store.tokens_seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_blank_token_counts_as_cancel() {
        let store = ScriptedStore::default();
        let tokens = RecordingTokens::default();
        let prompt = ScriptedTokenPrompt::new([Some("   ")]);
        let mut session = EditorSession::new(&media_model());

        let result = save_session(&mut session, &store, &tokens, &prompt).await;

        assert!(matches!(result, Err(SaveError::Cancelled)));
        assert_eq!(tokens.get(), None);
    }

    #[tokio::test]
    async fn test_save_rejected_keeps_edits_and_token() {
        let store = ScriptedStore::with_results(vec![Err(SaveError::Rejected {
            status: 500,
            body: "disk full".into(),
        })]);
        let tokens = RecordingTokens::default();
        *tokens.token.lock().unwrap() = Some("tok".into());
        let prompt = ScriptedTokenPrompt::new(Vec::<Option<String>>::new());
        let mut session = EditorSession::new(&media_model());
        session.groups().add_group("Tools").unwrap();

        let result = save_session(&mut session, &store, &tokens, &prompt).await;

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert_eq!(session.working_copy().group_names(), vec!["Media", "Tools"]);
        assert_eq!(tokens.get().as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_save_success_replaces_session_with_reloaded_copy() {
        let store = ScriptedStore::default();
        let tokens = RecordingTokens::default();
        let prompt = ScriptedTokenPrompt::new([Some("tok")]);
        let mut session = EditorSession::new(&media_model());
        session.groups().rename_group("Media", "Home").unwrap();

        let report = save_session(&mut session, &store, &tokens, &prompt).await.unwrap();

        assert_eq!(report, SaveReport { groups: 1, items: 1, prompted: true });
        let jellyfin = session.working_copy().find_item("Home", "Jellyfin");
        assert!(jellyfin.is_some());
        assert!(session.working_copy().group("Media").is_none());
    }

    #[tokio::test]
    async fn test_save_without_token_store_never_prompts() {
        let store = ScriptedStore {
            tokenless: true,
            ..ScriptedStore::default()
        };
        let tokens = RecordingTokens::default();
        let prompt = ScriptedTokenPrompt::new([Some("unused")]);
        let mut session = EditorSession::new(&media_model());

        save_session(&mut session, &store, &tokens, &prompt).await.unwrap();

        assert_eq!(prompt.times_asked(), 0);
        assert_eq!(*store.tokens_seen.lock().unwrap(), vec![None]);
    }

    #[tokio::test]
    async fn test_save_reload_failure_keeps_working_copy() {
        let store = ScriptedStore {
            fail_load: true,
            tokenless: true,
            ..ScriptedStore::default()
        };
        let tokens = RecordingTokens::default();
        let prompt = ScriptedTokenPrompt::new(Vec::<Option<String>>::new());
        let mut session = EditorSession::new(&media_model());
        session.groups().add_group("Tools").unwrap();

        let result = save_session(&mut session, &store, &tokens, &prompt).await;

        assert!(matches!(result, Err(SaveError::Reload(_))));
        assert_eq!(session.working_copy().group_names(), vec!["Media", "Tools"]);
    }

    #[tokio::test]
    async fn test_save_while_in_flight_is_refused() {
        let store = ScriptedStore::default();
        let tokens = RecordingTokens::default();
        let prompt = ScriptedTokenPrompt::new([Some("tok")]);
        let mut session = EditorSession::new(&media_model());
        let control = session.save_control();
        let held = control.try_begin().expect("first begin succeeds");

        let result = save_session(&mut session, &store, &tokens, &prompt).await;

        assert!(matches!(result, Err(SaveError::InFlight)));
        assert!(store.tokens_seen.lock().unwrap().is_empty());
        drop(held);
        assert!(!control.is_in_flight());
    }

    // ── dashboard ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_load_dashboard_failure_becomes_error_page() {
        let store = ScriptedStore {
            fail_load: true,
            ..ScriptedStore::default()
        };

        let page = load_dashboard(&store).await;

        assert!(matches!(page, DashboardPage::Error { .. }));
    }

    #[tokio::test]
    async fn test_load_dashboard_success_projects_model() {
        let store = ScriptedStore::default();
        *store.stored.lock().unwrap() = media_model();

        let page = load_dashboard(&store).await;

        match page {
            DashboardPage::Ready(view) => assert_eq!(view.sections.len(), 1),
            other => panic!("expected ready page, got {other:?}"),
        }
    }
}
