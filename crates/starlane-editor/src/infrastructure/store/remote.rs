//! HTTP store: `GET` the read endpoint, `POST` to the write endpoint.
//!
//! Reads always bypass caches so a reload after save never shows the old
//! document.  Writes carry the save token in a configurable header
//! (`X-Save-Token` by default).  A 401 maps to [`SaveError::Unauthorized`];
//! any other failure keeps the server's response text verbatim.
//!
//! Endpoint paths are resolved under the base URL's path, so a dashboard
//! served from `http://nas/starlane/` reads `http://nas/starlane/data/config.json`.

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use reqwest::{Client, StatusCode};
use starlane_core::{parse, serialize, ConfigModel};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::application::sync::{ConfigStore, LoadError, SaveError};
use crate::infrastructure::settings::RemoteSettings;

/// Errors building a [`RemoteStore`] from settings.
#[derive(Debug, Error)]
pub enum RemoteStoreError {
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid token header name \"{0}\"")]
    InvalidHeader(String),

    #[error("failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// [`ConfigStore`] backed by the read/write HTTP endpoints.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: Client,
    config_url: Url,
    save_url: Url,
    token_header: HeaderName,
}

impl RemoteStore {
    /// # Errors
    ///
    /// Invalid base URL or endpoint path, invalid header name, or a client
    /// that cannot be built.
    pub fn new(settings: &RemoteSettings) -> Result<Self, RemoteStoreError> {
        let mut base =
            Url::parse(&settings.base_url).map_err(|source| RemoteStoreError::InvalidUrl {
                url: settings.base_url.clone(),
                source,
            })?;
        if !base.path().ends_with('/') {
            let dir = format!("{}/", base.path());
            base.set_path(&dir);
        }
        let join = |path: &str| {
            base.join(path.trim_start_matches('/'))
                .map_err(|source| RemoteStoreError::InvalidUrl {
                    url: format!("{base}{path}"),
                    source,
                })
        };
        let config_url = join(&settings.config_path)?;
        let save_url = join(&settings.save_path)?;
        let token_header = HeaderName::from_bytes(settings.token_header.as_bytes())
            .map_err(|_| RemoteStoreError::InvalidHeader(settings.token_header.clone()))?;

        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(format!("starlane/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            config_url,
            save_url,
            token_header,
        })
    }

    pub fn config_url(&self) -> &Url {
        &self.config_url
    }

    pub fn save_url(&self) -> &Url {
        &self.save_url
    }
}

#[async_trait]
impl ConfigStore for RemoteStore {
    async fn load(&self) -> Result<ConfigModel, LoadError> {
        let url = self.config_url.to_string();
        let network = |e: reqwest::Error| LoadError::Network {
            url: url.clone(),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(self.config_url.clone())
            .header(CACHE_CONTROL, "no-cache, no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                url: url.clone(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let text = response.text().await.map_err(network)?;
        let model = parse(&text)?;
        debug!(%url, groups = model.groups.len(), "configuration fetched");
        Ok(model)
    }

    async fn save(&self, model: &ConfigModel, token: Option<&str>) -> Result<(), SaveError> {
        let body = serialize(model)?;
        let mut request = self
            .client
            .post(self.save_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(token) = token {
            // Treated as a rejected token so the cached copy is purged.
            let value = HeaderValue::from_str(token).map_err(|_| {
                warn!("save token contains characters not allowed in a header");
                SaveError::Unauthorized
            })?;
            request = request.header(self.token_header.clone(), value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SaveError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(SaveError::Unauthorized);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = if text.trim().is_empty() {
                format!("save failed with HTTP {status}")
            } else {
                text
            };
            return Err(SaveError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(url = %self.save_url, "configuration accepted by server");
        Ok(())
    }

    fn requires_token(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        self.config_url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_joins_endpoints_onto_base() {
        let settings = RemoteSettings {
            base_url: "http://nas.local:8899".into(),
            ..RemoteSettings::default()
        };

        let store = RemoteStore::new(&settings).unwrap();

        assert_eq!(store.config_url().as_str(), "http://nas.local:8899/data/config.json");
        assert_eq!(store.save_url().as_str(), "http://nas.local:8899/api/save");
        assert!(store.requires_token());
    }

    #[test]
    fn test_new_keeps_base_url_subpath() {
        for base_url in ["http://nas.local/starlane", "http://nas.local/starlane/"] {
            let settings = RemoteSettings {
                base_url: base_url.into(),
                ..RemoteSettings::default()
            };

            let store = RemoteStore::new(&settings).unwrap();

            assert_eq!(
                store.config_url().as_str(),
                "http://nas.local/starlane/data/config.json"
            );
            assert_eq!(store.save_url().as_str(), "http://nas.local/starlane/api/save");
        }
    }

    #[test]
    fn test_new_accepts_absolute_endpoint_urls() {
        let settings = RemoteSettings {
            base_url: "http://nas.local/starlane/".into(),
            save_path: "https://writer.local/api/save".into(),
            ..RemoteSettings::default()
        };

        let store = RemoteStore::new(&settings).unwrap();

        assert_eq!(store.save_url().as_str(), "https://writer.local/api/save");
    }

    #[tokio::test]
    async fn test_save_with_unsendable_token_is_unauthorized() {
        // Arrange: nothing listens here; the token is refused before sending
        let store = RemoteStore::new(&RemoteSettings {
            base_url: "http://127.0.0.1:9".into(),
            ..RemoteSettings::default()
        })
        .unwrap();

        // Act
        let result = store
            .save(&ConfigModel::default(), Some("line\nbreak"))
            .await;

        // Assert
        assert!(matches!(result, Err(SaveError::Unauthorized)));
    }

    #[test]
    fn test_new_rejects_bad_base_url() {
        let settings = RemoteSettings {
            base_url: "not a url".into(),
            ..RemoteSettings::default()
        };

        assert!(matches!(
            RemoteStore::new(&settings),
            Err(RemoteStoreError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_new_rejects_bad_header_name() {
        let settings = RemoteSettings {
            token_header: "X Save Token".into(),
            ..RemoteSettings::default()
        };

        assert!(matches!(
            RemoteStore::new(&settings),
            Err(RemoteStoreError::InvalidHeader(_))
        ));
    }
}
