//! TOML settings for the `starlane` tool itself (not the dashboard document).
//!
//! Read from the platform-appropriate file:
//! - Windows:  `%APPDATA%\Starlane\settings.toml`
//! - Linux:    `~/.config/starlane/settings.toml`
//! - macOS:    `~/Library/Application Support/Starlane/settings.toml`
//!
//! Example:
//!
//! ```toml
//! [general]
//! log_level = "debug"
//!
//! [remote]
//! base_url = "http://nas.local:8899"
//!
//! [storage]
//! mode = "remote"
//! offline_fallback = true
//! ```
//!
//! Every field has a `#[serde(default = ...)]` helper, so a missing file, a
//! missing section or a missing key all fall back to working defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reading or writing the settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Schema ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppSettings {
    #[serde(default)]
    pub general: GeneralSettings,
    #[serde(default)]
    pub remote: RemoteSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralSettings {
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Where the remote endpoints live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Read endpoint, relative to `base_url`.
    #[serde(default = "default_config_path")]
    pub config_path: String,
    /// Write endpoint, relative to `base_url`.
    #[serde(default = "default_save_path")]
    pub save_path: String,
    /// Request header carrying the save token.
    #[serde(default = "default_token_header")]
    pub token_header: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl RemoteSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Deployment mode for the configuration document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Read and write through the HTTP endpoints.
    #[default]
    Remote,
    /// Keep the document in the local key/value store.
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageSettings {
    #[serde(default)]
    pub mode: StorageMode,
    /// Directory for the token cache and local-mode data.  Defaults to a
    /// `data` directory beside the settings file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Serve the last successfully loaded remote document when the endpoint
    /// is unreachable.
    #[serde(default)]
    pub offline_fallback: bool,
    /// JSON document used to seed local mode on first load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_file: Option<PathBuf>,
}

impl StorageSettings {
    /// # Errors
    ///
    /// [`SettingsError::NoPlatformConfigDir`] when no `data_dir` is set and the
    /// platform directory is unknown.
    pub fn resolved_data_dir(&self) -> Result<PathBuf, SettingsError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(settings_dir()?.join("data")),
        }
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_base_url() -> String {
    "http://localhost:8899".to_string()
}
fn default_config_path() -> String {
    "/data/config.json".to_string()
}
fn default_save_path() -> String {
    "/api/save".to_string()
}
fn default_token_header() -> String {
    "X-Save-Token".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            config_path: default_config_path(),
            save_path: default_save_path(),
            token_header: default_token_header(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

/// The platform directory holding `settings.toml`.
///
/// # Errors
///
/// [`SettingsError::NoPlatformConfigDir`] when the environment gives no base.
pub fn settings_dir() -> Result<PathBuf, SettingsError> {
    platform_config_dir().ok_or(SettingsError::NoPlatformConfigDir)
}

/// # Errors
///
/// See [`settings_dir`].
pub fn settings_file_path() -> Result<PathBuf, SettingsError> {
    Ok(settings_dir()?.join("settings.toml"))
}

/// Loads settings from `path`, or defaults when the file does not exist.
///
/// # Errors
///
/// [`SettingsError::Io`] for errors other than "not found",
/// [`SettingsError::Parse`] for malformed TOML.
pub fn load_settings_from(path: &Path) -> Result<AppSettings, SettingsError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppSettings::default()),
        Err(source) => Err(SettingsError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `settings` to `path`, creating parent directories.
///
/// # Errors
///
/// [`SettingsError::Io`] or [`SettingsError::Serialize`].
pub fn save_settings_to(path: &Path, settings: &AppSettings) -> Result<(), SettingsError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| SettingsError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let content = toml::to_string_pretty(settings)?;
    std::fs::write(path, content).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Starlane"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("starlane"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Starlane")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_defaults_match_endpoints() {
        let settings = AppSettings::default();

        assert_eq!(settings.general.log_level, "info");
        assert_eq!(settings.remote.config_path, "/data/config.json");
        assert_eq!(settings.remote.save_path, "/api/save");
        assert_eq!(settings.remote.token_header, "X-Save-Token");
        assert_eq!(settings.storage.mode, StorageMode::Remote);
        assert!(!settings.storage.offline_fallback);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let settings: AppSettings = toml::from_str("").expect("empty is valid");
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        // Arrange
        let text = r#"
[remote]
base_url = "http://nas.local:8899"

[storage]
mode = "local"
"#;

        // Act
        let settings: AppSettings = toml::from_str(text).expect("parse");

        // Assert
        assert_eq!(settings.remote.base_url, "http://nas.local:8899");
        assert_eq!(settings.remote.timeout_secs, 30);
        assert_eq!(settings.storage.mode, StorageMode::Local);
        assert_eq!(settings.general.log_level, "info");
    }

    #[test]
    fn test_unknown_mode_is_parse_error() {
        let result: Result<AppSettings, _> = toml::from_str("[storage]\nmode = \"cloud\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_load_round_trip_via_temp_dir() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("starlane_settings_{}", Uuid::new_v4()));
        let path = dir.join("nested").join("settings.toml");
        let mut settings = AppSettings::default();
        settings.general.log_level = "debug".into();
        settings.storage.data_dir = Some(dir.join("data"));
        settings.storage.offline_fallback = true;

        // Act
        save_settings_to(&path, &settings).expect("save");
        let loaded = load_settings_from(&path).expect("load");

        // Assert
        assert_eq!(loaded, settings);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::env::temp_dir()
            .join(format!("starlane_missing_{}", Uuid::new_v4()))
            .join("settings.toml");

        let loaded = load_settings_from(&path).expect("missing file is fine");

        assert_eq!(loaded, AppSettings::default());
    }

    #[test]
    fn test_load_malformed_file_is_parse_error() {
        let dir = std::env::temp_dir().join(format!("starlane_bad_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.toml");
        std::fs::write(&path, "[[[ nope").unwrap();

        let result = load_settings_from(&path);

        assert!(matches!(result, Err(SettingsError::Parse(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_explicit_data_dir_wins() {
        let storage = StorageSettings {
            data_dir: Some(PathBuf::from("/srv/starlane")),
            ..StorageSettings::default()
        };

        assert_eq!(
            storage.resolved_data_dir().unwrap(),
            PathBuf::from("/srv/starlane")
        );
    }

    #[test]
    fn test_settings_file_path_ends_with_settings_toml() {
        if let Ok(path) = settings_file_path() {
            assert!(path.ends_with("settings.toml"), "got {path:?}");
        }
    }
}
