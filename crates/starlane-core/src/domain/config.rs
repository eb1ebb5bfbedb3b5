//! The configuration document domain entity.
//!
//! A [`ConfigModel`] is what the read endpoint serves, what the write endpoint
//! accepts, and what import/export files contain.  The JSON shape is:
//!
//! ```json
//! {
//!   "pageTitle": "Home Lab",
//!   "theme": "auto",
//!   "backgroundType": "color",
//!   "backgroundColor": "#f0f2f5",
//!   "backgroundImage": "",
//!   "groups": [
//!     { "name": "Media", "items": [
//!       { "name": "Jellyfin", "url": "https://jellyfin.lan", "icon": "" }
//!     ] }
//!   ]
//! }
//! ```
//!
//! # Why `normalize` never fails (for beginners)
//!
//! Configuration files are edited by hand, produced by older versions, or
//! partially written.  Rather than refusing to show anything, [`normalize`]
//! fills a default for every missing field and silently drops entries that
//! cannot be rendered (items without a name or URL, groups without a name).
//! Anything that is not even a JSON object degrades to an empty configuration.
//!
//! Strictness lives at the edges instead: [`parse`] rejects text that is not
//! JSON at all, and the editor rejects invalid names before they are committed.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Background colour used when the document does not specify a valid one.
pub const DEFAULT_BACKGROUND_COLOR: &str = "#f0f2f5";

/// Validation failures raised while editing.  These are recovered locally and
/// surfaced inline; they never propagate past the editor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A group name was empty (after trimming).
    #[error("group name must not be empty")]
    EmptyGroupName,

    /// A group name collides with an existing group.
    #[error("a group named \"{0}\" already exists")]
    DuplicateGroupName(String),

    /// An operation referenced a group that is not in the working copy.
    #[error("no group named \"{0}\"")]
    UnknownGroup(String),

    /// An item was committed without a name.
    #[error("item name must not be empty")]
    EmptyItemName,

    /// An item URL is missing its scheme or host.
    #[error("\"{0}\" is not a valid URL")]
    InvalidUrl(String),

    /// A background colour is not in `#rrggbb` form.
    #[error("\"{0}\" is not a #rrggbb colour")]
    InvalidColor(String),
}

/// Errors from turning text into a [`ConfigModel`] or back.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The text is not valid JSON.
    #[error("file content is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The JSON is valid but the top-level value is not an object.
    #[error("configuration must be a JSON object, found {0}")]
    NotAnObject(&'static str),

    /// The model could not be written out as JSON.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[source] serde_json::Error),
}

// ── Schema types ──────────────────────────────────────────────────────────────

/// Colour scheme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    /// Follow the viewer's system preference.
    #[default]
    Auto,
}

impl Theme {
    /// Maps a stored theme string to a [`Theme`], falling back to `Auto`.
    pub fn from_lenient(value: &str) -> Self {
        match value {
            "light" => Theme::Light,
            "dark" => Theme::Dark,
            _ => Theme::Auto,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Auto => "auto",
        }
    }

    /// Resolves `Auto` against the viewer's preference.
    pub fn resolve(self, prefers_dark: bool) -> Theme {
        match self {
            Theme::Auto if prefers_dark => Theme::Dark,
            Theme::Auto => Theme::Light,
            other => other,
        }
    }
}

/// Whether the page background is a flat colour or an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundType {
    #[default]
    Color,
    Image,
}

/// Page background settings.  Serialised flat into the top-level object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Background {
    #[serde(rename = "backgroundType")]
    pub kind: BackgroundType,
    /// `#rrggbb` colour.
    #[serde(rename = "backgroundColor")]
    pub color: String,
    /// Image URL or embedded `data:` URL.  May be empty.
    #[serde(rename = "backgroundImage")]
    pub image: String,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            kind: BackgroundType::Color,
            color: DEFAULT_BACKGROUND_COLOR.to_string(),
            image: String::new(),
        }
    }
}

/// A single link entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub name: String,
    pub url: String,
    /// Icon URL or embedded data.  Empty when the item has no icon.
    pub icon: String,
}

/// A named, ordered bucket of items.  The name is the group's identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub name: String,
    pub items: Vec<Item>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }
}

/// The complete dashboard configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigModel {
    pub page_title: String,
    pub theme: Theme,
    #[serde(flatten)]
    pub background: Background,
    pub groups: Vec<Group>,
}

impl ConfigModel {
    /// Returns the group names in display order.
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Total number of items across all groups.
    pub fn item_count(&self) -> usize {
        self.groups.iter().map(|g| g.items.len()).sum()
    }
}

// ── Normalisation ─────────────────────────────────────────────────────────────

/// Builds a [`ConfigModel`] from arbitrary JSON, filling defaults.
///
/// - `theme` other than `light`/`dark`/`auto` becomes `auto`.
/// - `backgroundType` other than `color`/`image` becomes `color`.
/// - A `backgroundColor` that is not `#rrggbb` becomes [`DEFAULT_BACKGROUND_COLOR`].
/// - Items missing `name` or `url` are dropped; a missing `icon` becomes `""`.
/// - Groups without a name are dropped; a repeated group name merges its items
///   into the first group with that name.
/// - Background settings are also accepted nested under a `background` object
///   (`{type, color, image}`), flat keys taking precedence.
pub fn normalize(raw: &Value) -> ConfigModel {
    let Some(obj) = raw.as_object() else {
        warn!("configuration is not a JSON object; using an empty configuration");
        return ConfigModel::default();
    };

    let nested = obj.get("background").and_then(Value::as_object);

    let kind = match background_field(obj, nested, "backgroundType", "type") {
        Some("image") => BackgroundType::Image,
        _ => BackgroundType::Color,
    };
    let color = background_field(obj, nested, "backgroundColor", "color")
        .filter(|c| is_hex_color(c))
        .unwrap_or(DEFAULT_BACKGROUND_COLOR)
        .to_string();
    let image = background_field(obj, nested, "backgroundImage", "image")
        .unwrap_or_default()
        .to_string();

    ConfigModel {
        page_title: string_field(obj, "pageTitle").unwrap_or_default().to_string(),
        theme: string_field(obj, "theme")
            .map(Theme::from_lenient)
            .unwrap_or_default(),
        background: Background { kind, color, image },
        groups: normalize_groups(obj.get("groups")),
    }
}

fn background_field<'a>(
    obj: &'a Map<String, Value>,
    nested: Option<&'a Map<String, Value>>,
    flat: &str,
    inner: &str,
) -> Option<&'a str> {
    string_field(obj, flat).or_else(|| nested.and_then(|n| string_field(n, inner)))
}

fn normalize_groups(raw: Option<&Value>) -> Vec<Group> {
    let Some(entries) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut groups: Vec<Group> = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(obj) = entry.as_object() else {
            debug!("skipping group entry that is not an object");
            continue;
        };
        let name = string_field(obj, "name").map(str::trim).unwrap_or_default();
        if name.is_empty() {
            debug!("skipping group without a name");
            continue;
        }
        let items = normalize_items(obj.get("items"));
        match groups.iter_mut().find(|g| g.name == name) {
            Some(existing) => {
                warn!(group = name, "merging duplicate group into its first occurrence");
                existing.items.extend(items);
            }
            None => groups.push(Group {
                name: name.to_string(),
                items,
            }),
        }
    }
    groups
}

fn normalize_items(raw: Option<&Value>) -> Vec<Item> {
    let Some(entries) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let obj = entry.as_object()?;
            let name = string_field(obj, "name").filter(|s| !s.trim().is_empty());
            let url = string_field(obj, "url").filter(|s| !s.trim().is_empty());
            match (name, url) {
                (Some(name), Some(url)) => Some(Item {
                    name: name.to_string(),
                    url: url.to_string(),
                    icon: string_field(obj, "icon").unwrap_or_default().to_string(),
                }),
                _ => {
                    debug!("dropping item without name or url");
                    None
                }
            }
        })
        .collect()
}

fn string_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

/// Returns `true` for `#rrggbb` colour strings.
pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

// ── Validation ────────────────────────────────────────────────────────────────

/// Checks a candidate group name and returns it trimmed.
///
/// `excluding` names one existing group that the candidate may equal, which
/// is how a rename to the group's own name is allowed.  Comparison is
/// case-sensitive.
///
/// # Errors
///
/// [`ValidationError::EmptyGroupName`] or [`ValidationError::DuplicateGroupName`].
pub fn check_group_name<'a, I>(
    candidate: &str,
    existing: I,
    excluding: Option<&str>,
) -> Result<String, ValidationError>
where
    I: IntoIterator<Item = &'a str>,
{
    let name = candidate.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyGroupName);
    }
    let taken = existing
        .into_iter()
        .filter(|existing| Some(*existing) != excluding)
        .any(|existing| existing == name);
    if taken {
        return Err(ValidationError::DuplicateGroupName(name.to_string()));
    }
    Ok(name.to_string())
}

/// Boolean form of [`check_group_name`].
pub fn validate_group_name<'a, I>(candidate: &str, existing: I, excluding: Option<&str>) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    check_group_name(candidate, existing, excluding).is_ok()
}

/// Returns `true` when `value` parses as a URL with both a scheme and a host.
///
/// This is the check applied when an item is committed in the editor.
pub fn is_valid_item_url(value: &str) -> bool {
    Url::parse(value.trim())
        .map(|u| u.host_str().is_some_and(|h| !h.is_empty()))
        .unwrap_or(false)
}

/// Returns `true` for absolute `http`/`https` URLs, the only links the
/// dashboard renders as clickable.
pub fn is_renderable_url(value: &str) -> bool {
    Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

// ── Text form ─────────────────────────────────────────────────────────────────

/// Pretty-prints the model as JSON, the format used for export and save.
///
/// # Errors
///
/// [`FormatError::Serialize`] if serde_json fails, which does not happen for
/// well-formed models.
pub fn serialize(model: &ConfigModel) -> Result<String, FormatError> {
    serde_json::to_string_pretty(model).map_err(FormatError::Serialize)
}

/// Parses JSON text into a normalised model.
///
/// # Errors
///
/// [`FormatError::InvalidJson`] when the text is not JSON and
/// [`FormatError::NotAnObject`] when the top-level value is not an object.
pub fn parse(text: &str) -> Result<ConfigModel, FormatError> {
    let value: Value = serde_json::from_str(text).map_err(FormatError::InvalidJson)?;
    if !value.is_object() {
        return Err(FormatError::NotAnObject(json_kind(&value)));
    }
    Ok(normalize(&value))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
