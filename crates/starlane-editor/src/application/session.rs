//! EditorSession: the single owner of everything an open settings panel holds.
//!
//! # Why a session object? (for beginners)
//!
//! An editor needs more than the document itself: which group is being
//! dragged, whether the add/edit form is open and for what, and whether a save
//! is currently running.  Keeping all of it in one struct that handlers borrow
//! explicitly means every state transition is visible in a function signature
//! and can be unit-tested without any rendering surface.
//!
//! ```text
//! EditorSession
//!   ├─ WorkingCopy      (groups, items, page settings)
//!   ├─ DragState        (GroupOrderEditor drag session)
//!   ├─ EditSurface      (ItemEditor form binding)
//!   └─ SaveControl      (in-flight flag + button label)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use starlane_core::domain::config::is_hex_color;
use starlane_core::{
    parse, serialize, BackgroundType, ConfigModel, FormatError, Theme, ValidationError,
};
use tracing::{info, warn};

use super::group_order::{DragState, GroupOrderEditor};
use super::item_editor::{EditSurface, ItemEditor};
use super::prompt::Confirm;
use super::sync::{ConfigStore, LoadError};
use super::working_copy::{PageSettings, WorkingCopy};

/// Label of the save control when idle.
pub const SAVE_LABEL_IDLE: &str = "Save and reload";
/// Label of the save control while a save is running.
pub const SAVE_LABEL_BUSY: &str = "Saving...";

// ── Save control ──────────────────────────────────────────────────────────────

/// Shared in-flight flag for the save control.
///
/// Cloning yields another handle to the same flag, so a UI can observe the
/// state while the save future runs.
#[derive(Debug, Clone, Default)]
pub struct SaveControl {
    in_flight: Arc<AtomicBool>,
}

impl SaveControl {
    /// Marks a save as started.  Returns `None` if one is already running.
    /// The flag is cleared when the returned guard is dropped.
    pub fn try_begin(&self) -> Option<SaveGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SaveGuard {
                in_flight: Arc::clone(&self.in_flight),
            })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Text for the save button.
    pub fn label(&self) -> &'static str {
        if self.is_in_flight() {
            SAVE_LABEL_BUSY
        } else {
            SAVE_LABEL_IDLE
        }
    }
}

/// Clears the in-flight flag on drop, whatever way the save ends.
#[derive(Debug)]
pub struct SaveGuard {
    in_flight: Arc<AtomicBool>,
}

impl Drop for SaveGuard {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

// ── Outcomes ──────────────────────────────────────────────────────────────────

/// Result of [`EditorSession::import`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The working copy was replaced; a save is needed to persist it.
    Staged { groups: usize, items: usize },
    /// The user declined to overwrite the working copy.
    Declined,
}

/// Result of [`EditorSession::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    Reloaded,
    Declined,
}

// ── Session ───────────────────────────────────────────────────────────────────

/// One open editing session over a working copy.
#[derive(Debug, Default)]
pub struct EditorSession {
    copy: WorkingCopy,
    drag: DragState,
    surface: EditSurface,
    save: SaveControl,
}

impl EditorSession {
    pub fn new(model: &ConfigModel) -> Self {
        Self {
            copy: WorkingCopy::from_model(model),
            ..Self::default()
        }
    }

    /// Loads from `store` and opens a session over the result.
    ///
    /// # Errors
    ///
    /// Propagates the store's [`LoadError`].
    pub async fn open(store: &dyn ConfigStore) -> Result<Self, LoadError> {
        let model = store.load().await?;
        info!(
            store = %store.describe(),
            groups = model.groups.len(),
            items = model.item_count(),
            "editor session opened"
        );
        Ok(Self::new(&model))
    }

    /// Discards every edit and reloads from `store`, after confirmation.
    ///
    /// # Errors
    ///
    /// On a [`LoadError`] the session keeps its current state.
    pub async fn reset(
        &mut self,
        store: &dyn ConfigStore,
        confirm: &dyn Confirm,
    ) -> Result<ResetOutcome, LoadError> {
        if !confirm.confirm(
            "This discards every change made in the settings panel and returns to the last saved state. Continue?",
        ) {
            return Ok(ResetOutcome::Declined);
        }
        let model = store.load().await?;
        self.replace(&model);
        info!(store = %store.describe(), "working copy reset");
        Ok(ResetOutcome::Reloaded)
    }

    // ── Editors ───────────────────────────────────────────────────────────────

    pub fn groups(&mut self) -> GroupOrderEditor<'_> {
        GroupOrderEditor::new(&mut self.copy, &mut self.drag, &mut self.surface)
    }

    pub fn items(&mut self) -> ItemEditor<'_> {
        ItemEditor::new(&mut self.copy, &mut self.surface)
    }

    pub fn working_copy(&self) -> &WorkingCopy {
        &self.copy
    }

    pub fn surface(&self) -> &EditSurface {
        &self.surface
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    /// Closes the add/edit form, discarding uncommitted field edits.  Already
    /// committed changes stay in the working copy.
    pub fn close_surface(&mut self) {
        self.surface = EditSurface::Closed;
    }

    // ── Page settings ─────────────────────────────────────────────────────────

    pub fn settings(&self) -> &PageSettings {
        &self.copy.settings
    }

    pub fn set_page_title(&mut self, title: &str) {
        self.copy.settings.page_title = title.trim().to_string();
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.copy.settings.theme = theme;
    }

    pub fn set_background_kind(&mut self, kind: BackgroundType) {
        self.copy.settings.background.kind = kind;
    }

    /// # Errors
    ///
    /// [`ValidationError::InvalidColor`] unless `color` is `#rrggbb`.
    pub fn set_background_color(&mut self, color: &str) -> Result<(), ValidationError> {
        let color = color.trim();
        if !is_hex_color(color) {
            return Err(ValidationError::InvalidColor(color.to_string()));
        }
        self.copy.settings.background.color = color.to_string();
        Ok(())
    }

    /// Sets the background image (URL or `data:` URL) and switches the
    /// background to image mode.  An empty value clears the image.
    pub fn set_background_image(&mut self, image: impl Into<String>) {
        let image = image.into();
        if !image.is_empty() {
            self.copy.settings.background.kind = BackgroundType::Image;
        }
        self.copy.settings.background.image = image;
    }

    // ── Persistence ───────────────────────────────────────────────────────────

    /// The document as it would be saved now, unsaved edits included.
    pub fn snapshot(&self) -> ConfigModel {
        self.copy.to_model()
    }

    /// Pretty-printed JSON of the working copy.
    ///
    /// # Errors
    ///
    /// [`FormatError::Serialize`] only.
    pub fn export(&self) -> Result<String, FormatError> {
        serialize(&self.snapshot())
    }

    /// Parses `text` and, after confirmation, stages it as the new working
    /// copy.  Nothing is persisted until the next save.
    ///
    /// # Errors
    ///
    /// [`FormatError`] when `text` is not a JSON object; the working copy is
    /// untouched and the user is not asked anything.
    pub fn import(&mut self, text: &str, confirm: &dyn Confirm) -> Result<ImportOutcome, FormatError> {
        let model = parse(text).map_err(|e| {
            warn!(error = %e, "import rejected");
            e
        })?;
        if !confirm.confirm(
            "Importing replaces everything in the settings panel (save afterwards to apply it). Continue?",
        ) {
            return Ok(ImportOutcome::Declined);
        }
        self.replace(&model);
        info!(
            groups = model.groups.len(),
            items = model.item_count(),
            "configuration imported; save to persist"
        );
        Ok(ImportOutcome::Staged {
            groups: model.groups.len(),
            items: model.item_count(),
        })
    }

    /// Replaces the working copy wholesale and closes every transient state.
    /// The save control handle is kept.
    pub(crate) fn replace(&mut self, model: &ConfigModel) {
        self.copy = WorkingCopy::from_model(model);
        self.drag = DragState::default();
        self.surface = EditSurface::Closed;
    }

    /// A handle to this session's save control.
    pub fn save_control(&self) -> SaveControl {
        self.save.clone()
    }

    pub fn save_label(&self) -> &'static str {
        self.save.label()
    }
}
