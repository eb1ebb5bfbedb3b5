//! ItemEditor: add, edit, delete and move items within the working copy.
//!
//! # The edit surface (for beginners)
//!
//! There is exactly one add/edit form.  Opening it records *what* the form is
//! for in an [`EditSurface`] value owned by the session, instead of in ambient
//! "currently editing" globals:
//!
//! ```text
//! Closed ──begin_add(group)──► Adding { target_group } ──commit──► Closed
//!    │                               └──────cancel/close───────► Closed
//!    └────begin_edit(item)───► Editing { item } ──commit/delete──► Closed
//!                                    └──────cancel/close───────► Closed
//! ```
//!
//! Opening the form while it is already open simply replaces the binding.  A
//! commit that fails validation leaves the surface exactly as it was so the
//! user can fix the fields; nothing in the working copy changes.

use starlane_core::domain::config::is_valid_item_url;
use starlane_core::{Item, ValidationError};
use thiserror::Error;
use tracing::debug;

use super::working_copy::{ItemEntry, ItemId, WorkingCopy};

/// Errors from item editing operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ItemEditError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// `commit` was called while the edit surface is closed.
    #[error("the item form is not open")]
    NotOpen,

    /// The referenced item is not in the working copy.
    #[error("item {0} not found")]
    UnknownItem(ItemId),

    /// The item is not owned by the group the caller said it was in.
    #[error("item {item} is not in group \"{group}\"")]
    NotInGroup { item: ItemId, group: String },
}

/// State of the single shared add/edit form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditSurface {
    #[default]
    Closed,
    /// Adding a new item to the end of `target_group`.
    Adding { target_group: String },
    /// Editing an existing item in place.
    Editing { item: ItemId },
}

impl EditSurface {
    pub fn is_open(&self) -> bool {
        !matches!(self, EditSurface::Closed)
    }
}

/// Result of a successful [`ItemEditor::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Added(ItemId),
    Updated(ItemId),
}

/// Item operations over a borrowed working copy and edit surface.
///
/// Obtain one from `EditorSession::items()`.
pub struct ItemEditor<'a> {
    copy: &'a mut WorkingCopy,
    surface: &'a mut EditSurface,
}

impl<'a> ItemEditor<'a> {
    pub(crate) fn new(copy: &'a mut WorkingCopy, surface: &'a mut EditSurface) -> Self {
        Self { copy, surface }
    }

    /// Items of `group` in display order, or `None` if there is no such group.
    pub fn list_items_of(&self, group: &str) -> Option<&[ItemEntry]> {
        self.copy.group(group).map(|g| g.items.as_slice())
    }

    pub fn surface(&self) -> &EditSurface {
        self.surface
    }

    /// Opens the form in add mode for `target_group` and returns blank fields.
    ///
    /// # Errors
    ///
    /// [`ValidationError::UnknownGroup`] if the group does not exist; the
    /// surface is left unchanged.
    pub fn begin_add(&mut self, target_group: &str) -> Result<Item, ItemEditError> {
        if self.copy.group(target_group).is_none() {
            return Err(ValidationError::UnknownGroup(target_group.to_string()).into());
        }
        *self.surface = EditSurface::Adding {
            target_group: target_group.to_string(),
        };
        Ok(Item {
            name: String::new(),
            url: String::new(),
            icon: String::new(),
        })
    }

    /// Opens the form in edit mode for `id` and returns the current fields.
    ///
    /// # Errors
    ///
    /// [`ItemEditError::UnknownItem`] if the item is not in any group.
    pub fn begin_edit(&mut self, id: ItemId) -> Result<Item, ItemEditError> {
        let fields = self
            .copy
            .locate(id)
            .map(|(gi, ii)| self.copy.groups()[gi].items[ii].item.clone())
            .ok_or(ItemEditError::UnknownItem(id))?;
        *self.surface = EditSurface::Editing { item: id };
        Ok(fields)
    }

    /// Closes the form, discarding whatever was typed.
    pub fn cancel(&mut self) {
        *self.surface = EditSurface::Closed;
    }

    /// Validates `fields` and applies them.
    ///
    /// Requires a non-empty name and a URL with scheme and host.  Name, URL
    /// and icon are trimmed.  In edit mode the item keeps its position; in add
    /// mode it is appended to the target group.
    ///
    /// # Errors
    ///
    /// On any error the surface stays open and nothing is created or changed.
    pub fn commit(&mut self, fields: Item) -> Result<CommitOutcome, ItemEditError> {
        let fields = validate_fields(fields)?;

        match self.surface.clone() {
            EditSurface::Closed => Err(ItemEditError::NotOpen),
            EditSurface::Adding { target_group } => {
                let slot = self
                    .copy
                    .groups_mut()
                    .iter_mut()
                    .find(|g| g.name == target_group)
                    .ok_or_else(|| ValidationError::UnknownGroup(target_group.clone()))?;
                let entry = ItemEntry::new(fields);
                let id = entry.id;
                slot.items.push(entry);
                debug!(group = %target_group, %id, "item added");
                *self.surface = EditSurface::Closed;
                Ok(CommitOutcome::Added(id))
            }
            EditSurface::Editing { item } => {
                let (gi, ii) = self
                    .copy
                    .locate(item)
                    .ok_or(ItemEditError::UnknownItem(item))?;
                self.copy.groups_mut()[gi].items[ii].item = fields;
                debug!(%item, "item updated");
                *self.surface = EditSurface::Closed;
                Ok(CommitOutcome::Updated(item))
            }
        }
    }

    /// Removes an item from its group (or from the orphans).  No confirmation
    /// is asked.  If the form was editing this item it is closed.
    ///
    /// # Errors
    ///
    /// [`ItemEditError::UnknownItem`] if the id is not in the working copy.
    pub fn delete(&mut self, id: ItemId) -> Result<Item, ItemEditError> {
        let removed = match self.copy.locate(id) {
            Some((gi, ii)) => self.copy.groups_mut()[gi].items.remove(ii),
            None => {
                let orphans = self.copy.orphans_mut();
                let pos = orphans
                    .iter()
                    .position(|e| e.id == id)
                    .ok_or(ItemEditError::UnknownItem(id))?;
                orphans.remove(pos)
            }
        };
        if *self.surface == (EditSurface::Editing { item: id }) {
            *self.surface = EditSurface::Closed;
        }
        debug!(%id, "item deleted");
        Ok(removed.item)
    }

    /// Moves an item from `from_group` into `to_group` at `at_index`
    /// (clamped to the end).  Moving within one group reorders it.
    ///
    /// Every check happens before anything is touched, so the item is never
    /// observable in two groups or in none.
    ///
    /// # Errors
    ///
    /// [`ItemEditError::NotInGroup`] if `from_group` does not own the item,
    /// [`ValidationError::UnknownGroup`] if `to_group` does not exist.
    pub fn move_across_groups(
        &mut self,
        id: ItemId,
        from_group: &str,
        to_group: &str,
        at_index: usize,
    ) -> Result<(), ItemEditError> {
        let (from_gi, from_ii) = self.copy.locate(id).ok_or(ItemEditError::UnknownItem(id))?;
        if self.copy.groups()[from_gi].name != from_group {
            return Err(ItemEditError::NotInGroup {
                item: id,
                group: from_group.to_string(),
            });
        }
        let to_gi = self
            .copy
            .position_of_group(to_group)
            .ok_or_else(|| ValidationError::UnknownGroup(to_group.to_string()))?;

        let groups = self.copy.groups_mut();
        let entry = groups[from_gi].items.remove(from_ii);
        let target = &mut groups[to_gi].items;
        let index = at_index.min(target.len());
        target.insert(index, entry);
        debug!(%id, from = from_group, to = to_group, index, "item moved");
        Ok(())
    }
}

fn validate_fields(fields: Item) -> Result<Item, ValidationError> {
    let name = fields.name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyItemName);
    }
    let url = fields.url.trim();
    if !is_valid_item_url(url) {
        return Err(ValidationError::InvalidUrl(url.to_string()));
    }
    Ok(Item {
        name: name.to_string(),
        url: url.to_string(),
        icon: fields.icon.trim().to_string(),
    })
}
