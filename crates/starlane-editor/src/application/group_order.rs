//! GroupOrderEditor: the ordered list of group names and its drag session.
//!
//! Renames, deletes and additions touch both the group list and every item
//! binding in one step, because items live inside their group slot in the
//! [`WorkingCopy`].  There is no separate "item → group name" table that could
//! drift out of sync.
//!
//! # Drag session
//!
//! ```text
//! begin_drag(name) ─► drag_over(Some(y), boxes)* ─► drop_at(y, boxes)
//!                       drag_over(None, _) clears the indicator
//!                     end_drag() abandons the session without reordering
//! ```
//!
//! The drop target is computed by [`starlane_core::insertion_index`] over the
//! boxes of every slot except the one being dragged.

use starlane_core::domain::config::check_group_name;
use starlane_core::{insertion_index, SlotBox, ValidationError};
use tracing::{debug, info};

use super::item_editor::EditSurface;
use super::prompt::Confirm;
use super::working_copy::{GroupSlot, WorkingCopy};

/// Where a dragged group would land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// Immediately before the named group.
    Before(String),
    /// After the last group.
    End,
}

/// Ephemeral state of an in-progress group drag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DragState {
    dragging: Option<String>,
    indicator: Option<DropTarget>,
}

impl DragState {
    pub fn dragging(&self) -> Option<&str> {
        self.dragging.as_deref()
    }

    /// The target currently highlighted, if the pointer is over the list.
    pub fn indicator(&self) -> Option<&DropTarget> {
        self.indicator.as_ref()
    }
}

/// Result of [`GroupOrderEditor::rename_group`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    /// The new name equals the old one; nothing changed.
    Unchanged,
    Renamed { from: String, to: String },
}

/// Result of [`GroupOrderEditor::delete_group`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The user declined the confirmation.
    Cancelled,
    Deleted {
        /// Number of items that were re-bound.
        moved: usize,
        /// Group that received them, or `None` if they became orphans.
        rebound_to: Option<String>,
    },
}

/// Group operations over a borrowed working copy.
///
/// Obtain one from `EditorSession::groups()`.
pub struct GroupOrderEditor<'a> {
    copy: &'a mut WorkingCopy,
    drag: &'a mut DragState,
    surface: &'a mut EditSurface,
}

impl<'a> GroupOrderEditor<'a> {
    pub(crate) fn new(
        copy: &'a mut WorkingCopy,
        drag: &'a mut DragState,
        surface: &'a mut EditSurface,
    ) -> Self {
        Self {
            copy,
            drag,
            surface,
        }
    }

    /// Group names in display order.
    pub fn current_order(&self) -> Vec<String> {
        self.copy
            .group_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Appends an empty group.  Orphaned items from an earlier delete of the
    /// last group are re-bound to it.
    ///
    /// # Errors
    ///
    /// Empty or duplicate (case-sensitive) names; the list is unchanged.
    pub fn add_group(&mut self, name: &str) -> Result<String, ValidationError> {
        let name = check_group_name(name, self.copy.group_names(), None)?;
        let mut slot = GroupSlot::new(name.clone());
        slot.items.append(self.copy.orphans_mut());
        if !slot.items.is_empty() {
            info!(group = %name, rebound = slot.items.len(), "orphaned items re-bound");
        }
        self.copy.groups_mut().push(slot);
        debug!(group = %name, "group added");
        Ok(name)
    }

    /// Renames `old` to `new` (trimmed).
    ///
    /// # Errors
    ///
    /// [`ValidationError::UnknownGroup`] when `old` does not exist, or the
    /// name checks of [`add_group`](Self::add_group) with `old` excluded.  On
    /// error the visible name stays `old`.
    pub fn rename_group(&mut self, old: &str, new: &str) -> Result<RenameOutcome, ValidationError> {
        let index = self
            .copy
            .position_of_group(old)
            .ok_or_else(|| ValidationError::UnknownGroup(old.to_string()))?;
        let new = check_group_name(new, self.copy.group_names(), Some(old))?;
        if new == old {
            return Ok(RenameOutcome::Unchanged);
        }

        self.copy.groups_mut()[index].name = new.clone();
        if let EditSurface::Adding { target_group } = &mut *self.surface {
            if target_group.as_str() == old {
                *target_group = new.clone();
            }
        }
        if self.drag.dragging.as_deref() == Some(old) {
            self.drag.dragging = Some(new.clone());
        }
        info!(from = old, to = %new, "group renamed");
        Ok(RenameOutcome::Renamed {
            from: old.to_string(),
            to: new,
        })
    }

    /// Deletes a group after confirmation.
    ///
    /// Its items move to the end of the first remaining group.  When no group
    /// remains they become orphans, which are dropped at save time unless a
    /// new group is added first.
    ///
    /// # Errors
    ///
    /// [`ValidationError::UnknownGroup`] when `name` does not exist.
    pub fn delete_group(
        &mut self,
        name: &str,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome, ValidationError> {
        let index = self
            .copy
            .position_of_group(name)
            .ok_or_else(|| ValidationError::UnknownGroup(name.to_string()))?;

        let message = format!(
            "Delete group \"{name}\"? Its items will be moved to the first group."
        );
        if !confirm.confirm(&message) {
            return Ok(DeleteOutcome::Cancelled);
        }

        let removed = self.copy.groups_mut().remove(index);
        let moved = removed.items.len();
        let rebound_to = match self.copy.groups_mut().first_mut() {
            Some(first) => {
                first.items.extend(removed.items);
                Some(first.name.clone())
            }
            None => {
                self.copy.orphans_mut().extend(removed.items);
                None
            }
        };

        let adding_here =
            matches!(&*self.surface, EditSurface::Adding { target_group } if target_group == name);
        if adding_here {
            *self.surface = match &rebound_to {
                Some(first) => EditSurface::Adding {
                    target_group: first.clone(),
                },
                None => EditSurface::Closed,
            };
        }
        if self.drag.dragging.as_deref() == Some(name) {
            *self.drag = DragState::default();
        }

        info!(group = name, moved, rebound_to = ?rebound_to, "group deleted");
        Ok(DeleteOutcome::Deleted { moved, rebound_to })
    }

    /// Moves `dragged` before the target group or to the end.
    ///
    /// Dropping a group before itself leaves the order unchanged.
    ///
    /// # Errors
    ///
    /// [`ValidationError::UnknownGroup`] for an unknown dragged or target
    /// name; the order is unchanged.
    pub fn reorder(&mut self, dragged: &str, target: &DropTarget) -> Result<(), ValidationError> {
        let from = self
            .copy
            .position_of_group(dragged)
            .ok_or_else(|| ValidationError::UnknownGroup(dragged.to_string()))?;
        if let DropTarget::Before(before) = target {
            if self.copy.position_of_group(before).is_none() {
                return Err(ValidationError::UnknownGroup(before.clone()));
            }
            if before == dragged {
                return Ok(());
            }
        }

        let groups = self.copy.groups_mut();
        let slot = groups.remove(from);
        let to = match target {
            DropTarget::Before(before) => groups
                .iter()
                .position(|g| g.name == *before)
                .unwrap_or(groups.len()),
            DropTarget::End => groups.len(),
        };
        groups.insert(to, slot);
        debug!(group = dragged, index = to, "group reordered");
        Ok(())
    }

    // ── Drag session ──────────────────────────────────────────────────────────

    /// Starts dragging `name`.
    ///
    /// # Errors
    ///
    /// [`ValidationError::UnknownGroup`] when `name` does not exist.
    pub fn begin_drag(&mut self, name: &str) -> Result<(), ValidationError> {
        if self.copy.position_of_group(name).is_none() {
            return Err(ValidationError::UnknownGroup(name.to_string()));
        }
        *self.drag = DragState {
            dragging: Some(name.to_string()),
            indicator: None,
        };
        Ok(())
    }

    /// Updates the drop indicator for a pointer move.
    ///
    /// `pointer_y` is `None` while the pointer is outside the drop surface,
    /// which clears the indicator.  `boxes` holds the on-screen box of every
    /// group slot, keyed by name; the dragged slot's own box is ignored.
    pub fn drag_over(
        &mut self,
        pointer_y: Option<f64>,
        boxes: &[(String, SlotBox)],
    ) -> Option<&DropTarget> {
        let target = match (self.drag.dragging.as_deref(), pointer_y) {
            (Some(dragging), Some(y)) => Some(drop_target(dragging, y, boxes)),
            _ => None,
        };
        self.drag.indicator = target;
        self.drag.indicator.as_ref()
    }

    /// Completes the drag at `pointer_y` and reorders.  Returns the target the
    /// group was dropped on, or `None` when no drag was in progress.
    ///
    /// # Errors
    ///
    /// Propagates [`reorder`](Self::reorder) errors; the session ends either way.
    pub fn drop_at(
        &mut self,
        pointer_y: f64,
        boxes: &[(String, SlotBox)],
    ) -> Result<Option<DropTarget>, ValidationError> {
        let Some(dragging) = std::mem::take(&mut *self.drag).dragging else {
            return Ok(None);
        };
        let target = drop_target(&dragging, pointer_y, boxes);
        self.reorder(&dragging, &target)?;
        Ok(Some(target))
    }

    /// Abandons the drag without reordering.
    pub fn end_drag(&mut self) {
        *self.drag = DragState::default();
    }
}

fn drop_target(dragging: &str, pointer_y: f64, boxes: &[(String, SlotBox)]) -> DropTarget {
    let siblings: Vec<&(String, SlotBox)> =
        boxes.iter().filter(|(name, _)| name != dragging).collect();
    let slots: Vec<SlotBox> = siblings.iter().map(|(_, b)| *b).collect();
    match siblings.get(insertion_index(pointer_y, &slots)) {
        Some((name, _)) => DropTarget::Before(name.clone()),
        None => DropTarget::End,
    }
}
