//! The in-memory working copy edited by the settings panel.
//!
//! A [`WorkingCopy`] is created from a loaded [`ConfigModel`], mutated by the
//! group and item editors, and turned back into a [`ConfigModel`] when the
//! user saves or exports.  It is the single source of truth while editing:
//! nothing is ever read back out of a rendered surface.
//!
//! # Item identity
//!
//! Items have no natural key (two items may share a name and URL), so every
//! item gets an [`ItemId`] when it enters the working copy.  Ids are never
//! serialised; they only keep the edit surface and drag operations pointed at
//! the right item while groups are renamed, reordered or deleted around it.
//!
//! # Orphans
//!
//! When the last group is deleted its items have nowhere to go.  They are kept
//! as orphans and re-bound to the next group that is added; any still
//! orphaned at save time are dropped from the persisted document.

use starlane_core::{Background, ConfigModel, Group, Item, Theme};
use tracing::info;
use uuid::Uuid;

/// Identifier of one item within a working copy.
pub type ItemId = Uuid;

/// An item together with its working-copy identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEntry {
    pub id: ItemId,
    pub item: Item,
}

impl ItemEntry {
    pub fn new(item: Item) -> Self {
        Self {
            id: Uuid::new_v4(),
            item,
        }
    }
}

/// One group slot in the ordered group list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSlot {
    pub name: String,
    pub items: Vec<ItemEntry>,
}

impl GroupSlot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }
}

/// Page-level settings: title, theme and background.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageSettings {
    pub page_title: String,
    pub theme: Theme,
    pub background: Background,
}

/// The configuration currently being edited.
#[derive(Debug, Clone, Default)]
pub struct WorkingCopy {
    pub settings: PageSettings,
    groups: Vec<GroupSlot>,
    orphans: Vec<ItemEntry>,
}

impl WorkingCopy {
    /// Builds a working copy, giving every item a fresh [`ItemId`].
    pub fn from_model(model: &ConfigModel) -> Self {
        let groups = model
            .groups
            .iter()
            .map(|group| GroupSlot {
                name: group.name.clone(),
                items: group.items.iter().cloned().map(ItemEntry::new).collect(),
            })
            .collect();

        Self {
            settings: PageSettings {
                page_title: model.page_title.clone(),
                theme: model.theme,
                background: model.background.clone(),
            },
            groups,
            orphans: Vec::new(),
        }
    }

    /// Produces the document to persist.  Orphaned items are not included.
    pub fn to_model(&self) -> ConfigModel {
        if !self.orphans.is_empty() {
            info!(
                dropped = self.orphans.len(),
                "dropping items that no longer belong to any group"
            );
        }
        ConfigModel {
            page_title: self.settings.page_title.clone(),
            theme: self.settings.theme,
            background: self.settings.background.clone(),
            groups: self
                .groups
                .iter()
                .map(|slot| Group {
                    name: slot.name.clone(),
                    items: slot.items.iter().map(|e| e.item.clone()).collect(),
                })
                .collect(),
        }
    }

    /// Group names in display order.
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    pub fn groups(&self) -> &[GroupSlot] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&GroupSlot> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn orphans(&self) -> &[ItemEntry] {
        &self.orphans
    }

    pub fn position_of_group(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.name == name)
    }

    /// Finds an item, returning `(group index, item index)`.
    pub fn locate(&self, id: ItemId) -> Option<(usize, usize)> {
        self.groups.iter().enumerate().find_map(|(gi, group)| {
            group
                .items
                .iter()
                .position(|entry| entry.id == id)
                .map(|ii| (gi, ii))
        })
    }

    /// Looks an item up in the groups and then among the orphans.
    pub fn item(&self, id: ItemId) -> Option<&ItemEntry> {
        self.groups
            .iter()
            .flat_map(|g| g.items.iter())
            .chain(self.orphans.iter())
            .find(|entry| entry.id == id)
    }

    /// Name of the group that owns `id`, or `None` for orphans and unknown ids.
    pub fn owner_of(&self, id: ItemId) -> Option<&str> {
        self.locate(id).map(|(gi, _)| self.groups[gi].name.as_str())
    }

    /// Finds the first item named `name` in `group`.
    pub fn find_item(&self, group: &str, name: &str) -> Option<ItemId> {
        self.group(group)?
            .items
            .iter()
            .find(|entry| entry.item.name == name)
            .map(|entry| entry.id)
    }

    pub(crate) fn groups_mut(&mut self) -> &mut Vec<GroupSlot> {
        &mut self.groups
    }

    pub(crate) fn orphans_mut(&mut self) -> &mut Vec<ItemEntry> {
        &mut self.orphans
    }
}
