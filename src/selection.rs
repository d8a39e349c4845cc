//! Which item is open and which folders are expanded in the tree browser.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Item;
use crate::store::Forest;

/// Tree browser state. Independent of item content; only ids are held.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    selected: Option<Uuid>,
    expanded: BTreeSet<Uuid>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a click on `item`: folders toggle their expansion, and either kind
    /// becomes the selected item.
    pub fn click(&mut self, item: &Item) {
        if item.is_folder() {
            self.toggle(item.id);
        }
        self.selected = Some(item.id);
    }

    /// Flip the expansion of folder `id`. Returns whether it is now expanded.
    pub fn toggle(&mut self, id: Uuid) -> bool {
        if self.expanded.remove(&id) {
            false
        } else {
            self.expanded.insert(id);
            true
        }
    }

    pub fn is_expanded(&self, id: Uuid) -> bool {
        self.expanded.contains(&id)
    }

    pub fn is_selected(&self, id: Uuid) -> bool {
        self.selected == Some(id)
    }

    pub fn selected(&self) -> Option<Uuid> {
        self.selected
    }

    pub fn expanded(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.expanded.iter().copied()
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    /// Resolve the selected id against `forest`.
    pub fn selected_item<'a>(&self, forest: &'a Forest) -> Option<&'a Item> {
        self.selected.and_then(|id| forest.find(id))
    }

    /// The selected item if it is a document.
    pub fn open_document<'a>(&self, forest: &'a Forest) -> Option<&'a Item> {
        self.selected_item(forest).filter(|item| item.is_document())
    }

    /// The selected item if it is a folder.
    pub fn selected_folder<'a>(&self, forest: &'a Forest) -> Option<&'a Item> {
        self.selected_item(forest).filter(|item| item.is_folder())
    }

    /// Drop references to items that are no longer in `forest`.
    pub fn forget(&mut self, forest: &Forest) {
        if self.selected.is_some_and(|id| !forest.contains(id)) {
            self.selected = None;
        }
        self.expanded.retain(|id| forest.contains(*id));
    }
}
