//! The in-memory notes forest and its structural operations.
//!
//! Every operation borrows the current [`Forest`] and returns a new one; the
//! input is left untouched. Callers replace their copy with the result.
//! Traversal is depth-first: a target item is transformed in place, any other
//! folder is rebuilt around its transformed children. Each call is linear in
//! the total number of items.

mod iter;

pub use iter::Iter;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Item, ItemBody};

/// Validation failures from structural operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Parent folder not found: {0}")]
    ParentNotFound(Uuid),

    #[error("Parent is not a folder: {0}")]
    ParentNotFolder(Uuid),

    #[error("Item id already exists: {0}")]
    DuplicateId(Uuid),

    #[error("Item not found: {0}")]
    NotFound(Uuid),

    #[error("Cannot move {0} into its own subtree")]
    WouldCreateCycle(Uuid),

    #[error("Item {0} is not placed under its parent_id")]
    Misplaced(Uuid),
}

/// The ordered collection of root items and everything nested below them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Forest {
    items: Vec<Item>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level items, in insertion order.
    pub fn roots(&self) -> &[Item] {
        &self.items
    }

    /// Total number of items at every depth.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Depth-first, pre-order walk over every item.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(&self.items)
    }

    pub fn find(&self, id: Uuid) -> Option<&Item> {
        self.iter().find(|item| item.id == id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.find(id).is_some()
    }

    /// Check that every id occurs once and that every item sits where its
    /// `parent_id` says: roots have none, children name their folder.
    pub fn validate(&self) -> Result<(), StoreError> {
        check_placement(&self.items, None, &mut HashSet::new())
    }

    /// Place `item` according to its `parent_id`.
    ///
    /// Without a parent the item is appended to the root sequence. With one, it
    /// becomes the last child of that folder, wherever it sits in the tree.
    pub fn insert(&self, item: Item) -> Result<Self, StoreError> {
        check_placement(std::slice::from_ref(&item), item.parent_id, &mut HashSet::new())?;
        if let Some(existing) = Iter::from_item(&item).find(|i| self.contains(i.id)) {
            return Err(StoreError::DuplicateId(existing.id));
        }

        let Some(parent_id) = item.parent_id else {
            let mut items = self.items.clone();
            items.push(item);
            return Ok(Self { items });
        };

        match self.find(parent_id) {
            None => Err(StoreError::ParentNotFound(parent_id)),
            Some(parent) if !parent.is_folder() => Err(StoreError::ParentNotFolder(parent_id)),
            Some(_) => {
                let items = rebuild(&self.items, parent_id, &|folder| {
                    let mut children = folder.children().to_vec();
                    children.push(item.clone());
                    folder.with_body(ItemBody::Folder { children })
                });
                Ok(Self { items })
            }
        }
    }

    /// Replace the text of document `id`. Unknown ids and folders are left alone.
    pub fn update_content(&self, id: Uuid, content: &str) -> Self {
        let items = rebuild(&self.items, id, &|item| match &item.body {
            ItemBody::Document { .. } => item.with_body(ItemBody::Document {
                content: content.to_string(),
            }),
            ItemBody::Folder { .. } => item.clone(),
        });
        Self { items }
    }

    /// Replace the name of item `id`. Unknown ids are left alone.
    pub fn rename(&self, id: Uuid, name: &str) -> Self {
        let items = rebuild(&self.items, id, &|item| Item {
            name: name.to_string(),
            ..item.clone()
        });
        Self { items }
    }

    /// Remove item `id` and its whole subtree from wherever it sits.
    pub fn delete(&self, id: Uuid) -> Self {
        Self {
            items: prune(&self.items, id),
        }
    }

    /// Detach item `id` and re-insert it as the last child of `new_parent`
    /// (or at the end of the root sequence).
    pub fn move_item(&self, id: Uuid, new_parent: Option<Uuid>) -> Result<Self, StoreError> {
        let item = self.find(id).ok_or(StoreError::NotFound(id))?;

        if let Some(parent_id) = new_parent {
            if Iter::from_item(item).any(|i| i.id == parent_id) {
                return Err(StoreError::WouldCreateCycle(id));
            }
        }

        let moved = Item {
            parent_id: new_parent,
            ..item.clone()
        };
        self.delete(id).insert(moved)
    }
}

fn check_placement(
    items: &[Item],
    parent_id: Option<Uuid>,
    seen: &mut HashSet<Uuid>,
) -> Result<(), StoreError> {
    for item in items {
        if !seen.insert(item.id) {
            return Err(StoreError::DuplicateId(item.id));
        }
        if item.parent_id != parent_id {
            return Err(StoreError::Misplaced(item.id));
        }
        check_placement(item.children(), Some(item.id), seen)?;
    }
    Ok(())
}

/// Rebuild `items`, replacing the item with id `target` by `edit(item)`.
fn rebuild(items: &[Item], target: Uuid, edit: &dyn Fn(&Item) -> Item) -> Vec<Item> {
    items
        .iter()
        .map(|item| {
            if item.id == target {
                return edit(item);
            }
            match &item.body {
                ItemBody::Folder { children } => item.with_body(ItemBody::Folder {
                    children: rebuild(children, target, edit),
                }),
                ItemBody::Document { .. } => item.clone(),
            }
        })
        .collect()
}

/// Rebuild `items` without the item with id `target`.
fn prune(items: &[Item], target: Uuid) -> Vec<Item> {
    items
        .iter()
        .filter(|item| item.id != target)
        .map(|item| match &item.body {
            ItemBody::Folder { children } => item.with_body(ItemBody::Folder {
                children: prune(children, target),
            }),
            ItemBody::Document { .. } => item.clone(),
        })
        .collect()
}
