//! Session context tying the forest, the tree-browser selection and storage together.
//!
//! A [`Notebook`] is created once per session with [`Notebook::open`] and handed
//! to whatever drives it (the HTTP API, the CLI, the autosave task). Mutations
//! run synchronously against the in-memory [`Workspace`]; persistence is a
//! separate async step that always writes the whole forest.
//!
//! Saves are serialized: [`Notebook::save`] takes the save guard before it
//! snapshots the forest, so overlapping callers write in order and each one
//! writes the state current when its turn came.
//!
//! Structural changes (create, delete, move) are written before they are
//! applied. If the write fails the workspace is left as it was.

use std::sync::{Arc, Mutex};

use anyhow::Context;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{self, Storage, ITEMS_KEY};
use crate::models::{CreateItemInput, Item, ItemKind};
use crate::selection::Selection;
use crate::store::{Forest, StoreError};

#[derive(Debug, Error)]
pub enum NotebookError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Item not found: {0}")]
    NotFound(Uuid),

    #[error("Item is not a document: {0}")]
    NotADocument(Uuid),

    #[error("Storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

pub type NotebookResult<T> = Result<T, NotebookError>;

/// Everything a session edits: the forest and the browser state over it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workspace {
    pub forest: Forest,
    pub selection: Selection,
}

#[derive(Clone)]
pub struct Notebook {
    state: Arc<Mutex<Workspace>>,
    storage: Arc<dyn Storage>,
    save_guard: Arc<tokio::sync::Mutex<()>>,
}

impl Notebook {
    /// Load the stored forest. Nothing stored yet means an empty forest.
    pub async fn open(storage: Arc<dyn Storage>) -> NotebookResult<Self> {
        let forest: Forest = db::load_json(storage.clone(), ITEMS_KEY)
            .await?
            .unwrap_or_default();
        forest.validate().context("Stored forest is invalid")?;

        tracing::info!("Loaded {} items", forest.len());

        Ok(Self::with_forest(storage, forest))
    }

    /// Start a session over `forest` without reading storage.
    pub fn with_forest(storage: Arc<dyn Storage>, forest: Forest) -> Self {
        Self {
            state: Arc::new(Mutex::new(Workspace {
                forest,
                selection: Selection::new(),
            })),
            storage,
            save_guard: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut Workspace) -> R) -> R {
        let mut state = self.state.lock().expect("notebook lock poisoned");
        f(&mut state)
    }

    // ============================================================
    // Reads
    // ============================================================

    pub fn snapshot(&self) -> Workspace {
        self.with_state(|ws| ws.clone())
    }

    pub fn forest(&self) -> Forest {
        self.with_state(|ws| ws.forest.clone())
    }

    pub fn selection(&self) -> Selection {
        self.with_state(|ws| ws.selection.clone())
    }

    pub fn get(&self, id: Uuid) -> Option<Item> {
        self.with_state(|ws| ws.forest.find(id).cloned())
    }

    /// Whether the current selection is a document, i.e. an editor is open.
    pub fn has_open_document(&self) -> bool {
        self.with_state(|ws| ws.selection.open_document(&ws.forest).is_some())
    }

    // ============================================================
    // Structural changes (saved immediately)
    // ============================================================

    pub async fn create_item(&self, input: CreateItemInput) -> NotebookResult<Item> {
        let item = Item::new(input.kind, input.name, input.parent_id);
        self.commit(|forest| Ok((forest.insert(item.clone())?, ())))
            .await?;

        tracing::info!(id = %item.id, kind = item.kind().as_str(), "Created item");
        Ok(item)
    }

    /// Create an item inside the selected folder, or at the root when the
    /// selection is empty or not a folder.
    pub async fn create_here(&self, kind: ItemKind, name: impl Into<String>) -> NotebookResult<Item> {
        let parent_id = self.with_state(|ws| ws.selection.selected_folder(&ws.forest).map(|f| f.id));
        self.create_item(CreateItemInput {
            name: name.into(),
            kind,
            parent_id,
        })
        .await
    }

    /// Remove an item and its subtree. Returns `false` if nothing matched.
    pub async fn delete(&self, id: Uuid) -> NotebookResult<bool> {
        let result = self
            .commit(|forest| {
                if !forest.contains(id) {
                    return Err(NotebookError::NotFound(id));
                }
                Ok((forest.delete(id), ()))
            })
            .await;

        match result {
            Ok(()) => {
                tracing::info!(%id, "Deleted item");
                Ok(true)
            }
            Err(NotebookError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn move_item(&self, id: Uuid, parent_id: Option<Uuid>) -> NotebookResult<Item> {
        let moved = self
            .commit(|forest| {
                let next = forest.move_item(id, parent_id).map_err(|e| match e {
                    StoreError::NotFound(id) => NotebookError::NotFound(id),
                    other => other.into(),
                })?;
                let moved = next.find(id).cloned().ok_or(NotebookError::NotFound(id))?;
                Ok((next, moved))
            })
            .await?;

        tracing::info!(%id, parent = ?parent_id, "Moved item");
        Ok(moved)
    }

    /// Write `change(forest)` and, once stored, make it the current forest.
    ///
    /// The save guard is held throughout, so no other structural change can
    /// interleave. Edits made while the write is in flight are kept: `change`
    /// is applied again to the forest current at that point.
    async fn commit<R>(
        &self,
        change: impl Fn(&Forest) -> NotebookResult<(Forest, R)>,
    ) -> NotebookResult<R> {
        let _guard = self.save_guard.lock().await;
        let (next, out) = self.with_state(|ws| change(&ws.forest))?;

        db::save_json(self.storage.clone(), ITEMS_KEY, &next).await?;
        tracing::debug!("Saved {} items", next.len());

        self.with_state(|ws| -> NotebookResult<()> {
            let (applied, _) = change(&ws.forest)?;
            ws.forest = applied;
            ws.selection.forget(&ws.forest);
            Ok(())
        })?;
        Ok(out)
    }

    // ============================================================
    // Edits (persisted by the next save or autosave tick)
    // ============================================================

    pub fn edit_content(&self, id: Uuid, content: &str) -> NotebookResult<Item> {
        self.with_state(|ws| {
            let item = ws.forest.find(id).ok_or(NotebookError::NotFound(id))?;
            if !item.is_document() {
                return Err(NotebookError::NotADocument(id));
            }
            ws.forest = ws.forest.update_content(id, content);
            ws.forest.find(id).cloned().ok_or(NotebookError::NotFound(id))
        })
    }

    pub fn rename(&self, id: Uuid, name: &str) -> NotebookResult<Item> {
        self.with_state(|ws| {
            if !ws.forest.contains(id) {
                return Err(NotebookError::NotFound(id));
            }
            ws.forest = ws.forest.rename(id, name);
            ws.forest.find(id).cloned().ok_or(NotebookError::NotFound(id))
        })
    }

    /// Click on an item in the tree browser.
    pub fn select(&self, id: Uuid) -> NotebookResult<Selection> {
        self.with_state(|ws| {
            let item = ws.forest.find(id).ok_or(NotebookError::NotFound(id))?;
            ws.selection.click(item);
            Ok(ws.selection.clone())
        })
    }

    pub fn clear_selection(&self) {
        self.with_state(|ws| ws.selection.clear());
    }

    // ============================================================
    // Persistence
    // ============================================================

    /// Write the whole forest to storage.
    pub async fn save(&self) -> NotebookResult<()> {
        let _guard = self.save_guard.lock().await;
        let forest = self.forest();

        db::save_json(self.storage.clone(), ITEMS_KEY, &forest).await?;

        tracing::debug!("Saved {} items", forest.len());
        Ok(())
    }
}
