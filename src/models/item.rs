use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A node in the notes forest.
///
/// Folders hold an ordered list of child items; documents hold free-form text.
/// The split lives in [`ItemBody`], so a document can never carry children and
/// a folder can never carry content.
///
/// Serialized as a flat object with a `type` discriminator:
/// ```json
/// {"id": "…", "name": "Notes", "parent_id": null, "type": "folder", "children": []}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    /// Folder the item was created under, `None` for root-level items.
    ///
    /// Used to route placement on insert; it is not a live back-pointer.
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(flatten)]
    pub body: ItemBody,
}

/// Kind-specific payload of an [`Item`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemBody {
    Folder {
        #[serde(default)]
        children: Vec<Item>,
    },
    Document {
        #[serde(default)]
        content: String,
    },
}

/// The kind of an item, fixed at creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Folder,
    Document,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::Document => "document",
        }
    }
}

impl Item {
    /// Create an item of the given kind with a fresh time-ordered id.
    pub fn new(kind: ItemKind, name: impl Into<String>, parent_id: Option<Uuid>) -> Self {
        let body = match kind {
            ItemKind::Folder => ItemBody::Folder {
                children: Vec::new(),
            },
            ItemKind::Document => ItemBody::Document {
                content: String::new(),
            },
        };
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            parent_id,
            body,
        }
    }

    pub fn folder(name: impl Into<String>, parent_id: Option<Uuid>) -> Self {
        Self::new(ItemKind::Folder, name, parent_id)
    }

    pub fn document(name: impl Into<String>, parent_id: Option<Uuid>) -> Self {
        Self::new(ItemKind::Document, name, parent_id)
    }

    pub fn kind(&self) -> ItemKind {
        match self.body {
            ItemBody::Folder { .. } => ItemKind::Folder,
            ItemBody::Document { .. } => ItemKind::Document,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.body, ItemBody::Folder { .. })
    }

    pub fn is_document(&self) -> bool {
        matches!(self.body, ItemBody::Document { .. })
    }

    /// Document text, or `None` for folders.
    pub fn content(&self) -> Option<&str> {
        match &self.body {
            ItemBody::Document { content } => Some(content),
            ItemBody::Folder { .. } => None,
        }
    }

    /// Direct children. Always empty for documents.
    pub fn children(&self) -> &[Item] {
        match &self.body {
            ItemBody::Folder { children } => children,
            ItemBody::Document { .. } => &[],
        }
    }

    /// Copy of this item with `body` swapped in.
    pub(crate) fn with_body(&self, body: ItemBody) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            parent_id: self.parent_id,
            body,
        }
    }
}

/// Input for creating a new item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateItemInput {
    pub name: String,
    pub kind: ItemKind,
    /// Folder to create the item in. `None` creates a root item.
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

/// Input for creating an item inside the currently selected folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHereInput {
    pub name: String,
    pub kind: ItemKind,
}

/// Input for replacing a document's text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateContentInput {
    pub content: String,
}

/// Input for renaming an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameItemInput {
    pub name: String,
}

/// Input for moving an item. `None` moves it to the root level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveItemInput {
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_serializes_with_type_tag_and_children() {
        let folder = Item::folder("Notes", None);
        let value = serde_json::to_value(&folder).unwrap();

        assert_eq!(value["type"], "folder");
        assert_eq!(value["name"], "Notes");
        assert!(value["children"].as_array().unwrap().is_empty());
        assert!(value.get("content").is_none());
    }

    #[test]
    fn document_serializes_with_content_and_no_children() {
        let parent = Uuid::new_v4();
        let doc = Item::document("todo", Some(parent));
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["type"], "document");
        assert_eq!(value["content"], "");
        assert_eq!(value["parent_id"], parent.to_string());
        assert!(value.get("children").is_none());
    }

    #[test]
    fn deserializes_nested_items() {
        let json = r#"[{
            "id": "0190c1c4-0000-7000-8000-000000000001",
            "name": "Notes",
            "type": "folder",
            "children": [{
                "id": "0190c1c4-0000-7000-8000-000000000002",
                "name": "todo",
                "parent_id": "0190c1c4-0000-7000-8000-000000000001",
                "type": "document",
                "content": "buy milk"
            }]
        }]"#;

        let items: Vec<Item> = serde_json::from_str(json).unwrap();

        assert_eq!(items.len(), 1);
        assert!(items[0].parent_id.is_none());
        assert_eq!(items[0].children().len(), 1);
        assert_eq!(items[0].children()[0].content(), Some("buy milk"));
    }

    #[test]
    fn kind_str_matches_serialized_tag() {
        for kind in [ItemKind::Folder, ItemKind::Document] {
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
            assert_eq!(Item::new(kind, "x", None).kind(), kind);
        }
    }

    #[test]
    fn fresh_ids_are_unique() {
        let a = Item::document("a", None);
        let b = Item::document("b", None);
        assert_ne!(a.id, b.id);
    }
}
