//! Notebook sessions against the SQLite storage.

use std::sync::Arc;

use notevault::auth::{AuthGate, AuthOutcome, GateStatus};
use notevault::db::{Database, Storage, ITEMS_KEY};
use notevault::models::*;
use notevault::notebook::{Notebook, NotebookError};
use notevault::store::StoreError;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

fn open_db(dir: &TempDir) -> Database {
    let db = Database::open(dir.path().join("notes").join("notevault.db"))
        .expect("Failed to open database");
    db.migrate().expect("Failed to migrate");
    db
}

async fn open_notebook(db: &Database) -> Notebook {
    Notebook::open(Arc::new(db.clone()))
        .await
        .expect("Failed to open notebook")
}

mod persistence {
    use super::*;

    #[tokio::test]
    async fn empty_storage_opens_an_empty_forest() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        let notebook = open_notebook(&db).await;

        assert!(notebook.forest().is_empty());
        assert!(db.get(ITEMS_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn saved_forest_survives_reopening_the_database() {
        let dir = TempDir::new().unwrap();
        let (folder, doc) = {
            let db = open_db(&dir);
            let notebook = open_notebook(&db).await;
            let folder = notebook
                .create_item(CreateItemInput {
                    name: "Notes".to_string(),
                    kind: ItemKind::Folder,
                    parent_id: None,
                })
                .await
                .unwrap();
            let doc = notebook
                .create_item(CreateItemInput {
                    name: "todo".to_string(),
                    kind: ItemKind::Document,
                    parent_id: Some(folder.id),
                })
                .await
                .unwrap();
            assert_ok!(notebook.edit_content(doc.id, "buy milk"));
            assert_ok!(notebook.save().await);
            (folder, doc)
        };

        let db = open_db(&dir);
        let reopened = open_notebook(&db).await;
        let forest = reopened.forest();

        assert_eq!(forest.len(), 2);
        assert_eq!(forest.roots()[0].id, folder.id);
        let child = &forest.roots()[0].children()[0];
        assert_eq!(child.id, doc.id);
        assert_eq!(child.name, "todo");
        assert_eq!(child.content(), Some("buy milk"));
    }

    #[tokio::test]
    async fn unsaved_edits_are_not_persisted() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let notebook = open_notebook(&db).await;
        let doc = notebook
            .create_here(ItemKind::Document, "draft")
            .await
            .unwrap();

        notebook.rename(doc.id, "renamed").unwrap();

        let reopened = open_notebook(&db).await;
        assert_eq!(reopened.get(doc.id).unwrap().name, "draft");
    }

    #[tokio::test]
    async fn corrupt_stored_forest_is_an_error() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        db.set(ITEMS_KEY, &serde_json::json!({"not": "a list"}))
            .unwrap();

        let result = Notebook::open(Arc::new(db)).await;

        assert!(matches!(result, Err(NotebookError::Storage(_))));
    }
}

mod validation {
    use super::*;

    #[tokio::test]
    async fn stored_duplicate_ids_are_refused_at_open() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let id = Uuid::new_v4();
        db.set(
            ITEMS_KEY,
            &serde_json::json!([
                {"id": id, "name": "a", "type": "document", "content": ""},
                {"id": id, "name": "b", "type": "document", "content": ""}
            ]),
        )
        .unwrap();

        let result = Notebook::open(Arc::new(db)).await;

        assert!(matches!(result, Err(NotebookError::Storage(_))));
    }

    #[tokio::test]
    async fn stored_child_under_the_wrong_folder_is_refused_at_open() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let folder = Uuid::new_v4();
        db.set(
            ITEMS_KEY,
            &serde_json::json!([{
                "id": folder, "name": "Notes", "type": "folder",
                "children": [{
                    "id": Uuid::new_v4(), "name": "todo", "parent_id": Uuid::new_v4(),
                    "type": "document", "content": ""
                }]
            }]),
        )
        .unwrap();

        assert!(Notebook::open(Arc::new(db)).await.is_err());
    }
}

mod editing {
    use super::*;

    #[tokio::test]
    async fn unknown_parent_is_reported() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let notebook = open_notebook(&db).await;
        let missing = Uuid::new_v4();

        let err = assert_err!(
            notebook
                .create_item(CreateItemInput {
                    name: "orphan".to_string(),
                    kind: ItemKind::Document,
                    parent_id: Some(missing),
                })
                .await
        );

        assert!(matches!(
            err,
            NotebookError::Store(StoreError::ParentNotFound(id)) if id == missing
        ));
        assert!(notebook.forest().is_empty());
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let notebook = open_notebook(&db).await;
        let missing = Uuid::new_v4();

        assert!(matches!(
            notebook.edit_content(missing, "x"),
            Err(NotebookError::NotFound(_))
        ));
        assert!(matches!(
            notebook.rename(missing, "x"),
            Err(NotebookError::NotFound(_))
        ));
        assert!(matches!(
            notebook.select(missing),
            Err(NotebookError::NotFound(_))
        ));
        assert!(matches!(
            notebook.move_item(missing, None).await,
            Err(NotebookError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn move_is_saved() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let notebook = open_notebook(&db).await;
        let folder = notebook.create_here(ItemKind::Folder, "A").await.unwrap();
        let doc = notebook
            .create_here(ItemKind::Document, "doc")
            .await
            .unwrap();

        let moved = notebook.move_item(doc.id, Some(folder.id)).await.unwrap();
        assert_eq!(moved.parent_id, Some(folder.id));

        let reopened = open_notebook(&db).await;
        let forest = reopened.forest();
        assert_eq!(forest.roots().len(), 1);
        assert_eq!(forest.roots()[0].children()[0].id, doc.id);
    }
}

mod gate {
    use super::*;

    #[tokio::test]
    async fn secret_persists_across_sessions() {
        let dir = TempDir::new().unwrap();
        {
            let db = open_db(&dir);
            let gate = AuthGate::new(Arc::new(db));
            assert_eq!(gate.submit("open sesame").await.unwrap(), AuthOutcome::Enrolled);
        }

        let db = open_db(&dir);
        let gate = AuthGate::new(Arc::new(db));
        assert_eq!(gate.status().await.unwrap(), GateStatus::Locked);
        assert_eq!(gate.submit("wrong").await.unwrap(), AuthOutcome::Rejected);
        assert_eq!(gate.submit("open sesame").await.unwrap(), AuthOutcome::Accepted);
    }

    #[tokio::test]
    async fn gate_and_forest_use_separate_keys() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let gate = AuthGate::new(Arc::new(db.clone()));
        gate.submit("pw").await.unwrap();

        let notebook = open_notebook(&db).await;
        notebook.create_here(ItemKind::Folder, "Notes").await.unwrap();

        assert_eq!(gate.submit("pw").await.unwrap(), AuthOutcome::Accepted);
        assert_eq!(open_notebook(&db).await.forest().len(), 1);
    }
}
