//! Persistence adapter: whole-value get/set of JSON documents under fixed keys.
//!
//! Two logical keys are used: [`ITEMS_KEY`] holds the entire item forest and
//! [`PASSWORD_KEY`] holds the gate secret. Every write replaces the whole value.

mod memory;
mod schema;

pub use memory::MemoryStorage;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Key holding the serialized forest.
pub const ITEMS_KEY: &str = "app-items";

/// Key holding the plaintext gate secret.
pub const PASSWORD_KEY: &str = "app-password";

/// Key-value storage for JSON values.
///
/// Implementations are synchronous; async callers go through [`load_json`]
/// and [`save_json`], which run them on the blocking pool.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;
    fn set(&self, key: &str, value: &serde_json::Value) -> Result<()>;
}

/// Load and decode the value under `key`. A missing key is `Ok(None)`.
pub async fn load_json<T>(storage: Arc<dyn Storage>, key: &'static str) -> Result<Option<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    let value = tokio::task::spawn_blocking(move || storage.get(key))
        .await
        .context("Storage task failed")??;

    value
        .map(|v| serde_json::from_value(v).with_context(|| format!("Failed to decode {}", key)))
        .transpose()
}

/// Encode `value` and overwrite whatever is stored under `key`.
pub async fn save_json<T>(storage: Arc<dyn Storage>, key: &'static str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let value =
        serde_json::to_value(value).with_context(|| format!("Failed to encode {}", key))?;

    tokio::task::spawn_blocking(move || storage.set(key, &value))
        .await
        .context("Storage task failed")?
}

/// SQLite-backed [`Storage`].
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        tracing::debug!("Opened database at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }
}

impl Storage for Database {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let raw: Option<String> = conn
            .query_row("SELECT value FROM kv_store WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;

        raw.map(|s| {
            serde_json::from_str(&s).with_context(|| format!("Corrupt value stored under {}", key))
        })
        .transpose()
    }

    fn set(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            (key, value.to_string(), Utc::now().to_rfc3339()),
        )?;
        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

/// `notevault.db` in the platform data directory.
pub fn default_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "notevault")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("notevault.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn migrated() -> Database {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    #[test]
    fn missing_key_is_none() {
        let db = migrated();
        assert!(db.get(ITEMS_KEY).unwrap().is_none());
    }

    #[test]
    fn set_overwrites_whole_value() {
        let db = migrated();
        db.set(ITEMS_KEY, &json!([{"a": 1}, {"b": 2}])).unwrap();
        db.set(ITEMS_KEY, &json!([])).unwrap();

        assert_eq!(db.get(ITEMS_KEY).unwrap(), Some(json!([])));
    }

    #[test]
    fn keys_are_independent() {
        let db = migrated();
        db.set(ITEMS_KEY, &json!([])).unwrap();
        db.set(PASSWORD_KEY, &json!("hunter2")).unwrap();

        db.set(ITEMS_KEY, &json!([1])).unwrap();

        assert_eq!(db.get(PASSWORD_KEY).unwrap(), Some(json!("hunter2")));
        assert_eq!(db.get(ITEMS_KEY).unwrap(), Some(json!([1])));
    }

    #[tokio::test]
    async fn json_helpers_round_trip() {
        let storage: Arc<dyn Storage> = Arc::new(migrated());

        save_json(storage.clone(), PASSWORD_KEY, "secret").await.unwrap();
        let loaded: Option<String> = load_json(storage, PASSWORD_KEY).await.unwrap();

        assert_eq!(loaded.as_deref(), Some("secret"));
    }
}
