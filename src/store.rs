use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const USER_KEY: &str = "winguport_user";
pub const NUDGE_DISMISSED_KEY: &str = "completionMessageDismissedUntil";

/// String key/value persistence standing in for browser local storage.
pub struct LocalStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl LocalStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open local store at {}", path.display()))?;
        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.init()?;
        Ok(store)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
            path: None,
        };
        store.init()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to read '{}'", key))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO local_storage (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM local_storage WHERE key = ?1", [key])?;
        Ok(())
    }

    #[cfg(test)]
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM local_storage ORDER BY key")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list keys")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_overwrite_remove() {
        let store = LocalStore::open_in_memory().unwrap();
        assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap(), None);

        store.set(AUTH_TOKEN_KEY, "abc").unwrap();
        store.set(AUTH_TOKEN_KEY, "def").unwrap();
        assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap().as_deref(), Some("def"));
        assert_eq!(store.keys().unwrap(), vec![AUTH_TOKEN_KEY.to_string()]);

        store.remove(AUTH_TOKEN_KEY).unwrap();
        assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap(), None);
        // removing a missing key is fine
        store.remove(AUTH_TOKEN_KEY).unwrap();
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("winguport.db");
        {
            let store = LocalStore::open(&path).unwrap();
            store.set(USER_KEY, r#"{"email":"a@b.co"}"#).unwrap();
        }
        let store = LocalStore::open(&path).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        assert_eq!(
            store.get(USER_KEY).unwrap().as_deref(),
            Some(r#"{"email":"a@b.co"}"#)
        );
    }
}
