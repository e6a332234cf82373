//! SQLite-backed app-group suite store.
//!
//! The native widget host reads its settings from a suite shared with the
//! host app. We keep that suite as one `widget_kv` table in a database file
//! inside the shared container.

use std::path::Path;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};

use super::KeyValueStore;
use crate::error::SyncError;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS widget_kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);";

const UPSERT: &str = "INSERT INTO widget_kv (key, value, updated_at)
     VALUES (?1, ?2, ?3)
     ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at";

const DELETE: &str = "DELETE FROM widget_kv WHERE key = ?1";

pub struct SqliteSuiteStore {
    conn: Mutex<Connection>,
}

impl SqliteSuiteStore {
    /// Open (or create) the suite database at `path`.
    pub fn open_at(path: &Path) -> Result<Self, SyncError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        // The widget process reads while the app writes.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    /// In-memory suite. Useful for testing.
    pub fn open_in_memory() -> Result<Self, SyncError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, SyncError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of keys in the suite.
    pub fn len(&self) -> Result<usize, SyncError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM widget_kv", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, SyncError> {
        Ok(self.len()? == 0)
    }
}

impl KeyValueStore for SqliteSuiteStore {
    fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM widget_kv WHERE key = ?1",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        let conn = self.conn.lock();
        conn.execute(UPSERT, rusqlite::params![key, value, Utc::now().to_rfc3339()])?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SyncError> {
        let conn = self.conn.lock();
        conn.execute(DELETE, [key])?;
        Ok(())
    }

    /// One `BEGIN IMMEDIATE` transaction; rolls back on the first failure.
    fn set_many(&self, entries: &[(&str, Option<&str>)]) -> Result<(), SyncError> {
        let conn = self.conn.lock();
        let updated_at = Utc::now().to_rfc3339();

        conn.execute_batch("BEGIN IMMEDIATE")?;
        let applied = entries.iter().try_for_each(|(key, value)| {
            let changed = match value {
                Some(value) => conn.execute(UPSERT, rusqlite::params![key, value, updated_at]),
                None => conn.execute(DELETE, [key]),
            };
            changed.map(|_| ())
        });

        match applied {
            Ok(()) => {
                conn.execute_batch("COMMIT")?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                    log::warn!("Widget suite: rollback failed: {}", rollback);
                }
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_overwrite_remove() {
        let store = SqliteSuiteStore::open_in_memory().expect("open");
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "one").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("one"));

        store.set("k", "two").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));
        assert_eq!(store.len().unwrap(), 1);

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        store.remove("k").expect("removing a missing key is fine");
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn set_many_applies_sets_and_removes_together() {
        let store = SqliteSuiteStore::open_in_memory().expect("open");
        store.set("gone", "x").unwrap();

        store
            .set_many(&[("a", Some("1")), ("b", Some("2")), ("gone", None)])
            .expect("batch");
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
        assert_eq!(store.get("gone").unwrap(), None);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn failed_set_many_rolls_back_every_entry() {
        let store = SqliteSuiteStore::open_in_memory().expect("open");
        store.set("a", "old").unwrap();
        store.set("c", "keep").unwrap();
        store
            .conn
            .lock()
            .execute_batch(
                "CREATE TRIGGER reject_boom BEFORE INSERT ON widget_kv
                 WHEN NEW.key = 'boom'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let result = store.set_many(&[("a", Some("new")), ("c", None), ("boom", Some("x"))]);
        assert!(matches!(result, Err(SyncError::Storage(_))));
        assert_eq!(store.get("a").unwrap().as_deref(), Some("old"));
        assert_eq!(store.get("c").unwrap().as_deref(), Some("keep"));
        assert_eq!(store.get("boom").unwrap(), None);

        // The connection is usable again after the rollback.
        store.set_many(&[("a", Some("newer"))]).expect("next batch");
        assert_eq!(store.get("a").unwrap().as_deref(), Some("newer"));
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("group").join("widget.db");

        {
            let store = SqliteSuiteStore::open_at(&path).expect("open");
            store.set("widget.appVersion", "1.2.1").unwrap();
        }

        let reopened = SqliteSuiteStore::open_at(&path).expect("reopen");
        assert_eq!(
            reopened.get("widget.appVersion").unwrap().as_deref(),
            Some("1.2.1")
        );
    }
}
