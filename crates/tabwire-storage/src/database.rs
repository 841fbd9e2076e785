//! Database connection and operations

use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;

use crate::migrations::run_migrations;
use crate::Result;

/// Shared handle to the surface database. Clones share one connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file, creating parent directories
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(path = %path.display(), "Opened database");
        Self::prepare(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        f(&self.conn.lock())
    }

    /// Run `f` in a transaction; any error rolls it back
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            let count: i32 = conn.query_row("SELECT COUNT(*) FROM windows", [], |row| row.get(0))?;
            assert_eq!(count, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_bookmark_roots_seeded() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            let titles: Vec<String> = conn
                .prepare("SELECT title FROM bookmarks ORDER BY id")?
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<_, _>>()?;
            assert_eq!(titles, vec!["", "Bookmarks bar", "Other bookmarks"]);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();
        let result: Result<()> = db.transaction(|conn| {
            conn.execute(
                "INSERT INTO windows (kind, state, focused, pos_left, pos_top, width, height, created_at)
                 VALUES ('normal', 'normal', 1, 0, 0, 800, 600, '2024-01-01T00:00:00Z')",
                [],
            )?;
            Err(crate::StorageError::Migration("boom".to_string()))
        });
        assert!(result.is_err());

        db.with_connection(|conn| {
            let count: i32 = conn.query_row("SELECT COUNT(*) FROM windows", [], |row| row.get(0))?;
            assert_eq!(count, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_open_on_disk_creates_parent() {
        let dir = std::env::temp_dir().join(format!("tabwire-db-{}", std::process::id()));
        let path = dir.join("nested").join("tabwire.db");
        let db = Database::open(&path).unwrap();
        drop(db);
        assert!(path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
