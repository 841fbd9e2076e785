//! Download records
//!
//! The headless surface never transfers bytes itself; the host records
//! downloads it performed so `download.list` can enumerate them.

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use std::path::Path;
use tabwire_storage::Database;
use tabwire_surface::{DownloadItem, DownloadQuery, DownloadState, SurfaceError};

use crate::Result;

const DOWNLOAD_COLUMNS: &str =
    "id, url, filename, mime_type, state, bytes_received, total_bytes, started_at";

pub struct DownloadStore {
    db: Database,
}

impl DownloadStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a new in-progress download
    pub fn record(
        &self,
        url: &str,
        file_name: &str,
        mime_type: Option<&str>,
        total_bytes: i64,
    ) -> Result<DownloadItem> {
        let filename = sanitize_file_name(file_name);

        let id = self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO downloads (url, filename, mime_type, state, total_bytes, started_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    url,
                    filename,
                    mime_type,
                    DownloadState::InProgress.as_str(),
                    total_bytes,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        tracing::info!(download_id = id, url = %url, "Recorded download");

        self.get(id)
    }

    pub fn get(&self, id: i64) -> Result<DownloadItem> {
        let item = self.db.with_connection(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {DOWNLOAD_COLUMNS} FROM downloads WHERE id = ?1"),
                    [id],
                    download_from_row,
                )
                .optional()?)
        })?;

        item.ok_or_else(|| SurfaceError::DownloadNotFound(id).into())
    }

    /// Update progress and state of a recorded download
    pub fn update_progress(
        &self,
        id: i64,
        bytes_received: i64,
        state: DownloadState,
    ) -> Result<DownloadItem> {
        let updated = self.db.with_connection(|conn| {
            Ok(conn.execute(
                "UPDATE downloads SET bytes_received = ?1, state = ?2 WHERE id = ?3",
                rusqlite::params![bytes_received, state.as_str(), id],
            )?)
        })?;

        if updated == 0 {
            return Err(SurfaceError::DownloadNotFound(id).into());
        }

        if state != DownloadState::InProgress {
            tracing::info!(download_id = id, state = %state.as_str(), "Download finished");
        }

        self.get(id)
    }

    /// Most recent first, optionally filtered by state
    pub fn search(&self, query: &DownloadQuery) -> Result<Vec<DownloadItem>> {
        let state = query.state.map(|s| s.as_str());
        let limit = query.limit.map(|l| l as i64).unwrap_or(-1);

        Ok(self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DOWNLOAD_COLUMNS} FROM downloads
                 WHERE (?1 IS NULL OR state = ?1)
                 ORDER BY started_at DESC, id DESC
                 LIMIT ?2"
            ))?;

            let items: Vec<DownloadItem> = stmt
                .query_map(rusqlite::params![state, limit], download_from_row)?
                .collect::<std::result::Result<_, _>>()?;

            Ok(items)
        })?)
    }
}

fn download_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DownloadItem> {
    let state_str: String = row.get(4)?;
    let state = state_str.parse().unwrap_or(DownloadState::Interrupted);

    let started_str: String = row.get(7)?;
    let started_at = DateTime::parse_from_rfc3339(&started_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(DownloadItem {
        id: row.get(0)?,
        url: row.get(1)?,
        filename: row.get(2)?,
        mime: row.get(3)?,
        state,
        bytes_received: row.get(5)?,
        total_bytes: row.get(6)?,
        start_time: started_at.to_rfc3339(),
    })
}

fn sanitize_file_name(file_name: &str) -> String {
    let name = Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("download")
        .trim();

    if name.is_empty() {
        "download".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeadlessError;

    #[test]
    fn test_download_lifecycle() {
        let store = DownloadStore::new(Database::open_in_memory().unwrap());

        let item = store
            .record(
                "https://example.com/file.pdf",
                "../../file.pdf",
                Some("application/pdf"),
                1000,
            )
            .unwrap();
        assert_eq!(item.filename, "file.pdf");
        assert_eq!(item.state, DownloadState::InProgress);

        let done = store
            .update_progress(item.id, 1000, DownloadState::Complete)
            .unwrap();
        assert_eq!(done.bytes_received, 1000);
        assert_eq!(done.state, DownloadState::Complete);
    }

    #[test]
    fn test_search_filters_by_state() {
        let store = DownloadStore::new(Database::open_in_memory().unwrap());
        let a = store.record("https://a.test/a.zip", "a.zip", None, 10).unwrap();
        store.record("https://b.test/b.zip", "b.zip", None, 10).unwrap();
        store
            .update_progress(a.id, 10, DownloadState::Complete)
            .unwrap();

        let all = store.search(&DownloadQuery::default()).unwrap();
        assert_eq!(all.len(), 2);

        let complete = store
            .search(&DownloadQuery {
                state: Some(DownloadState::Complete),
                limit: None,
            })
            .unwrap();
        assert_eq!(complete.len(), 1);
        assert_eq!(complete[0].id, a.id);

        let limited = store
            .search(&DownloadQuery {
                state: None,
                limit: Some(1),
            })
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_unknown_download() {
        let store = DownloadStore::new(Database::open_in_memory().unwrap());
        let err = store
            .update_progress(42, 0, DownloadState::Interrupted)
            .unwrap_err();
        assert!(matches!(
            err,
            HeadlessError::Surface(SurfaceError::DownloadNotFound(42))
        ));
    }
}
