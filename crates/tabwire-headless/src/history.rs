//! Browsing history

use chrono::{DateTime, Utc};
use tabwire_storage::Database;
use tabwire_surface::{HistoryItem, HistoryQuery};

use crate::Result;

pub struct HistoryStore {
    db: Database,
}

impl HistoryStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a visit to a URL
    pub fn record_visit(&self, url: &str, title: &str) -> Result<()> {
        Ok(self.db.with_connection(|conn| {
            let updated = conn.execute(
                "UPDATE history
                 SET title = CASE WHEN ?1 != '' THEN ?1 ELSE title END,
                     visited_at = ?2,
                     visit_count = visit_count + 1
                 WHERE url = ?3",
                rusqlite::params![title, Utc::now().to_rfc3339(), url],
            )?;

            if updated == 0 {
                conn.execute(
                    "INSERT INTO history (url, title, visited_at, visit_count) VALUES (?1, ?2, ?3, 1)",
                    rusqlite::params![url, title, Utc::now().to_rfc3339()],
                )?;
            }

            Ok(())
        })?)
    }

    /// Update the stored title for a URL without counting a visit.
    pub fn update_title(&self, url: &str, title: &str) -> Result<()> {
        if title.trim().is_empty() {
            return Ok(());
        }

        Ok(self.db.with_connection(|conn| {
            conn.execute(
                "UPDATE history SET title = ?1 WHERE url = ?2",
                rusqlite::params![title, url],
            )?;
            Ok(())
        })?)
    }

    /// Search by substring of url or title, most recent first.
    ///
    /// An empty `text` matches every entry. `start_time` is milliseconds
    /// since the epoch.
    pub fn search(&self, query: &HistoryQuery) -> Result<Vec<HistoryItem>> {
        let since = query
            .start_time
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.to_rfc3339());

        Ok(self.db.with_connection(|conn| {
            let pattern = format!("%{}%", escape_like(&query.text.to_lowercase()));

            let mut stmt = conn.prepare(
                "SELECT id, url, title, visited_at, visit_count FROM history
                 WHERE (LOWER(url) LIKE ?1 ESCAPE '\\' OR LOWER(title) LIKE ?1 ESCAPE '\\')
                   AND (?2 IS NULL OR visited_at >= ?2)
                 ORDER BY visited_at DESC, visit_count DESC
                 LIMIT ?3",
            )?;

            let items: Vec<HistoryItem> = stmt
                .query_map(
                    rusqlite::params![pattern, since, query.max_results as i64],
                    |row| {
                        let id: i64 = row.get(0)?;
                        let visited_str: String = row.get(3)?;
                        let visited_at = DateTime::parse_from_rfc3339(&visited_str)
                            .map(|dt| dt.with_timezone(&Utc))
                            .unwrap_or_else(|_| Utc::now());

                        Ok(HistoryItem {
                            id: id.to_string(),
                            url: row.get(1)?,
                            title: row.get(2)?,
                            last_visit_time: visited_at.timestamp_millis(),
                            visit_count: row.get(4)?,
                        })
                    },
                )?
                .collect::<std::result::Result<_, _>>()?;

            Ok(items)
        })?)
    }
}

/// Make `%` and `_` match themselves in a LIKE pattern escaped with `\`
fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
