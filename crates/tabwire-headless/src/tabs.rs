//! Tab store
//!
//! Tabs are ordered per window by `position`; pinned tabs always precede
//! unpinned ones and every window with tabs has exactly one active tab.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use tabwire_storage::Database;
use tabwire_surface::{
    CreateTab, SurfaceError, Tab, TabId, TabQuery, TabStatus, TabUpdate, UrlPattern, WindowId,
};

use crate::Result;

pub(crate) const BLANK_URL: &str = "about:blank";

const TAB_COLUMNS: &str = "id, window_id, position, url, title, active, pinned, status, fav_icon_url";

type StorageResult<T> = tabwire_storage::Result<T>;

/// Outcome of closing a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabRemoval {
    pub window_id: WindowId,
    pub window_closed: bool,
}

pub struct TabStore {
    db: Database,
}

impl TabStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn query(&self, query: &TabQuery) -> Result<Vec<Tab>> {
        let patterns = query
            .url
            .iter()
            .map(|raw| UrlPattern::parse(raw))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let (tabs, focused) = self.db.with_connection(|conn| {
            let focused = focused_window_id(conn)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {TAB_COLUMNS} FROM tabs ORDER BY window_id, position"
            ))?;
            let tabs: Vec<Tab> = stmt
                .query_map([], tab_from_row)?
                .collect::<std::result::Result<_, _>>()?;
            Ok((tabs, focused))
        })?;

        Ok(tabs
            .into_iter()
            .filter(|tab| query.window_id.map_or(true, |w| tab.window_id == w))
            .filter(|tab| match query.current_window {
                Some(current) => (Some(tab.window_id) == focused) == current,
                None => true,
            })
            .filter(|tab| query.active.map_or(true, |a| tab.active == a))
            .filter(|tab| query.pinned.map_or(true, |p| tab.pinned == p))
            .filter(|tab| patterns.is_empty() || patterns.iter().any(|p| p.matches(&tab.url)))
            .collect())
    }

    pub fn get(&self, tab_id: TabId) -> Result<Tab> {
        let tab = self.db.with_connection(|conn| load_tab(conn, tab_id))?;
        tab.ok_or_else(|| SurfaceError::TabNotFound(tab_id).into())
    }

    /// Open a tab in `create.window_id`, or the focused window
    pub fn create(&self, create: CreateTab) -> Result<Tab> {
        let url = create
            .url
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| BLANK_URL.to_string());

        let tab_id = self.db.transaction(|conn| {
            let window_id = match create.window_id {
                Some(id) if window_exists(conn, id)? => id,
                Some(id) => return Ok(Err(SurfaceError::WindowNotFound(id))),
                None => match focused_window_id(conn)? {
                    Some(id) => id,
                    None => return Ok(Err(SurfaceError::NoCurrentWindow)),
                },
            };
            Ok(Ok(insert_tab(
                conn,
                window_id,
                &url,
                create.active,
                create.pinned,
            )?))
        })??;

        let tab = self.get(tab_id)?;
        tracing::info!(
            tab_id = tab.id,
            window_id = tab.window_id,
            url = %tab.url,
            "Created new tab"
        );
        Ok(tab)
    }

    pub fn update(&self, tab_id: TabId, update: &TabUpdate) -> Result<Tab> {
        self.db.transaction(|conn| {
            let Some(tab) = load_tab(conn, tab_id)? else {
                return Ok(Err(SurfaceError::TabNotFound(tab_id)));
            };
            let now = Utc::now().to_rfc3339();

            if let Some(url) = &update.url {
                conn.execute(
                    "UPDATE tabs SET url = ?1, title = '', status = ?2, updated_at = ?3 WHERE id = ?4",
                    rusqlite::params![url, TabStatus::Complete.as_str(), now, tab_id],
                )?;
            }

            if update.active == Some(true) {
                activate(conn, tab.window_id, tab_id)?;
            }

            if let Some(pinned) = update.pinned.filter(|p| *p != tab.pinned) {
                conn.execute(
                    "UPDATE tabs SET pinned = ?1, updated_at = ?2 WHERE id = ?3",
                    rusqlite::params![pinned, now, tab_id],
                )?;
                normalize_positions(conn, tab.window_id)?;
            }

            Ok(Ok(()))
        })??;

        tracing::debug!(tab_id = tab_id, ?update, "Updated tab");
        self.get(tab_id)
    }

    /// Copy a page title onto the tab
    pub fn set_title(&self, tab_id: TabId, title: &str) -> Result<()> {
        self.db.with_connection(|conn| {
            conn.execute(
                "UPDATE tabs SET title = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![title, Utc::now().to_rfc3339(), tab_id],
            )?;
            Ok(())
        })?;
        Ok(())
    }

    /// Close a tab. Closing the last tab of a window closes the window.
    pub fn remove(&self, tab_id: TabId) -> Result<TabRemoval> {
        let removal = self.db.transaction(|conn| {
            let Some(tab) = load_tab(conn, tab_id)? else {
                return Ok(Err(SurfaceError::TabNotFound(tab_id)));
            };

            conn.execute("DELETE FROM tabs WHERE id = ?1", [tab_id])?;
            let remaining = window_tabs(conn, tab.window_id)?;

            if remaining.is_empty() {
                let was_focused: bool = conn.query_row(
                    "SELECT focused FROM windows WHERE id = ?1",
                    [tab.window_id],
                    |row| row.get(0),
                )?;
                conn.execute("DELETE FROM windows WHERE id = ?1", [tab.window_id])?;
                if was_focused {
                    focus_latest_window(conn)?;
                }
                return Ok(Ok(TabRemoval {
                    window_id: tab.window_id,
                    window_closed: true,
                }));
            }

            if tab.active {
                let neighbor = remaining
                    .get(tab.index)
                    .or_else(|| remaining.last())
                    .map(|t| t.id);
                if let Some(neighbor) = neighbor {
                    activate(conn, tab.window_id, neighbor)?;
                }
            }
            normalize_positions(conn, tab.window_id)?;

            Ok(Ok(TabRemoval {
                window_id: tab.window_id,
                window_closed: false,
            }))
        })??;

        tracing::info!(
            tab_id = tab_id,
            window_id = removal.window_id,
            window_closed = removal.window_closed,
            "Closed tab"
        );
        Ok(removal)
    }

    pub fn reload(&self, tab_id: TabId) -> Result<Tab> {
        let updated = self.db.with_connection(|conn| {
            Ok(conn.execute(
                "UPDATE tabs SET status = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![TabStatus::Complete.as_str(), Utc::now().to_rfc3339(), tab_id],
            )?)
        })?;

        if updated == 0 {
            return Err(SurfaceError::TabNotFound(tab_id).into());
        }
        self.get(tab_id)
    }
}

pub(crate) fn tab_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tab> {
    let position: i64 = row.get(2)?;
    let status_str: String = row.get(7)?;

    Ok(Tab {
        id: row.get(0)?,
        window_id: row.get(1)?,
        index: position.max(0) as usize,
        url: row.get(3)?,
        title: row.get(4)?,
        active: row.get(5)?,
        pinned: row.get(6)?,
        status: status_str.parse().unwrap_or(TabStatus::Complete),
        fav_icon_url: row.get(8)?,
    })
}

pub(crate) fn load_tab(conn: &Connection, tab_id: TabId) -> StorageResult<Option<Tab>> {
    Ok(conn
        .query_row(
            &format!("SELECT {TAB_COLUMNS} FROM tabs WHERE id = ?1"),
            [tab_id],
            tab_from_row,
        )
        .optional()?)
}

pub(crate) fn window_tabs(conn: &Connection, window_id: WindowId) -> StorageResult<Vec<Tab>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TAB_COLUMNS} FROM tabs WHERE window_id = ?1 ORDER BY position, id"
    ))?;
    let tabs = stmt
        .query_map([window_id], tab_from_row)?
        .collect::<std::result::Result<_, _>>()?;
    Ok(tabs)
}

pub(crate) fn focused_window_id(conn: &Connection) -> StorageResult<Option<WindowId>> {
    Ok(conn
        .query_row(
            "SELECT id FROM windows WHERE focused = 1 ORDER BY id DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?)
}

pub(crate) fn window_exists(conn: &Connection, window_id: WindowId) -> StorageResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM windows WHERE id = ?1",
        [window_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Give focus to the most recently created window, if any remain
pub(crate) fn focus_latest_window(conn: &Connection) -> StorageResult<()> {
    conn.execute(
        "UPDATE windows SET focused = (id = (SELECT MAX(id) FROM windows))",
        [],
    )?;
    Ok(())
}

/// Insert a tab at the end of its pinned or unpinned block.
///
/// The first tab of a window is always active.
pub(crate) fn insert_tab(
    conn: &Connection,
    window_id: WindowId,
    url: &str,
    active: bool,
    pinned: bool,
) -> StorageResult<TabId> {
    let (total, pinned_count): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(pinned), 0) FROM tabs WHERE window_id = ?1",
        [window_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let position = if pinned { pinned_count } else { total };

    conn.execute(
        "UPDATE tabs SET position = position + 1 WHERE window_id = ?1 AND position >= ?2",
        rusqlite::params![window_id, position],
    )?;

    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO tabs (window_id, position, url, title, active, pinned, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, '', 0, ?4, ?5, ?6, ?6)",
        rusqlite::params![
            window_id,
            position,
            url,
            pinned,
            TabStatus::Complete.as_str(),
            now
        ],
    )?;
    let tab_id = conn.last_insert_rowid();

    if active || total == 0 {
        activate(conn, window_id, tab_id)?;
    }
    Ok(tab_id)
}

fn activate(conn: &Connection, window_id: WindowId, tab_id: TabId) -> StorageResult<()> {
    conn.execute(
        "UPDATE tabs SET active = (id = ?1) WHERE window_id = ?2",
        rusqlite::params![tab_id, window_id],
    )?;
    Ok(())
}

/// Renumber a window's tabs 0..n with pinned tabs first
fn normalize_positions(conn: &Connection, window_id: WindowId) -> StorageResult<()> {
    let ids: Vec<TabId> = conn
        .prepare("SELECT id FROM tabs WHERE window_id = ?1 ORDER BY pinned DESC, position, id")?
        .query_map([window_id], |row| row.get(0))?
        .collect::<std::result::Result<_, _>>()?;

    for (position, id) in ids.into_iter().enumerate() {
        conn.execute(
            "UPDATE tabs SET position = ?1 WHERE id = ?2",
            rusqlite::params![position as i64, id],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeadlessError;

    fn store_with_window() -> (TabStore, WindowId) {
        let db = Database::open_in_memory().unwrap();
        let window_id = db
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO windows (kind, state, focused, created_at)
                     VALUES ('normal', 'normal', 1, '2024-01-01T00:00:00Z')",
                    [],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .unwrap();
        (TabStore::new(db), window_id)
    }

    fn urls(tabs: &[Tab]) -> Vec<&str> {
        tabs.iter().map(|t| t.url.as_str()).collect()
    }

    #[test]
    fn test_query_reports_undecodable_rows() {
        let (store, window_id) = store_with_window();
        store.create(CreateTab::new("https://a.test/")).unwrap();
        store
            .db
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO tabs (window_id, position, url, pinned, created_at, updated_at)
                     VALUES (?1, 5, 'https://bad.test/', 'yes', '', '')",
                    [window_id],
                )?;
                Ok(())
            })
            .unwrap();

        assert!(store.query(&TabQuery::default()).is_err());
    }

    #[test]
    fn test_create_activates_and_appends() {
        let (store, window_id) = store_with_window();
        let a = store.create(CreateTab::new("https://a.test/")).unwrap();
        let b = store.create(CreateTab::new("https://b.test/")).unwrap();

        assert_eq!(a.window_id, window_id);
        assert_eq!(b.index, 1);
        assert!(b.active);
        assert!(!store.get(a.id).unwrap().active);
    }

    #[test]
    fn test_background_tab_keeps_active() {
        let (store, _) = store_with_window();
        let a = store.create(CreateTab::new("https://a.test/")).unwrap();
        let mut background = CreateTab::new("https://b.test/");
        background.active = false;
        let b = store.create(background).unwrap();

        assert!(!b.active);
        assert!(store.get(a.id).unwrap().active);
    }

    #[test]
    fn test_pinned_tabs_stay_first() {
        let (store, window_id) = store_with_window();
        let a = store.create(CreateTab::new("https://a.test/")).unwrap();
        let b = store.create(CreateTab::new("https://b.test/")).unwrap();
        let c = store.create(CreateTab::new("https://c.test/")).unwrap();

        store.update(c.id, &TabUpdate::pin(true)).unwrap();
        store.update(b.id, &TabUpdate::pin(true)).unwrap();
        let tabs = store.query(&TabQuery::in_window(window_id)).unwrap();
        assert_eq!(
            urls(&tabs),
            vec!["https://c.test/", "https://b.test/", "https://a.test/"]
        );

        store.update(c.id, &TabUpdate::pin(false)).unwrap();
        let tabs = store.query(&TabQuery::in_window(window_id)).unwrap();
        assert_eq!(
            urls(&tabs),
            vec!["https://b.test/", "https://c.test/", "https://a.test/"]
        );
        let indexes: Vec<usize> = tabs.iter().map(|t| t.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert!(!store.get(a.id).unwrap().pinned);
    }

    #[test]
    fn test_remove_active_activates_neighbor() {
        let (store, window_id) = store_with_window();
        let a = store.create(CreateTab::new("https://a.test/")).unwrap();
        let b = store.create(CreateTab::new("https://b.test/")).unwrap();
        let c = store.create(CreateTab::new("https://c.test/")).unwrap();
        store.update(b.id, &TabUpdate::activate()).unwrap();

        let removal = store.remove(b.id).unwrap();
        assert!(!removal.window_closed);
        assert!(store.get(c.id).unwrap().active);

        let active = store
            .query(&TabQuery::active_in_current_window())
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, c.id);

        store.remove(c.id).unwrap();
        assert!(store.get(a.id).unwrap().active);
        assert_eq!(store.get(a.id).unwrap().window_id, window_id);
    }

    #[test]
    fn test_remove_last_tab_closes_window() {
        let (store, window_id) = store_with_window();
        let a = store.create(CreateTab::new("https://a.test/")).unwrap();

        let removal = store.remove(a.id).unwrap();
        assert_eq!(
            removal,
            TabRemoval {
                window_id,
                window_closed: true
            }
        );
        let err = store.create(CreateTab::new("https://b.test/")).unwrap_err();
        assert!(matches!(
            err,
            HeadlessError::Surface(SurfaceError::NoCurrentWindow)
        ));
    }

    #[test]
    fn test_query_by_pattern() {
        let (store, _) = store_with_window();
        store.create(CreateTab::new("https://docs.rs/tokio")).unwrap();
        store.create(CreateTab::new("https://example.com/")).unwrap();

        let tabs = store.query(&TabQuery::matching("*://docs.rs/*")).unwrap();
        assert_eq!(urls(&tabs), vec!["https://docs.rs/tokio"]);

        let err = store.query(&TabQuery::matching("not a pattern")).unwrap_err();
        assert!(matches!(
            err,
            HeadlessError::Surface(SurfaceError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_navigation_resets_title() {
        let (store, _) = store_with_window();
        let tab = store.create(CreateTab::new("https://a.test/")).unwrap();
        store.set_title(tab.id, "A").unwrap();

        let updated = store
            .update(tab.id, &TabUpdate::navigate("https://b.test/"))
            .unwrap();
        assert_eq!(updated.url, "https://b.test/");
        assert_eq!(updated.title, "");
    }

    #[test]
    fn test_unknown_tab() {
        let (store, _) = store_with_window();
        assert_eq!(
            SurfaceError::from(store.get(99).unwrap_err()).to_string(),
            "No tab with id: 99."
        );
        assert!(store.reload(99).is_err());
        assert!(store.remove(99).is_err());
        assert!(store.update(99, &TabUpdate::activate()).is_err());
    }
}
