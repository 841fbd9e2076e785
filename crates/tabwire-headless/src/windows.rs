//! Window store
//!
//! At most one window is focused. New windows take focus.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use tabwire_storage::Database;
use tabwire_surface::{
    CreateWindow, Rect, SurfaceError, TabId, Window, WindowId, WindowState, WindowUpdate,
};

use crate::tabs::{focus_latest_window, insert_tab, window_exists, window_tabs, BLANK_URL};
use crate::Result;

const WINDOW_COLUMNS: &str = "id, focused, kind, state, pos_left, pos_top, width, height";

pub struct WindowStore {
    db: Database,
    default_bounds: Rect,
}

impl WindowStore {
    pub fn new(db: Database, default_bounds: Rect) -> Self {
        Self { db, default_bounds }
    }

    pub fn list(&self, populate: bool) -> Result<Vec<Window>> {
        Ok(self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {WINDOW_COLUMNS} FROM windows ORDER BY id"
            ))?;
            let mut windows: Vec<Window> = stmt
                .query_map([], window_from_row)?
                .collect::<std::result::Result<_, _>>()?;

            if populate {
                for window in &mut windows {
                    window.tabs = Some(window_tabs(conn, window.id)?);
                }
            }
            Ok(windows)
        })?)
    }

    pub fn get(&self, window_id: WindowId, populate: bool) -> Result<Window> {
        let window = self
            .db
            .with_connection(|conn| load_window(conn, window_id, populate))?;
        window.ok_or_else(|| SurfaceError::WindowNotFound(window_id).into())
    }

    /// The focused window, if any
    pub fn current(&self) -> Result<Option<Window>> {
        Ok(self.db.with_connection(|conn| {
            let id: Option<WindowId> = conn
                .query_row(
                    "SELECT id FROM windows WHERE focused = 1 ORDER BY id DESC LIMIT 1",
                    [],
                    |row| row.get(0),
                )
                .optional()?;
            match id {
                Some(id) => load_window(conn, id, false),
                None => Ok(None),
            }
        })?)
    }

    /// Open a focused window holding one tab per url (a blank tab when none)
    pub fn create(&self, create: &CreateWindow) -> Result<Window> {
        let bounds = Rect {
            left: create.left.unwrap_or(self.default_bounds.left),
            top: create.top.unwrap_or(self.default_bounds.top),
            width: create.width.unwrap_or(self.default_bounds.width),
            height: create.height.unwrap_or(self.default_bounds.height),
        };

        let window_id = self.db.transaction(|conn| {
            conn.execute("UPDATE windows SET focused = 0", [])?;
            conn.execute(
                "INSERT INTO windows (kind, state, focused, pos_left, pos_top, width, height, created_at)
                 VALUES (?1, ?2, 1, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    create.kind.as_str(),
                    WindowState::Normal.as_str(),
                    bounds.left,
                    bounds.top,
                    bounds.width,
                    bounds.height,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            let window_id = conn.last_insert_rowid();

            if create.urls.is_empty() {
                insert_tab(conn, window_id, BLANK_URL, true, false)?;
            }
            for (i, url) in create.urls.iter().enumerate() {
                insert_tab(conn, window_id, url, i == 0, false)?;
            }
            Ok(window_id)
        })?;

        let window = self.get(window_id, true)?;
        tracing::info!(
            window_id = window.id,
            kind = %window.kind.as_str(),
            tabs = window.tabs.as_ref().map_or(0, Vec::len),
            "Created window"
        );
        Ok(window)
    }

    pub fn update(&self, window_id: WindowId, update: &WindowUpdate) -> Result<Window> {
        self.db.transaction(|conn| {
            if !window_exists(conn, window_id)? {
                return Ok(Err(SurfaceError::WindowNotFound(window_id)));
            }

            match update.focused {
                Some(true) => {
                    conn.execute(
                        "UPDATE windows SET focused = (id = ?1)",
                        [window_id],
                    )?;
                }
                Some(false) => {
                    conn.execute("UPDATE windows SET focused = 0 WHERE id = ?1", [window_id])?;
                }
                None => {}
            }

            conn.execute(
                "UPDATE windows SET
                    state = COALESCE(?1, state),
                    pos_left = COALESCE(?2, pos_left),
                    pos_top = COALESCE(?3, pos_top),
                    width = COALESCE(?4, width),
                    height = COALESCE(?5, height)
                 WHERE id = ?6",
                rusqlite::params![
                    update.state.map(|s| s.as_str()),
                    update.left,
                    update.top,
                    update.width,
                    update.height,
                    window_id,
                ],
            )?;
            Ok(Ok(()))
        })??;

        if update.focused == Some(true) {
            tracing::info!(window_id = window_id, "Focused window");
        }
        self.get(window_id, false)
    }

    /// Close a window and all its tabs, returning the closed tab ids
    pub fn remove(&self, window_id: WindowId) -> Result<Vec<TabId>> {
        let tab_ids = self.db.transaction(|conn| {
            let Some(window) = load_window(conn, window_id, true)? else {
                return Ok(Err(SurfaceError::WindowNotFound(window_id)));
            };

            conn.execute("DELETE FROM windows WHERE id = ?1", [window_id])?;
            if window.focused {
                focus_latest_window(conn)?;
            }

            let tab_ids: Vec<TabId> = window
                .tabs
                .unwrap_or_default()
                .into_iter()
                .map(|t| t.id)
                .collect();
            Ok(Ok(tab_ids))
        })??;

        tracing::info!(window_id = window_id, tabs = tab_ids.len(), "Closed window");
        Ok(tab_ids)
    }
}

fn window_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Window> {
    let kind_str: String = row.get(2)?;
    let state_str: String = row.get(3)?;

    Ok(Window {
        id: row.get(0)?,
        focused: row.get(1)?,
        kind: kind_str.parse().unwrap_or_default(),
        state: state_str.parse().unwrap_or_default(),
        left: row.get(4)?,
        top: row.get(5)?,
        width: row.get(6)?,
        height: row.get(7)?,
        tabs: None,
    })
}

fn load_window(
    conn: &Connection,
    window_id: WindowId,
    populate: bool,
) -> tabwire_storage::Result<Option<Window>> {
    let window = conn
        .query_row(
            &format!("SELECT {WINDOW_COLUMNS} FROM windows WHERE id = ?1"),
            [window_id],
            window_from_row,
        )
        .optional()?;

    match window {
        Some(mut window) if populate => {
            window.tabs = Some(window_tabs(conn, window_id)?);
            Ok(Some(window))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabs::TabStore;
    use tabwire_surface::{CreateTab, WindowKind};

    fn bounds() -> Rect {
        Rect {
            left: 0,
            top: 0,
            width: 1280,
            height: 800,
        }
    }

    fn stores() -> (WindowStore, TabStore) {
        let db = Database::open_in_memory().unwrap();
        (WindowStore::new(db.clone(), bounds()), TabStore::new(db))
    }

    #[test]
    fn test_create_window_takes_focus() {
        let (windows, _) = stores();
        let first = windows.create(&CreateWindow::default()).unwrap();
        let second = windows
            .create(&CreateWindow::with_urls(vec![
                "https://a.test/".to_string(),
                "https://b.test/".to_string(),
            ]))
            .unwrap();

        assert!(second.focused);
        assert!(!windows.get(first.id, false).unwrap().focused);
        assert_eq!(windows.current().unwrap().unwrap().id, second.id);

        let tabs = second.tabs.unwrap();
        assert_eq!(tabs.len(), 2);
        assert!(tabs[0].active);
        assert!(!tabs[1].active);

        let blank = windows.get(first.id, true).unwrap().tabs.unwrap();
        assert_eq!(blank[0].url, BLANK_URL);
    }

    #[test]
    fn test_popup_geometry() {
        let (windows, _) = stores();
        let popup = windows
            .create(&CreateWindow {
                urls: vec!["/src/index.html?popup=true".to_string()],
                kind: WindowKind::Popup,
                left: Some(585),
                top: Some(290),
                width: Some(750),
                height: Some(500),
            })
            .unwrap();
        assert_eq!(popup.kind, WindowKind::Popup);
        assert_eq!((popup.left, popup.top, popup.width, popup.height), (585, 290, 750, 500));
    }

    #[test]
    fn test_focus_and_state_update() {
        let (windows, _) = stores();
        let first = windows.create(&CreateWindow::default()).unwrap();
        windows.create(&CreateWindow::default()).unwrap();

        let focused = windows.update(first.id, &WindowUpdate::focus()).unwrap();
        assert!(focused.focused);
        let all = windows.list(false).unwrap();
        assert_eq!(all.iter().filter(|w| w.focused).count(), 1);

        let maximized = windows
            .update(
                first.id,
                &WindowUpdate {
                    state: Some(WindowState::Maximized),
                    width: Some(1920),
                    ..WindowUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(maximized.state, WindowState::Maximized);
        assert_eq!(maximized.width, 1920);
        assert_eq!(maximized.height, 800);
    }

    #[test]
    fn test_remove_focused_window_refocuses_latest() {
        let (windows, tabs) = stores();
        let first = windows.create(&CreateWindow::default()).unwrap();
        let second = windows.create(&CreateWindow::default()).unwrap();
        let third = windows.create(&CreateWindow::default()).unwrap();
        windows.update(first.id, &WindowUpdate::focus()).unwrap();

        let closed = windows.remove(first.id).unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(windows.current().unwrap().unwrap().id, third.id);
        assert!(tabs.get(closed[0]).is_err());

        windows.remove(second.id).unwrap();
        assert_eq!(windows.list(false).unwrap().len(), 1);
        assert!(windows.remove(second.id).is_err());
    }

    #[test]
    fn test_populate_lists_tabs() {
        let (windows, tabs) = stores();
        let window = windows.create(&CreateWindow::default()).unwrap();
        tabs.create(CreateTab::new("https://a.test/")).unwrap();

        let listed = windows.list(true).unwrap();
        assert_eq!(listed[0].id, window.id);
        assert_eq!(listed[0].tabs.as_ref().unwrap().len(), 2);
        assert!(windows.list(false).unwrap()[0].tabs.is_none());
    }
}
