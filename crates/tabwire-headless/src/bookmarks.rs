//! Bookmark tree
//!
//! Ids `0` (root), `1` ("Bookmarks bar") and `2` ("Other bookmarks") are
//! seeded by the schema and cannot be modified. Nodes without a url are
//! folders.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeMap;
use tabwire_storage::Database;
use tabwire_surface::{BookmarkNode, CreateBookmark, SurfaceError};

use crate::Result;

const ROOT_ID: i64 = 0;
const OTHER_BOOKMARKS_ID: i64 = 2;

struct BookmarkRow {
    id: i64,
    parent_id: Option<i64>,
    position: i64,
    title: String,
    url: Option<String>,
    date_added: i64,
}

impl BookmarkRow {
    fn into_node(self, children: Option<Vec<BookmarkNode>>) -> BookmarkNode {
        BookmarkNode {
            id: self.id.to_string(),
            parent_id: self.parent_id.map(|p| p.to_string()),
            index: self.position.max(0) as usize,
            title: self.title,
            url: self.url,
            date_added: self.date_added,
            children,
        }
    }
}

pub struct BookmarkStore {
    db: Database,
}

impl BookmarkStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The whole tree, as a single root node
    pub fn tree(&self) -> Result<Vec<BookmarkNode>> {
        let rows = self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, parent_id, position, title, url, date_added
                 FROM bookmarks ORDER BY parent_id, position, id",
            )?;
            let rows: Vec<BookmarkRow> = stmt
                .query_map([], bookmark_from_row)?
                .collect::<std::result::Result<_, _>>()?;
            Ok(rows)
        })?;

        let mut root = None;
        let mut by_parent: BTreeMap<i64, Vec<BookmarkRow>> = BTreeMap::new();
        for row in rows {
            match row.parent_id {
                Some(parent) => by_parent.entry(parent).or_default().push(row),
                None if row.id == ROOT_ID => root = Some(row),
                None => {}
            }
        }

        fn build(
            row: BookmarkRow,
            by_parent: &mut BTreeMap<i64, Vec<BookmarkRow>>,
        ) -> BookmarkNode {
            if row.url.is_some() {
                return row.into_node(None);
            }
            let children = by_parent
                .remove(&row.id)
                .unwrap_or_default()
                .into_iter()
                .map(|child| build(child, by_parent))
                .collect();
            row.into_node(Some(children))
        }

        Ok(root
            .map(|row| vec![build(row, &mut by_parent)])
            .unwrap_or_default())
    }

    /// Create a bookmark, or a folder when no url is given
    pub fn create(&self, create: CreateBookmark) -> Result<BookmarkNode> {
        let parent_raw = create
            .parent_id
            .clone()
            .unwrap_or_else(|| OTHER_BOOKMARKS_ID.to_string());
        let parent_id: i64 = parent_raw
            .parse()
            .map_err(|_| SurfaceError::BookmarkParentNotFound(parent_raw.clone()))?;

        if parent_id == ROOT_ID {
            return Err(SurfaceError::RootBookmarkFolder.into());
        }

        let title = create.title.unwrap_or_default();
        let url = create.url.filter(|u| !u.is_empty());
        if let Some(url) = url.as_deref() {
            url::Url::parse(url).map_err(|_| SurfaceError::InvalidUrl(url.to_string()))?;
        }

        let row = self.db.transaction(|conn| {
            if !is_folder(conn, parent_id)? {
                return Ok(None);
            }

            let position: i64 = conn.query_row(
                "SELECT COUNT(*) FROM bookmarks WHERE parent_id = ?1",
                [parent_id],
                |row| row.get(0),
            )?;
            let date_added = Utc::now().timestamp_millis();

            conn.execute(
                "INSERT INTO bookmarks (parent_id, position, title, url, date_added)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![parent_id, position, title, url, date_added],
            )?;

            Ok(Some(BookmarkRow {
                id: conn.last_insert_rowid(),
                parent_id: Some(parent_id),
                position,
                title: title.clone(),
                url: url.clone(),
                date_added,
            }))
        })?;

        let row = row.ok_or(SurfaceError::BookmarkParentNotFound(parent_raw))?;
        tracing::info!(bookmark_id = row.id, parent_id = parent_id, "Created bookmark");
        let children = row.url.is_none().then(Vec::new);
        Ok(row.into_node(children))
    }

    /// Remove a bookmark or an empty folder
    pub fn remove(&self, id: &str) -> Result<()> {
        let numeric: i64 = id
            .parse()
            .map_err(|_| SurfaceError::BookmarkNotFound(id.to_string()))?;

        if (ROOT_ID..=OTHER_BOOKMARKS_ID).contains(&numeric) {
            return Err(SurfaceError::RootBookmarkFolder.into());
        }

        let outcome = self.db.transaction(|conn| {
            let parent: Option<Option<i64>> = conn
                .query_row(
                    "SELECT parent_id FROM bookmarks WHERE id = ?1",
                    [numeric],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(parent) = parent else {
                return Ok(Err(SurfaceError::BookmarkNotFound(id.to_string())));
            };

            let children: i64 = conn.query_row(
                "SELECT COUNT(*) FROM bookmarks WHERE parent_id = ?1",
                [numeric],
                |row| row.get(0),
            )?;
            if children > 0 {
                return Ok(Err(SurfaceError::NonEmptyFolder));
            }

            conn.execute("DELETE FROM bookmarks WHERE id = ?1", [numeric])?;
            if let Some(parent) = parent {
                reindex_children(conn, parent)?;
            }
            Ok(Ok(()))
        })?;

        outcome?;
        tracing::info!(bookmark_id = numeric, "Removed bookmark");
        Ok(())
    }
}

fn bookmark_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BookmarkRow> {
    Ok(BookmarkRow {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        position: row.get(2)?,
        title: row.get(3)?,
        url: row.get(4)?,
        date_added: row.get(5)?,
    })
}

fn is_folder(conn: &Connection, id: i64) -> tabwire_storage::Result<bool> {
    let url: Option<Option<String>> = conn
        .query_row("SELECT url FROM bookmarks WHERE id = ?1", [id], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(matches!(url, Some(None)))
}

fn reindex_children(conn: &Connection, parent_id: i64) -> tabwire_storage::Result<()> {
    let ids: Vec<i64> = conn
        .prepare("SELECT id FROM bookmarks WHERE parent_id = ?1 ORDER BY position, id")?
        .query_map([parent_id], |row| row.get(0))?
        .collect::<std::result::Result<_, _>>()?;

    for (position, id) in ids.into_iter().enumerate() {
        conn.execute(
            "UPDATE bookmarks SET position = ?1 WHERE id = ?2",
            rusqlite::params![position as i64, id],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeadlessError;

    fn store() -> BookmarkStore {
        BookmarkStore::new(Database::open_in_memory().unwrap())
    }

    fn bookmark(parent: Option<&str>, title: &str, url: Option<&str>) -> CreateBookmark {
        CreateBookmark {
            parent_id: parent.map(str::to_string),
            title: Some(title.to_string()),
            url: url.map(str::to_string),
        }
    }

    #[test]
    fn test_tree_has_seeded_roots() {
        let tree = store().tree().unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, "0");
        assert_eq!(tree[0].parent_id, None);

        let children = tree[0].children.as_ref().unwrap();
        let titles: Vec<&str> = children.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Bookmarks bar", "Other bookmarks"]);
    }

    #[test]
    fn test_create_defaults_to_other_bookmarks() {
        let store = store();
        let node = store
            .create(bookmark(None, "Rust", Some("https://www.rust-lang.org/")))
            .unwrap();
        assert_eq!(node.parent_id.as_deref(), Some("2"));
        assert_eq!(node.index, 0);
        assert!(node.children.is_none());

        let tree = store.tree().unwrap();
        let other = &tree[0].children.as_ref().unwrap()[1];
        assert_eq!(other.children.as_ref().unwrap()[0].title, "Rust");
    }

    #[test]
    fn test_folder_nesting_and_removal_rules() {
        let store = store();
        let folder = store.create(bookmark(Some("1"), "Docs", None)).unwrap();
        assert!(folder.is_folder());
        assert_eq!(folder.children, Some(Vec::new()));

        let child = store
            .create(bookmark(Some(&folder.id), "Tokio", Some("https://tokio.rs/")))
            .unwrap();

        let err = store.remove(&folder.id).unwrap_err();
        assert!(matches!(
            err,
            HeadlessError::Surface(SurfaceError::NonEmptyFolder)
        ));

        store.remove(&child.id).unwrap();
        store.remove(&folder.id).unwrap();
    }

    #[test]
    fn test_roots_are_protected() {
        let store = store();
        for id in ["0", "1", "2"] {
            let err = store.remove(id).unwrap_err();
            assert_eq!(
                SurfaceError::from(err).to_string(),
                "Can't modify the root bookmark folders."
            );
        }
        assert!(store.create(bookmark(Some("0"), "x", None)).is_err());
    }

    #[test]
    fn test_unknown_ids() {
        let store = store();
        let err = store.remove("999").unwrap_err();
        assert!(matches!(
            err,
            HeadlessError::Surface(SurfaceError::BookmarkNotFound(_))
        ));

        let bookmark_node = store
            .create(bookmark(None, "a", Some("https://a.test/")))
            .unwrap();
        let err = store
            .create(bookmark(Some(&bookmark_node.id), "b", None))
            .unwrap_err();
        assert!(matches!(
            err,
            HeadlessError::Surface(SurfaceError::BookmarkParentNotFound(_))
        ));
    }

    #[test]
    fn test_remove_reindexes_siblings() {
        let store = store();
        let a = store.create(bookmark(None, "a", Some("https://a.test/"))).unwrap();
        let b = store.create(bookmark(None, "b", Some("https://b.test/"))).unwrap();
        assert_eq!(b.index, 1);

        store.remove(&a.id).unwrap();
        let tree = store.tree().unwrap();
        let other = &tree[0].children.as_ref().unwrap()[1];
        let children = other.children.as_ref().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].index, 0);
    }
}
