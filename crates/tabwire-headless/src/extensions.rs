//! Installed extension registry

use chrono::Utc;
use tabwire_storage::Database;
use tabwire_surface::ExtensionInfo;

use crate::Result;

pub struct ExtensionStore {
    db: Database,
}

impl ExtensionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Install or replace an extension record
    pub fn install(&self, info: &ExtensionInfo) -> Result<()> {
        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO extensions (id, name, version, description, enabled, installed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    info.id,
                    info.name,
                    info.version,
                    info.description,
                    info.enabled,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })?;

        tracing::info!(extension_id = %info.id, version = %info.version, "Installed extension");
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<ExtensionInfo>> {
        Ok(self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, version, description, enabled FROM extensions ORDER BY name, id",
            )?;

            let items: Vec<ExtensionInfo> = stmt
                .query_map([], |row| {
                    Ok(ExtensionInfo {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        version: row.get(2)?,
                        description: row.get(3)?,
                        enabled: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<_, _>>()?;

            Ok(items)
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: &str, name: &str, version: &str) -> ExtensionInfo {
        ExtensionInfo {
            id: id.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            description: String::new(),
            enabled: true,
        }
    }

    #[test]
    fn test_install_replaces_by_id() {
        let store = ExtensionStore::new(Database::open_in_memory().unwrap());
        store.install(&info("wesh", "Wesh", "0.1.0")).unwrap();
        store.install(&info("adblock", "Ad blocker", "2.0.0")).unwrap();
        store.install(&info("wesh", "Wesh", "0.2.0")).unwrap();

        let list = store.list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "adblock");
        assert_eq!(list[1].version, "0.2.0");
    }
}
