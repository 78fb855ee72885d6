//! SQLite backing for the metadata store
//!
//! Two tables mirror the in-memory shape: `versions (name, ordinal)` and
//! `items (version, key, section, name, description)` keyed by
//! `(version, key)`. Saving is a full replace inside one transaction.

use std::fs;
use std::path::Path;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use super::backing::{BackingKind, MetadataBacking};
use super::error::{StoreError, StoreResult};
use crate::domain::{MetadataItem, VersionedMetadataStore};

/// Relational-table file backing
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteBacking;

impl SqliteBacking {
    /// Schema version - bump when schema changes to force a rebuild on save
    const SCHEMA_VERSION: i32 = 1;

    fn schema_version(conn: &Connection) -> rusqlite::Result<i32> {
        let version: Option<i32> = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .optional()?;
        Ok(version.unwrap_or(0))
    }

    fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
        if Self::schema_version(conn)? == Self::SCHEMA_VERSION {
            return Ok(());
        }

        conn.execute_batch(
            "
            DROP TABLE IF EXISTS items;
            DROP TABLE IF EXISTS versions;

            CREATE TABLE versions (
                name TEXT PRIMARY KEY,
                ordinal INTEGER NOT NULL
            );

            CREATE TABLE items (
                version TEXT NOT NULL REFERENCES versions(name),
                key TEXT NOT NULL,
                section TEXT NOT NULL DEFAULT '',
                name TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                PRIMARY KEY (version, key)
            );

            CREATE INDEX idx_versions_ordinal ON versions(ordinal);
            ",
        )?;

        conn.execute(
            &format!("PRAGMA user_version = {}", Self::SCHEMA_VERSION),
            [],
        )?;
        Ok(())
    }

    fn read(conn: &Connection) -> rusqlite::Result<(VersionedMetadataStore, usize)> {
        let mut store = VersionedMetadataStore::new();

        let mut stmt = conn.prepare("SELECT name FROM versions ORDER BY ordinal, rowid")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
        for name in names {
            store.add_version(&name?);
        }

        let mut stmt = conn.prepare(
            "SELECT version, key, section, name, description FROM items ORDER BY version, key",
        )?;
        let rows = stmt.query_map([], |row| {
            let version: String = row.get(0)?;
            let item = MetadataItem {
                key: row.get(1)?,
                section: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                name: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                description: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            };
            Ok((version, item))
        })?;

        let mut orphans = 0;
        for row in rows {
            let (version, item) = row?;
            if store.version(&version).is_none() || !store.insert_into(&version, item) {
                orphans += 1;
            }
        }
        Ok((store, orphans))
    }

    fn write(conn: &mut Connection, store: &VersionedMetadataStore) -> rusqlite::Result<()> {
        Self::ensure_schema(conn)?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM items", [])?;
        tx.execute("DELETE FROM versions", [])?;

        {
            let mut insert_version =
                tx.prepare("INSERT INTO versions (name, ordinal) VALUES (?1, ?2)")?;
            let mut insert_item = tx.prepare(
                "INSERT INTO items (version, key, section, name, description)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;

            for (ordinal, version) in store.versions().iter().enumerate() {
                insert_version.execute(params![version.name(), ordinal as i64])?;
                for item in version.items() {
                    insert_item.execute(params![
                        version.name(),
                        item.key,
                        item.section,
                        item.name,
                        item.description,
                    ])?;
                }
            }
        }

        tx.commit()
    }
}

impl MetadataBacking for SqliteBacking {
    fn kind(&self) -> BackingKind {
        BackingKind::Sqlite
    }

    fn load(&self, path: &Path) -> StoreResult<VersionedMetadataStore> {
        // Opening read-only keeps a missing path from being created as an empty database
        fs::metadata(path).map_err(|e| StoreError::io("read", path, e))?;

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| StoreError::database(path, e))?;
        let (store, orphans) = Self::read(&conn).map_err(|e| StoreError::database(path, e))?;

        if orphans > 0 {
            tracing::warn!(path = %path.display(), orphans, "skipped items without a known version");
        }
        tracing::debug!(
            path = %path.display(),
            versions = store.versions().len(),
            items = store.total_items(),
            "loaded metadata"
        );
        Ok(store)
    }

    fn save(&self, store: &VersionedMetadataStore, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::io("create directory", parent, e))?;
        }

        let mut conn = Connection::open(path).map_err(|e| StoreError::database(path, e))?;
        Self::write(&mut conn, store).map_err(|e| StoreError::database(path, e))?;

        tracing::debug!(path = %path.display(), items = store.total_items(), "saved metadata");
        Ok(())
    }
}
