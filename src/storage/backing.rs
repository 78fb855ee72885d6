//! Metadata backing selection
//!
//! A backing turns a [`VersionedMetadataStore`] into a file and back. The
//! file name decides which one is used: `.db`, `.sqlite` and `.sqlite3`
//! (any case) go to SQLite, everything else to the indented text format.

use std::path::Path;

use super::error::StoreResult;
use super::metadata_sqlite::SqliteBacking;
use super::metadata_text::TextBacking;
use crate::domain::VersionedMetadataStore;

/// Persistent representation of a metadata store
pub trait MetadataBacking {
    fn kind(&self) -> BackingKind;

    /// Reads the whole store. A missing file is an error.
    fn load(&self, path: &Path) -> StoreResult<VersionedMetadataStore>;

    /// Replaces the file contents with `store`
    fn save(&self, store: &VersionedMetadataStore, path: &Path) -> StoreResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackingKind {
    Text,
    Sqlite,
}

impl BackingKind {
    const SQLITE_EXTENSIONS: [&'static str; 3] = ["db", "sqlite", "sqlite3"];

    /// Picks the backing for a metadata file by its extension
    pub fn for_path(path: &Path) -> Self {
        let is_sqlite = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                Self::SQLITE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false);

        if is_sqlite {
            BackingKind::Sqlite
        } else {
            BackingKind::Text
        }
    }

    pub fn backing(self) -> Box<dyn MetadataBacking> {
        match self {
            BackingKind::Text => Box::new(TextBacking),
            BackingKind::Sqlite => Box::new(SqliteBacking),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackingKind::Text => "text",
            BackingKind::Sqlite => "sqlite",
        }
    }
}

/// Loads a metadata file with the backing its name selects
pub fn load_metadata(path: &Path) -> StoreResult<VersionedMetadataStore> {
    BackingKind::for_path(path).backing().load(path)
}

/// Saves a metadata file with the backing its name selects
pub fn save_metadata(store: &VersionedMetadataStore, path: &Path) -> StoreResult<()> {
    BackingKind::for_path(path).backing().save(store, path)
}
