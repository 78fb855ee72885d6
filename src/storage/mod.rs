//! # Storage Layer
//!
//! Everything that touches the filesystem: the config file, the metadata
//! store in either of its backings, persisted settings, and the
//! [`Workspace`] that coordinates them.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Config | `KEY=VALUE` lines, layout preserved | any path |
//! | Metadata | Indented block text | `translation.yaml` (default) |
//! | Metadata | SQLite (`.db`, `.sqlite`, `.sqlite3`) | any path |
//! | Settings | TOML | `~/.config/confedit/settings.toml` |
//!
//! ## Write Safety
//!
//! - Text files are written atomically (temp file + rename)
//! - SQLite saves replace both tables inside one transaction
//! - Files are not locked; one process is assumed to own them
//!
//! ## Key Types
//!
//! - [`Workspace`] - Loaded config + metadata, applies edits, saves
//! - [`ConfigStore`] - Read/write one config file
//! - [`MetadataBacking`] - Load/save contract for the metadata store
//! - [`SettingsProvider`] - Persisted UI state

mod error;
mod fsio;
mod config_file;
mod metadata_text;
mod metadata_sqlite;
mod backing;
mod settings;
mod workspace;

pub use error::{StoreError, StoreResult};
pub use config_file::ConfigStore;
pub use metadata_text::{
    format_scalar, parse_metadata, serialize_metadata, ParseWarning, ParsedMetadata, TextBacking,
    WarningKind,
};
pub use metadata_sqlite::SqliteBacking;
pub use backing::{load_metadata, save_metadata, BackingKind, MetadataBacking};
pub use settings::{FileSettings, MemorySettings, SettingKey, Settings, SettingsProvider};
pub use workspace::Workspace;
