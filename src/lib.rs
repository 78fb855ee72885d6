//! confedit - layout-preserving editor for `KEY=VALUE` configuration files
//!
//! A config file is parsed into line records that keep their exact text, so
//! saving rewrites only edited values. Alongside it lives a versioned store
//! of human-readable metadata (display name, section, description) per key,
//! persisted either as an indented text block file or as a SQLite database.

pub mod domain;
pub mod storage;
pub mod cli;

pub use domain::{ConfigDocument, ConfigEntry, DisplayRecord, MetadataItem, VersionedMetadataStore};
pub use storage::{StoreError, Workspace};
