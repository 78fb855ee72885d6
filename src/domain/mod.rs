//! Domain models for confedit
//!
//! Contains the parsing, editing and projection logic without any I/O
//! concerns. Files, databases and settings live in [`crate::storage`].

mod section;
mod line;
mod document;
mod metadata;
mod projection;

pub use section::{comment_body, section_header, MAX_SECTION_LEN, MIN_SECTION_LEN};
pub use line::{KeyValue, KeyValueSpans, LineEnding, LineKind, LineRecord};
pub use document::{ConfigDocument, ConfigEntry};
pub use metadata::{MetadataItem, MetadataVersion, VersionedMetadataStore, DEFAULT_VERSION};
pub use projection::{
    project, project_entry, DisplayRecord, EditOutcome, EntryEdit, RecordFilter, SectionFilter,
    SectionList, UNCATEGORIZED,
};
