//! Projection of config entries onto metadata
//!
//! Joins each [`ConfigEntry`] with the current version's [`MetadataItem`] of
//! the same key to produce display-ready [`DisplayRecord`]s, and provides the
//! search and section filters a presentation layer needs.

use std::collections::BTreeSet;

use serde::Serialize;

use super::document::ConfigEntry;
use super::metadata::VersionedMetadataStore;

/// Label shown for records without a section
pub const UNCATEGORIZED: &str = "uncategorized";

/// One row as a presentation layer sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRecord {
    pub row: usize,
    pub key: String,
    /// Section from metadata, empty when the key has no metadata
    pub section: String,
    /// Section derived from ALL-CAPS comments in the config file
    pub file_section: String,
    pub name: String,
    pub value: String,
    pub description: String,
    pub line_index: usize,
}

impl DisplayRecord {
    /// Description for a tooltip, if there is one
    pub fn tooltip(&self) -> Option<&str> {
        (!self.description.is_empty()).then_some(self.description.as_str())
    }

    pub fn section_label(&self) -> &str {
        if self.section.is_empty() {
            UNCATEGORIZED
        } else {
            &self.section
        }
    }
}

/// Projects one entry against the current metadata version
pub fn project_entry(row: usize, entry: &ConfigEntry, store: &VersionedMetadataStore) -> DisplayRecord {
    let item = store.item(&entry.key);
    DisplayRecord {
        row,
        key: entry.key.clone(),
        section: item.map(|i| i.section.clone()).unwrap_or_default(),
        file_section: entry.section.clone(),
        name: item.map(|i| i.name.clone()).unwrap_or_default(),
        value: entry.value.clone(),
        description: item.map(|i| i.description.clone()).unwrap_or_default(),
        line_index: entry.line_index,
    }
}

/// Projects every entry, preserving row order
pub fn project(entries: &[ConfigEntry], store: &VersionedMetadataStore) -> Vec<DisplayRecord> {
    entries
        .iter()
        .enumerate()
        .map(|(row, entry)| project_entry(row, entry, store))
        .collect()
}

/// Which sections a filter admits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SectionFilter {
    #[default]
    All,
    Uncategorized,
    Named(String),
}

/// Search text plus section restriction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    search: String,
    section: SectionFilter,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive substring over key, name and description
    pub fn with_search(mut self, text: &str) -> Self {
        self.search = text.trim().to_lowercase();
        self
    }

    pub fn with_section(mut self, section: SectionFilter) -> Self {
        self.section = match section {
            SectionFilter::Named(name) => SectionFilter::Named(name.trim().to_string()),
            other => other,
        };
        self
    }

    pub fn matches(&self, record: &DisplayRecord) -> bool {
        let section_ok = match &self.section {
            SectionFilter::All => true,
            SectionFilter::Uncategorized => record.section.is_empty(),
            SectionFilter::Named(name) => record.section == *name,
        };
        if !section_ok {
            return false;
        }
        if self.search.is_empty() {
            return true;
        }

        let haystack = format!("{} {} {}", record.key, record.name, record.description).to_lowercase();
        haystack.contains(&self.search)
    }
}

/// Distinct sections across a set of records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionList {
    pub has_uncategorized: bool,
    /// Sorted, non-empty section names
    pub sections: Vec<String>,
}

impl SectionList {
    pub fn from_records(records: &[DisplayRecord]) -> Self {
        let mut names = BTreeSet::new();
        let mut has_uncategorized = false;
        for record in records {
            if record.section.is_empty() {
                has_uncategorized = true;
            } else {
                names.insert(record.section.as_str());
            }
        }
        Self {
            has_uncategorized,
            sections: names.into_iter().map(str::to_string).collect(),
        }
    }
}

/// Requested changes to one record. `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryEdit {
    pub value: Option<String>,
    pub name: Option<String>,
    pub section: Option<String>,
    pub description: Option<String>,
}

impl EntryEdit {
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.name.is_none() && self.section.is_none() && self.description.is_none()
    }
}

/// What an applied edit actually changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EditOutcome {
    pub value_changed: bool,
    pub metadata_changed: bool,
}

impl EditOutcome {
    pub fn changed(&self) -> bool {
        self.value_changed || self.metadata_changed
    }
}
