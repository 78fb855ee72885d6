//! Versioned metadata store
//!
//! Human-readable metadata (display name, section, description) keyed by
//! configuration key, grouped into named versions. Versions keep their
//! discovery order; items inside a version are unique by key and iterate
//! sorted by key. Exactly one version is current once any exists, and all
//! item reads and writes go through it.

use std::collections::BTreeMap;

/// Version name used for legacy files without a `versions:` wrapper and for
/// the first upsert into an empty store
pub const DEFAULT_VERSION: &str = "default";

/// Metadata for one configuration key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataItem {
    pub key: String,
    pub section: String,
    pub name: String,
    pub description: String,
}

impl MetadataItem {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A named namespace of metadata items
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataVersion {
    name: String,
    items: BTreeMap<String, MetadataItem>,
}

impl MetadataVersion {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&MetadataItem> {
        self.items.get(key)
    }

    /// Items sorted by key
    pub fn items(&self) -> impl Iterator<Item = &MetadataItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Inserts or replaces an item. Items with an empty key are dropped.
    pub fn insert(&mut self, item: MetadataItem) -> bool {
        if item.key.is_empty() {
            return false;
        }
        self.items.insert(item.key.clone(), item);
        true
    }
}

/// Ordered versions plus a current-version cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionedMetadataStore {
    versions: Vec<MetadataVersion>,
    current: Option<usize>,
}

impl VersionedMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn versions(&self) -> &[MetadataVersion] {
        &self.versions
    }

    /// Version names in discovery order
    pub fn version_names(&self) -> Vec<&str> {
        self.versions.iter().map(MetadataVersion::name).collect()
    }

    pub fn version(&self, name: &str) -> Option<&MetadataVersion> {
        self.versions.iter().find(|v| v.name == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.versions.iter().position(|v| v.name == name)
    }

    /// Appends a version if no version has that name. The first version
    /// added becomes current. Returns whether a version was created.
    pub fn add_version(&mut self, name: &str) -> bool {
        if self.position(name).is_some() {
            return false;
        }
        self.versions.push(MetadataVersion::new(name));
        if self.current.is_none() {
            self.current = Some(self.versions.len() - 1);
        }
        true
    }

    /// Inserts into a named version, creating the version if needed
    pub fn insert_into(&mut self, version: &str, item: MetadataItem) -> bool {
        if item.key.is_empty() {
            return false;
        }
        self.add_version(version);
        match self.position(version) {
            Some(idx) => self.versions[idx].insert(item),
            None => false,
        }
    }

    pub fn current_version(&self) -> Option<&str> {
        self.current.map(|idx| self.versions[idx].name())
    }

    fn current(&self) -> Option<&MetadataVersion> {
        self.current.map(|idx| &self.versions[idx])
    }

    /// Switches the current version. Unknown names leave the store unchanged.
    pub fn set_current_version(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(idx) => {
                self.current = Some(idx);
                true
            }
            None => false,
        }
    }

    /// True when the current version has metadata for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.item(key).is_some()
    }

    /// Metadata for `key` in the current version
    pub fn item(&self, key: &str) -> Option<&MetadataItem> {
        self.current().and_then(|v| v.get(key))
    }

    /// Inserts or replaces an item in the current version.
    ///
    /// An empty key is rejected without error. On an empty store the item
    /// goes into a new [`DEFAULT_VERSION`]. Returns whether the store changed.
    pub fn upsert(&mut self, item: MetadataItem) -> bool {
        if item.key.is_empty() {
            return false;
        }
        if self.current.is_none() {
            self.add_version(DEFAULT_VERSION);
        }
        let Some(idx) = self.current else {
            return false;
        };

        let version = &mut self.versions[idx];
        if version.get(&item.key) == Some(&item) {
            return false;
        }
        version.insert(item)
    }

    /// Items of the current version, sorted by key
    pub fn items(&self) -> Vec<&MetadataItem> {
        self.current()
            .map(|v| v.items().collect())
            .unwrap_or_default()
    }

    /// Total number of items across all versions
    pub fn total_items(&self) -> usize {
        self.versions.iter().map(MetadataVersion::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_versions() -> VersionedMetadataStore {
        let mut store = VersionedMetadataStore::new();
        store.insert_into("v1", MetadataItem::new("host").with_name("Host name"));
        store.insert_into("v1", MetadataItem::new("port").with_name("Port"));
        store.insert_into("v2", MetadataItem::new("host").with_name("Server"));
        store
    }

    #[test]
    fn empty_store_has_no_current_version() {
        let store = VersionedMetadataStore::new();
        assert!(store.is_empty());
        assert_eq!(store.current_version(), None);
        assert!(store.items().is_empty());
        assert!(!store.contains("host"));
    }

    #[test]
    fn first_version_is_current() {
        let store = two_versions();
        assert_eq!(store.version_names(), ["v1", "v2"]);
        assert_eq!(store.current_version(), Some("v1"));
        assert_eq!(store.item("host").unwrap().name, "Host name");
    }

    #[test]
    fn switching_versions_changes_lookups() {
        let mut store = two_versions();
        assert!(store.set_current_version("v2"));
        assert_eq!(store.item("host").unwrap().name, "Server");
        assert!(!store.contains("port"));

        assert!(!store.set_current_version("v9"));
        assert_eq!(store.current_version(), Some("v2"));
    }

    #[test]
    fn upsert_targets_current_version_only() {
        let mut store = two_versions();
        store.set_current_version("v2");
        assert!(store.upsert(MetadataItem::new("port").with_name("Listen port")));

        assert_eq!(store.version("v2").unwrap().len(), 2);
        assert_eq!(store.version("v1").unwrap().get("port").unwrap().name, "Port");
    }

    #[test]
    fn upsert_is_idempotent() {
        let mut store = two_versions();
        let item = MetadataItem::new("timeout").with_section("NET");

        assert!(store.upsert(item.clone()));
        let snapshot = store.clone();
        assert!(!store.upsert(item));
        assert_eq!(store, snapshot);
    }

    #[test]
    fn upsert_replaces_without_duplicating() {
        let mut store = two_versions();
        assert!(store.upsert(MetadataItem::new("host").with_name("Renamed")));

        let v1 = store.version("v1").unwrap();
        assert_eq!(v1.len(), 2);
        assert_eq!(v1.get("host").unwrap().name, "Renamed");
    }

    #[test]
    fn empty_key_is_dropped() {
        let mut store = two_versions();
        assert!(!store.upsert(MetadataItem::new("").with_name("ghost")));
        assert!(!store.insert_into("v1", MetadataItem::new("")));
        assert_eq!(store.total_items(), 3);
    }

    #[test]
    fn upsert_into_empty_store_creates_default_version() {
        let mut store = VersionedMetadataStore::new();
        assert!(store.upsert(MetadataItem::new("a")));
        assert_eq!(store.current_version(), Some(DEFAULT_VERSION));
        assert!(store.contains("a"));
    }

    #[test]
    fn add_version_keeps_order_and_ignores_duplicates() {
        let mut store = VersionedMetadataStore::new();
        assert!(store.add_version("b"));
        assert!(store.add_version("a"));
        assert!(!store.add_version("b"));
        assert_eq!(store.version_names(), ["b", "a"]);
    }

    #[test]
    fn items_are_sorted_by_key() {
        let mut store = VersionedMetadataStore::new();
        store.upsert(MetadataItem::new("zeta"));
        store.upsert(MetadataItem::new("alpha"));
        let keys: Vec<_> = store.items().iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, ["alpha", "zeta"]);
    }
}
