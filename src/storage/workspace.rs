//! Editing workspace
//!
//! Owns one loaded config document and one metadata store, keeps the
//! projected [`DisplayRecord`]s in sync with both, and is the single writer
//! when an edit is applied. Persisted UI state goes through an explicit
//! [`SettingsProvider`] passed to the calls that need it.

use std::path::{Path, PathBuf};

use super::backing::{load_metadata, save_metadata, BackingKind};
use super::config_file::ConfigStore;
use super::error::{StoreError, StoreResult};
use super::settings::{SettingKey, SettingsProvider};
use crate::domain::{
    project, project_entry, ConfigDocument, DisplayRecord, EditOutcome, EntryEdit, MetadataItem,
    RecordFilter, SectionList, VersionedMetadataStore,
};

type RowChangedHook = Box<dyn FnMut(usize)>;

/// A config file and a metadata store being edited together
pub struct Workspace {
    config_path: Option<PathBuf>,
    document: Option<ConfigDocument>,
    metadata_path: PathBuf,
    metadata: VersionedMetadataStore,
    records: Vec<DisplayRecord>,
    metadata_dirty: bool,
    row_changed: Option<RowChangedHook>,
}

impl Workspace {
    /// Creates an empty workspace whose metadata lives at `metadata_path`
    pub fn new(metadata_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: None,
            document: None,
            metadata_path: metadata_path.into(),
            metadata: VersionedMetadataStore::new(),
            records: Vec::new(),
            metadata_dirty: false,
            row_changed: None,
        }
    }

    /// Builds a workspace the way the application starts up.
    ///
    /// A missing metadata file leaves the store empty. The preferred version
    /// from settings is selected when it exists. The last opened config is
    /// re-opened when that file still exists; failing to read it is logged
    /// and otherwise ignored.
    pub fn startup(
        metadata_path: impl Into<PathBuf>,
        settings: &mut dyn SettingsProvider,
    ) -> StoreResult<Self> {
        let mut workspace = Self::new(metadata_path);

        let path = workspace.metadata_path.clone();
        match workspace.load_metadata(&path, &*settings) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!(path = %path.display(), "no metadata file, starting empty");
            }
            Err(e) => return Err(e),
        }

        if let Some(last) = settings.get(SettingKey::LastOpenedConfig) {
            let last = PathBuf::from(last);
            if last.is_file() {
                if let Err(e) = workspace.open_config(&last, settings) {
                    tracing::warn!("could not re-open last config: {}", e);
                }
            }
        }

        Ok(workspace)
    }

    /// Loads a metadata file, replacing the current store.
    ///
    /// On failure the workspace is left as it was.
    pub fn load_metadata(&mut self, path: &Path, settings: &dyn SettingsProvider) -> StoreResult<()> {
        let mut store = load_metadata(path)?;

        if let Some(preferred) = settings.get(SettingKey::MetadataVersion) {
            if !store.set_current_version(&preferred) {
                tracing::debug!(version = %preferred, "preferred version not present, using first");
            }
        }

        self.metadata_path = path.to_path_buf();
        self.metadata = store;
        self.metadata_dirty = false;
        self.reproject();
        Ok(())
    }

    /// Loads a config file, replacing the current document.
    ///
    /// On failure the workspace is left as it was. On success the path is
    /// recorded as the last opened config.
    pub fn open_config(&mut self, path: &Path, settings: &mut dyn SettingsProvider) -> StoreResult<()> {
        let document = ConfigStore::new(path).load()?;

        self.config_path = Some(path.to_path_buf());
        self.document = Some(document);
        self.reproject();

        self.remember_config(settings);
        Ok(())
    }

    /// Makes `name` the current metadata version and re-projects every row.
    ///
    /// Returns `Ok(false)` for an unknown version. Nothing on disk changes
    /// apart from the persisted version preference, which is written first:
    /// if that fails the current version stays as it was.
    pub fn switch_version(&mut self, name: &str, settings: &mut dyn SettingsProvider) -> StoreResult<bool> {
        if self.metadata.version(name).is_none() {
            return Ok(false);
        }
        settings.set(SettingKey::MetadataVersion, name)?;
        self.metadata.set_current_version(name);
        self.reproject();
        Ok(true)
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn document(&self) -> Option<&ConfigDocument> {
        self.document.as_ref()
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    pub fn metadata(&self) -> &VersionedMetadataStore {
        &self.metadata
    }

    pub fn records(&self) -> &[DisplayRecord] {
        &self.records
    }

    pub fn record(&self, row: usize) -> Option<&DisplayRecord> {
        self.records.get(row)
    }

    /// Row of the last entry with `key`
    pub fn find_row(&self, key: &str) -> Option<usize> {
        self.document.as_ref().and_then(|doc| doc.find_row(key))
    }

    pub fn sections(&self) -> SectionList {
        SectionList::from_records(&self.records)
    }

    pub fn filtered(&self, filter: &RecordFilter) -> Vec<&DisplayRecord> {
        self.records.iter().filter(|r| filter.matches(r)).collect()
    }

    /// Registers a callback fired with the row index of every record an
    /// edit changes
    pub fn set_row_changed_hook(&mut self, hook: impl FnMut(usize) + 'static) {
        self.row_changed = Some(Box::new(hook));
    }

    /// Applies an edit to the record at `row`.
    ///
    /// A value change goes to the config document; name, section and
    /// description changes go to the current metadata version under the
    /// entry's key. Returns `None` when `row` does not exist.
    pub fn apply_edit(&mut self, row: usize, edit: &EntryEdit) -> Option<EditOutcome> {
        let document = self.document.as_mut()?;
        let key = document.entry(row)?.key.clone();
        let mut outcome = EditOutcome::default();

        if let Some(value) = &edit.value {
            outcome.value_changed = document.set_value(row, value);
        }

        if edit.name.is_some() || edit.section.is_some() || edit.description.is_some() {
            let mut item = self
                .metadata
                .item(&key)
                .cloned()
                .unwrap_or_else(|| MetadataItem::new(key.clone()));
            if let Some(name) = &edit.name {
                item.name = name.clone();
            }
            if let Some(section) = &edit.section {
                item.section = section.clone();
            }
            if let Some(description) = &edit.description {
                item.description = description.clone();
            }
            outcome.metadata_changed = self.metadata.upsert(item);
            self.metadata_dirty |= outcome.metadata_changed;
        }

        let rows = if outcome.metadata_changed {
            document.rows_for_key(&key)
        } else if outcome.value_changed {
            vec![row]
        } else {
            Vec::new()
        };
        for changed in rows {
            self.refresh_row(changed);
        }

        tracing::debug!(
            row,
            key = %key,
            value_changed = outcome.value_changed,
            metadata_changed = outcome.metadata_changed,
            "applied edit"
        );
        Some(outcome)
    }

    pub fn config_dirty(&self) -> bool {
        self.document.as_ref().is_some_and(ConfigDocument::is_dirty)
    }

    pub fn metadata_dirty(&self) -> bool {
        self.metadata_dirty
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.config_dirty() || self.metadata_dirty
    }

    /// Writes the config file, then the metadata store if it changed
    pub fn save(&mut self) -> StoreResult<()> {
        let path = self.config_path.clone().ok_or(StoreError::NoConfigLoaded)?;
        self.write_config(&path)?;
        self.save_metadata_if_dirty()
    }

    /// Writes the config to `path` and adopts it as the open file, then the
    /// metadata store if it changed
    pub fn save_config_to(&mut self, path: &Path, settings: &mut dyn SettingsProvider) -> StoreResult<()> {
        self.write_config(path)?;
        self.config_path = Some(path.to_path_buf());
        self.remember_config(settings);
        self.save_metadata_if_dirty()
    }

    /// Writes the metadata store with the backing its path selects
    pub fn save_metadata(&mut self) -> StoreResult<()> {
        save_metadata(&self.metadata, &self.metadata_path)?;
        self.metadata_dirty = false;
        tracing::debug!(
            path = %self.metadata_path.display(),
            backing = BackingKind::for_path(&self.metadata_path).as_str(),
            "saved workspace metadata"
        );
        Ok(())
    }

    fn save_metadata_if_dirty(&mut self) -> StoreResult<()> {
        if self.metadata_dirty {
            self.save_metadata()?;
        }
        Ok(())
    }

    fn write_config(&mut self, path: &Path) -> StoreResult<()> {
        let document = self.document.as_mut().ok_or(StoreError::NoConfigLoaded)?;
        ConfigStore::new(path).save(document)?;
        document.commit();
        Ok(())
    }

    fn remember_config(&self, settings: &mut dyn SettingsProvider) {
        let Some(path) = &self.config_path else {
            return;
        };
        let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.clone());
        if let Err(e) = settings.set(SettingKey::LastOpenedConfig, &absolute.to_string_lossy()) {
            tracing::warn!("could not record last opened config: {}", e);
        }
    }

    fn reproject(&mut self) {
        self.records = match &self.document {
            Some(doc) => project(doc.entries(), &self.metadata),
            None => Vec::new(),
        };
    }

    fn refresh_row(&mut self, row: usize) {
        let Some(entry) = self.document.as_ref().and_then(|doc| doc.entry(row)) else {
            return;
        };
        let record = project_entry(row, entry, &self.metadata);
        if let Some(slot) = self.records.get_mut(row) {
            *slot = record;
        }
        if let Some(hook) = self.row_changed.as_mut() {
            hook(row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SectionFilter;
    use crate::storage::{MemorySettings, TextBacking};
    use crate::storage::MetadataBacking;
    use std::cell::RefCell;
    use std::fs;
    use std::rc::Rc;
    use tempfile::TempDir;

    const CONF: &str = "\
# NETWORK
host=example.com   # primary
port=80
# TUNING
retries=3
port=8080
";

    const META: &str = "\
versions:
  v1:
    items:
    - key: host
      section: Network
      name_zh: Host
      description_zh: Server to connect to
    - key: port
      section: Network
      name_zh: Port
  v2:
    items:
    - key: retries
      section: Tuning
      name_zh: Retries
";

    struct Fixture {
        dir: TempDir,
        settings: MemorySettings,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            fs::write(dir.path().join("game.conf"), CONF).unwrap();
            fs::write(dir.path().join("translation.yaml"), META).unwrap();
            Self {
                dir,
                settings: MemorySettings::new(),
            }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn workspace(&mut self) -> Workspace {
            let mut ws = Workspace::startup(self.path("translation.yaml"), &mut self.settings).unwrap();
            ws.open_config(&self.path("game.conf"), &mut self.settings).unwrap();
            ws
        }
    }

    #[test]
    fn open_projects_every_row() {
        let mut fx = Fixture::new();
        let ws = fx.workspace();

        let keys: Vec<_> = ws.records().iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["host", "port", "retries", "port"]);
        assert_eq!(ws.record(0).unwrap().name, "Host");
        assert_eq!(ws.record(0).unwrap().value, "example.com");
        assert_eq!(ws.record(2).unwrap().section, "");
        assert_eq!(ws.record(2).unwrap().file_section, "TUNING");
        assert!(!ws.has_unsaved_changes());
    }

    #[test]
    fn duplicate_key_lookup_returns_last_row() {
        let mut fx = Fixture::new();
        let ws = fx.workspace();
        assert_eq!(ws.find_row("port"), Some(3));
        assert_eq!(ws.record(3).unwrap().value, "8080");
    }

    #[test]
    fn startup_without_metadata_file_is_empty() {
        let mut fx = Fixture::new();
        let ws = Workspace::startup(fx.path("absent.yaml"), &mut fx.settings).unwrap();
        assert!(ws.metadata().is_empty());
        assert!(ws.document().is_none());
        assert!(ws.records().is_empty());
    }

    #[test]
    fn startup_restores_version_and_last_config() {
        let mut fx = Fixture::new();
        {
            let mut ws = fx.workspace();
            assert!(ws.switch_version("v2", &mut fx.settings).unwrap());
        }

        let ws = Workspace::startup(fx.path("translation.yaml"), &mut fx.settings).unwrap();
        assert_eq!(ws.metadata().current_version(), Some("v2"));
        assert!(ws.config_path().is_some());
        assert_eq!(ws.record(2).unwrap().section, "Tuning");
    }

    #[test]
    fn startup_ignores_vanished_last_config() {
        let mut fx = Fixture::new();
        let gone = fx.path("gone.conf");
        fx.settings
            .set(SettingKey::LastOpenedConfig, &gone.to_string_lossy())
            .unwrap();
        fx.settings.set(SettingKey::MetadataVersion, "nope").unwrap();

        let ws = Workspace::startup(fx.path("translation.yaml"), &mut fx.settings).unwrap();
        assert!(ws.config_path().is_none());
        assert_eq!(ws.metadata().current_version(), Some("v1"));
    }

    #[test]
    fn failed_open_keeps_previous_state() {
        let mut fx = Fixture::new();
        let mut ws = fx.workspace();
        let before = ws.records().to_vec();

        let err = ws.open_config(&fx.path("missing.conf"), &mut fx.settings).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(ws.records(), before.as_slice());
        assert!(ws.config_path().unwrap().ends_with("game.conf"));
    }

    #[test]
    fn switch_version_reprojects_without_touching_files() {
        let mut fx = Fixture::new();
        let mut ws = fx.workspace();

        assert!(ws.switch_version("v2", &mut fx.settings).unwrap());
        assert_eq!(ws.record(0).unwrap().name, "");
        assert_eq!(ws.record(2).unwrap().name, "Retries");
        assert_eq!(fx.settings.get(SettingKey::MetadataVersion).as_deref(), Some("v2"));
        assert!(!ws.has_unsaved_changes());

        assert!(!ws.switch_version("v9", &mut fx.settings).unwrap());
        assert_eq!(ws.metadata().current_version(), Some("v2"));
    }

    /// Settings that cannot be written
    struct ReadOnlySettings;

    impl SettingsProvider for ReadOnlySettings {
        fn get(&self, _key: SettingKey) -> Option<String> {
            None
        }

        fn set(&mut self, _key: SettingKey, _value: &str) -> StoreResult<()> {
            Err(StoreError::Settings {
                path: PathBuf::from("settings.toml"),
                message: "read-only".to_string(),
            })
        }
    }

    #[test]
    fn failed_preference_write_keeps_current_version() {
        let mut fx = Fixture::new();
        let mut ws = fx.workspace();
        let before = ws.record(0).unwrap().clone();

        let err = ws.switch_version("v2", &mut ReadOnlySettings).unwrap_err();
        assert!(matches!(err, StoreError::Settings { .. }));
        assert_eq!(ws.metadata().current_version(), Some("v1"));
        assert_eq!(ws.record(0).unwrap(), &before);
        assert_eq!(fx.settings.get(SettingKey::MetadataVersion), None);
    }

    #[test]
    fn value_edit_fires_hook_once_and_saves_one_line() {
        let mut fx = Fixture::new();
        let mut ws = fx.workspace();
        let fired = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&fired);
        ws.set_row_changed_hook(move |row| sink.borrow_mut().push(row));

        let edit = EntryEdit {
            value: Some("example.org".into()),
            ..EntryEdit::default()
        };
        let outcome = ws.apply_edit(0, &edit).unwrap();
        assert!(outcome.value_changed);
        assert!(!outcome.metadata_changed);
        assert_eq!(*fired.borrow(), vec![0]);
        assert!(ws.config_dirty());
        assert!(!ws.metadata_dirty());

        ws.save().unwrap();
        assert!(!ws.has_unsaved_changes());
        assert_eq!(
            fs::read_to_string(fx.path("game.conf")).unwrap(),
            CONF.replace("host=example.com   # primary", "host=example.org   # primary")
        );
        assert_eq!(fs::read_to_string(fx.path("translation.yaml")).unwrap(), META);
    }

    #[test]
    fn metadata_edit_refreshes_every_row_with_the_key() {
        let mut fx = Fixture::new();
        let mut ws = fx.workspace();
        let fired = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&fired);
        ws.set_row_changed_hook(move |row| sink.borrow_mut().push(row));

        let edit = EntryEdit {
            name: Some("Listen port".into()),
            ..EntryEdit::default()
        };
        let outcome = ws.apply_edit(1, &edit).unwrap();
        assert!(outcome.metadata_changed);
        assert!(!outcome.value_changed);
        assert_eq!(*fired.borrow(), vec![1, 3]);
        assert_eq!(ws.record(3).unwrap().name, "Listen port");
        // Untouched fields survive
        assert_eq!(ws.record(3).unwrap().section, "Network");
        assert!(!ws.config_dirty());
        assert!(ws.metadata_dirty());

        ws.save().unwrap();
        let reloaded = TextBacking.load(&fx.path("translation.yaml")).unwrap();
        assert_eq!(reloaded.item("port").unwrap().name, "Listen port");
        assert_eq!(fs::read_to_string(fx.path("game.conf")).unwrap(), CONF);
    }

    #[test]
    fn metadata_edit_for_key_without_metadata_creates_item() {
        let mut fx = Fixture::new();
        let mut ws = fx.workspace();

        let edit = EntryEdit {
            section: Some("Tuning".into()),
            description: Some("How often\nto retry".into()),
            ..EntryEdit::default()
        };
        ws.apply_edit(2, &edit).unwrap();

        let record = ws.record(2).unwrap();
        assert_eq!(record.section, "Tuning");
        assert_eq!(record.tooltip(), Some("How often\nto retry"));
        assert_eq!(ws.metadata().version("v1").unwrap().len(), 3);
    }

    #[test]
    fn no_op_edit_changes_nothing() {
        let mut fx = Fixture::new();
        let mut ws = fx.workspace();
        let fired = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&fired);
        ws.set_row_changed_hook(move |_| *sink.borrow_mut() += 1);

        let edit = EntryEdit {
            value: Some("80".into()),
            name: Some("Port".into()),
            ..EntryEdit::default()
        };
        let outcome = ws.apply_edit(1, &edit).unwrap();
        assert!(!outcome.changed());
        assert_eq!(*fired.borrow(), 0);
        assert!(!ws.has_unsaved_changes());

        assert!(ws.apply_edit(99, &edit).is_none());
    }

    #[test]
    fn save_without_config_is_an_error() {
        let mut fx = Fixture::new();
        let mut ws = Workspace::startup(fx.path("translation.yaml"), &mut fx.settings).unwrap();
        assert!(matches!(ws.save(), Err(StoreError::NoConfigLoaded)));
    }

    #[test]
    fn save_config_to_adopts_new_path() {
        let mut fx = Fixture::new();
        let mut ws = fx.workspace();
        ws.apply_edit(
            2,
            &EntryEdit {
                value: Some("5".into()),
                ..EntryEdit::default()
            },
        );

        let target = fx.path("out").join("copy.conf");
        ws.save_config_to(&target, &mut fx.settings).unwrap();

        assert_eq!(ws.config_path(), Some(target.as_path()));
        assert!(fs::read_to_string(&target).unwrap().contains("retries=5\n"));
        assert_eq!(fs::read_to_string(fx.path("game.conf")).unwrap(), CONF);
        let remembered = fx.settings.get(SettingKey::LastOpenedConfig).unwrap();
        assert!(remembered.ends_with("copy.conf"));
    }

    #[test]
    fn failed_save_keeps_edits_pending() {
        let mut fx = Fixture::new();
        let mut ws = fx.workspace();
        ws.apply_edit(
            0,
            &EntryEdit {
                value: Some("x".into()),
                ..EntryEdit::default()
            },
        );

        let blocked = fx.path("blocked");
        fs::create_dir(&blocked).unwrap();
        fs::write(blocked.join("child"), "x").unwrap();

        assert!(ws.save_config_to(&blocked, &mut fx.settings).is_err());
        assert!(ws.has_unsaved_changes());
        assert!(ws.config_path().unwrap().ends_with("game.conf"));
    }

    #[test]
    fn sqlite_metadata_path_saves_through_sqlite() {
        let mut fx = Fixture::new();
        let mut ws = Workspace::new(fx.path("meta.sqlite"));
        ws.open_config(&fx.path("game.conf"), &mut fx.settings).unwrap();
        ws.apply_edit(
            0,
            &EntryEdit {
                name: Some("Host".into()),
                ..EntryEdit::default()
            },
        );
        ws.save().unwrap();

        let loaded = BackingKind::Sqlite.backing().load(&fx.path("meta.sqlite")).unwrap();
        assert_eq!(loaded.version_names(), ["default"]);
        assert_eq!(loaded.item("host").unwrap().name, "Host");
    }

    #[test]
    fn filters_and_sections() {
        let mut fx = Fixture::new();
        let ws = fx.workspace();

        assert_eq!(ws.sections().sections, ["Network"]);
        assert!(ws.sections().has_uncategorized);

        let filter = RecordFilter::new().with_section(SectionFilter::Uncategorized);
        let rows: Vec<_> = ws.filtered(&filter).iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![2]);

        let filter = RecordFilter::new().with_search("connect");
        let rows: Vec<_> = ws.filtered(&filter).iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![0]);
    }
}
