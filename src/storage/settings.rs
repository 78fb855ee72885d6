//! Persisted application settings
//!
//! Small key/value state that outlives a run: the last opened config file
//! and the preferred metadata version. [`FileSettings`] keeps it in a TOML
//! file under the user config dir (`~/.config/confedit/settings.toml` on
//! Linux); [`MemorySettings`] is for tests and embedders.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::error::{StoreError, StoreResult};
use super::fsio::{read_text, write_atomic};

const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    LastOpenedConfig,
    MetadataVersion,
}

impl SettingKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::LastOpenedConfig => "last_opened_file",
            SettingKey::MetadataVersion => "metadata_version",
        }
    }
}

/// Where persisted UI state lives
pub trait SettingsProvider {
    fn get(&self, key: SettingKey) -> Option<String>;

    fn set(&mut self, key: SettingKey, value: &str) -> StoreResult<()>;
}

/// Settings held in memory only
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: HashMap<SettingKey, String>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsProvider for MemorySettings {
    fn get(&self, key: SettingKey) -> Option<String> {
        self.values.get(&key).cloned()
    }

    fn set(&mut self, key: SettingKey, value: &str) -> StoreResult<()> {
        self.values.insert(key, value.to_string());
        Ok(())
    }
}

/// On-disk settings document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Config file re-opened at startup
    pub last_opened_file: Option<String>,

    /// Preferred metadata version
    pub metadata_version: Option<String>,

    /// Metadata file used when none is given on the command line
    pub metadata_path: Option<PathBuf>,

    /// Output format used when none is given on the command line ("text" or "json")
    pub default_format: Option<String>,
}

/// Settings persisted to a TOML file. Every `set` writes through.
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
    settings: Settings,
}

impl FileSettings {
    /// Loads settings from `path`. A missing file yields defaults.
    pub fn load(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let settings = match read_text(&path) {
            Ok(text) => toml::from_str(&text).map_err(|e| StoreError::Settings {
                path: path.clone(),
                message: e.to_string(),
            })?,
            Err(e) if e.is_not_found() => Settings::default(),
            Err(e) => return Err(e),
        };

        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(Self { path, settings })
    }

    /// Platform settings location, if a home directory can be determined
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "confedit", "confedit")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn metadata_path(&self) -> Option<&Path> {
        self.settings.metadata_path.as_deref()
    }

    pub fn default_format(&self) -> Option<&str> {
        self.settings.default_format.as_deref()
    }

    fn save(&self) -> StoreResult<()> {
        let text = toml::to_string_pretty(&self.settings).map_err(|e| StoreError::Settings {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        write_atomic(&self.path, text.as_bytes())
    }
}

impl SettingsProvider for FileSettings {
    fn get(&self, key: SettingKey) -> Option<String> {
        match key {
            SettingKey::LastOpenedConfig => self.settings.last_opened_file.clone(),
            SettingKey::MetadataVersion => self.settings.metadata_version.clone(),
        }
    }

    fn set(&mut self, key: SettingKey, value: &str) -> StoreResult<()> {
        let slot = match key {
            SettingKey::LastOpenedConfig => &mut self.settings.last_opened_file,
            SettingKey::MetadataVersion => &mut self.settings.metadata_version,
        };
        if slot.as_deref() == Some(value) {
            return Ok(());
        }
        *slot = Some(value.to_string());

        tracing::debug!(key = key.as_str(), value, "updated setting");
        self.save()
    }
}
